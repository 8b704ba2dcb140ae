//! Model acquisition: resolving download URLs, fetching bytes, decoding and
//! caching the resulting scene graph.

pub mod acquire;
pub mod cache;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod remote;
pub mod request;
pub mod source;

pub use acquire::*;
pub use cache::*;
pub use error::*;
pub use fetch::*;
pub use loader::*;
pub use remote::*;
pub use request::*;
pub use source::*;

use std::future::Future;
use std::pin::Pin;

/// Boxed future that stays on the current thread.
///
/// Browser fetches are not `Send`, so the acquisition traits use this
/// instead of a `Send` boxed future.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;
