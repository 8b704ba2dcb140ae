//! Geo-anchored 3D model viewer.
//!
//! [`Session`] owns the whole lifecycle and is host-agnostic; the wasm
//! bindings plug the browser's map engine and three.js into it.

pub mod config;
pub mod session;

#[cfg(target_arch = "wasm32")]
mod bindings;

pub use config::*;
pub use session::*;
