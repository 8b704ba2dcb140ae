pub mod host;
pub mod layer;
pub mod model;

pub use host::*;
pub use layer::*;
pub use model::*;
