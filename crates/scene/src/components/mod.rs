pub mod bounds;
pub mod transform;

pub use bounds::*;
pub use transform::*;
