pub mod anchor;
pub mod placement;

pub use anchor::*;
pub use placement::*;
