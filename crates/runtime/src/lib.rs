pub mod animation;
pub mod frame;
pub mod status;

pub use animation::*;
pub use frame::*;
pub use status::*;
