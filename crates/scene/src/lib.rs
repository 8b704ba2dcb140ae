pub mod components;
pub mod graph;
pub mod lighting;
pub mod root;

pub use graph::*;
pub use lighting::*;
pub use root::*;
