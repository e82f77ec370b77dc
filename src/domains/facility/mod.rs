pub mod graph;
pub mod ports;

pub use graph::*;
pub use ports::*;
