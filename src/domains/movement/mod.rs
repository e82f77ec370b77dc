pub mod compressor;
pub mod entity;
pub mod events;
pub mod scheduler;

pub use compressor::*;
pub use entity::*;
pub use events::*;
pub use scheduler::*;
