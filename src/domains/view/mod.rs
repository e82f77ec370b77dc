pub mod controller;
pub mod scope;
pub mod surface;

pub use controller::*;
pub use scope::*;
pub use surface::*;
