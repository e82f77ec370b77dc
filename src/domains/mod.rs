pub mod clustering;
pub mod facility;
pub mod logger;
pub mod movement;
pub mod view;

pub use clustering::*;
pub use facility::*;
pub use logger::*;
pub use movement::*;
pub use view::*;
