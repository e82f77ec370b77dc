pub mod activity_log;
pub mod console_logger;
pub mod facility_data;
pub mod fanout_logger;
pub mod file_logger;
pub mod scene_surface;

pub use activity_log::*;
pub use console_logger::*;
pub use facility_data::*;
pub use fanout_logger::*;
pub use file_logger::*;
pub use scene_surface::*;
