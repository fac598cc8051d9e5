pub mod app_config;
pub mod clients;
pub mod jobs;
pub mod scheduler;

pub use app_config::*;
pub use clients::*;
pub use jobs::*;
pub use scheduler::*;
