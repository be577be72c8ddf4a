pub mod config;
pub mod error;
pub mod load;
pub mod log;
pub mod uri;

pub use config::EngineConfig;
pub use error::*;
pub use load::*;
pub use log::*;
pub use uri::*;
