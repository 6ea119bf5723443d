pub mod config;
pub mod data;
pub mod error;
pub mod types;

pub use config::ShoplyConfig;
pub use data::ReferenceData;
pub use error::{Result, ShoplyError};
pub use types::*;
