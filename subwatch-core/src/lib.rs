pub mod config;
pub mod error;
pub mod error_utils;
pub mod keyword;
pub mod pacing;
pub mod types;

pub use config::{AppConfig, MonitorConfig, Secrets, PROMPT_PLACEHOLDER};
pub use error::*;
pub use error_utils::*;
pub use keyword::KeywordFilter;
pub use pacing::{Pacer, PacingPermit};
pub use types::*;
