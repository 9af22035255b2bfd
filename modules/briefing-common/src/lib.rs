pub mod config;
pub mod error;
pub mod file_config;
pub mod lists;
pub mod template;
pub mod types;

pub use config::{AppConfig, GenerationProvider, ProviderKind};
pub use error::BriefingError;
pub use file_config::{load_config, FileConfig, ItemCount};
pub use lists::split_list;
pub use template::{resolve_runtime_vars, validate_template};
pub use types::*;
