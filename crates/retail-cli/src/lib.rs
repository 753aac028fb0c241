pub mod commands;
pub mod config;
pub mod errors;
pub mod render;

pub use config::{find_project_root, resolve_target, Config, ResolvedTarget, Target};
pub use errors::CliError;
pub use render::Format;
