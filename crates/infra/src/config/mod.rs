//! Client configuration from the environment, `.env`, or config files

mod loader;

pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
