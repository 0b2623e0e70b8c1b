pub mod loader;
pub mod onboard;
pub mod schema;

pub use loader::{
    ConfigError, debug_enabled, load_config, load_env_file, load_setup_config, upsert_env_vars,
};
pub use onboard::{mask_secret, prompt_game_override, run_auth_setup};
pub use schema::{Config, SetupConfig};
