pub mod env;
pub mod loader;
pub mod schema;

pub use env::{ENV_OVERRIDES, apply_env_overrides};
pub use loader::{get_config_path, load_config, save_config};
pub use schema::{Config, GatewayConfig, SessionConfig};
