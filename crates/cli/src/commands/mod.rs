pub mod onboard;
pub mod profiles;
pub mod route;
pub mod serve;
pub mod status;

use switchyard_config::AppConfig;

/// Load the config, prefixing failures for the terminal.
pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
