use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::storage::ensure_parent_dir;

pub const DEFAULT_CONFIG_PATH: &str = "config/spaces.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file standing in for the contract's storage
    pub store_path: String,
    pub contract_address: String,
    pub chain_id: u64,
    /// Connected account; a random one is generated when empty
    pub wallet_address: String,
    pub participant_refresh_ms: u64,
    pub message_poll_ms: u64,
    pub decrypt_delay_ms: u64,
    pub success_dismiss_ms: u64,
    pub error_dismiss_ms: u64,
    pub default_duration_hours: u32,
    pub default_max_participants: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: "data/contract.db".to_string(),
            contract_address: "0x0000000000000000000000000000000000005ace".to_string(),
            chain_id: 11155111,
            wallet_address: String::new(),
            participant_refresh_ms: 3000,
            message_poll_ms: 5000,
            decrypt_delay_ms: 1500,
            success_dismiss_ms: 2000,
            error_dismiss_ms: 3000,
            default_duration_hours: 2,
            default_max_participants: 50,
        }
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

pub fn save_config(path: &str, config: &AppConfig) -> std::io::Result<()> {
    ensure_parent_dir(Path::new(path))?;
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json)
}
