//! Configuration management for CopperChain

use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub mining: MiningConfig,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_wallet_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct MiningConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            path: default_wallet_path(),
        }
    }
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
        }
    }
}

/// Loads `copperchain.toml` from the working directory, falling back to
/// defaults when the file is absent.
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config_str = fs::read_to_string("copperchain.toml").unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config {
            database: DatabaseConfig::default(),
            wallet: WalletConfig::default(),
            mining: MiningConfig::default(),
        }
    } else {
        toml::from_str(&config_str)?
    };

    if config.database.path.is_empty() {
        return Err("database.path must be set in copperchain.toml".into());
    }
    if config.wallet.path.is_empty() {
        return Err("wallet.path must be set in copperchain.toml".into());
    }
    if config.mining.difficulty == 0 || config.mining.difficulty > 255 {
        return Err("mining.difficulty must be between 1 and 255".into());
    }

    Ok(config)
}

fn default_db_path() -> String {
    "copperchain.db".to_string()
}

fn default_wallet_path() -> String {
    "wallets.json".to_string()
}

fn default_difficulty() -> u64 {
    16
}
