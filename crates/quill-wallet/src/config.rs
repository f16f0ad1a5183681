//! Wallet and authoring configuration.
//!
//! [`AuthorConfig`] carries the defaults applied to every authoring request
//! that does not override them. [`WalletConfig`] adds where the CLI keeps its
//! files and how loudly it logs; it is read from `quill.json` in the data
//! directory, with `QUILL_DATA_DIR` and `QUILL_LOG` taking precedence.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use quill_core::constants::{DEFAULT_FEE_PER_KVB, DEFAULT_MAX_FEE_ITERATIONS, DEFAULT_RELAY_FEE_PER_KVB};
use quill_core::fees::FeeRate;

use crate::coin_selection::SelectionStrategy;
use crate::error::WalletError;

/// Name of the optional configuration file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "quill.json";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "QUILL_DATA_DIR";

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "QUILL_LOG";

/// Defaults for transaction authoring.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AuthorConfig {
    /// Fee rate used when a request does not name one.
    pub fee_rate: FeeRate,
    /// Minimum confirmations used when a request does not name one.
    pub min_conf: u32,
    pub strategy: SelectionStrategy,
    /// Relay fee deciding whether change is dust.
    pub relay_fee: FeeRate,
    /// Upper bound on fee re-estimation rounds.
    pub max_fee_iterations: usize,
}

impl Default for AuthorConfig {
    fn default() -> Self {
        Self {
            fee_rate: FeeRate::from_per_kvb(DEFAULT_FEE_PER_KVB),
            min_conf: 1,
            strategy: SelectionStrategy::Largest,
            relay_fee: FeeRate::from_per_kvb(DEFAULT_RELAY_FEE_PER_KVB),
            max_fee_iterations: DEFAULT_MAX_FEE_ITERATIONS,
        }
    }
}

/// Configuration of a file-backed wallet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WalletConfig {
    /// Root directory for wallet files.
    pub data_dir: PathBuf,
    /// Account store file name, relative to `data_dir`.
    pub wallet_file: String,
    /// Ledger snapshot file name, relative to `data_dir`.
    pub ledger_file: String,
    /// Log filter string (e.g. "info", "quill_wallet=debug").
    pub log_level: String,
    pub author: AuthorConfig,
}

impl Default for WalletConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quill");

        Self {
            data_dir,
            wallet_file: "wallet.json".to_string(),
            ledger_file: "ledger.json".to_string(),
            log_level: "info".to_string(),
            author: AuthorConfig::default(),
        }
    }
}

impl WalletConfig {
    /// Resolve the configuration.
    ///
    /// The data directory is `data_dir` if given, else `$QUILL_DATA_DIR`,
    /// else the platform default. `quill.json` there is read when present.
    /// `$QUILL_LOG` overrides the log level.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self, WalletError> {
        let dir = data_dir
            .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| Self::default().data_dir);

        let mut config = Self::from_dir(&dir)?;
        if let Ok(level) = std::env::var(LOG_ENV) {
            config.log_level = level;
        }
        Ok(config)
    }

    /// Read `quill.json` from `dir`, falling back to defaults. The data
    /// directory is always `dir`, whatever the file says.
    pub fn from_dir(dir: &Path) -> Result<Self, WalletError> {
        let path = dir.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| WalletError::IoError(e.to_string()))?;
            serde_json::from_slice::<WalletConfig>(&bytes)
                .map_err(|e| WalletError::CorruptedFile(format!("{}: {e}", path.display())))?
        } else {
            Self::default()
        };
        config.data_dir = dir.to_path_buf();
        Ok(config)
    }

    pub fn wallet_path(&self) -> PathBuf {
        self.data_dir.join(&self.wallet_file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }
}
