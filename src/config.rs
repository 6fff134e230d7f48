//! Runtime configuration
//!
//! Where the durable store lives and how many threads mine. Protocol
//! rules are fixed in [`crate::constants`] and cannot be configured.

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "BCHT_DATA_DIR";

/// Environment variable overriding the number of mining threads
pub const MINING_THREADS_ENV: &str = "BCHT_MINING_THREADS";

const DEFAULT_DB_NAME: &str = "default.db";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the databases
    pub data_dir: PathBuf,
    /// Database directory name inside `data_dir`
    pub db_name: String,
    /// Worker threads used by the miner
    pub mining_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".bchosttrust"),
            db_name: DEFAULT_DB_NAME.to_string(),
            mining_threads: available_threads(),
        }
    }
}

impl Config {
    /// Resolve configuration from the environment.
    ///
    /// The data directory is `$BCHT_DATA_DIR` when set, otherwise
    /// `%LOCALAPPDATA%\BCHostTrust` on Windows and `~/.bchosttrust` elsewhere.
    pub fn from_env() -> Result<Self> {
        let data_dir = match env::var_os(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };
        let mining_threads = match env::var(MINING_THREADS_ENV) {
            Ok(value) => value.parse().map_err(|_| {
                Error::Config(format!("{MINING_THREADS_ENV}={value:?} is not a thread count"))
            })?,
            Err(_) => available_threads(),
        };
        Ok(Self {
            data_dir,
            mining_threads,
            ..Self::default()
        })
    }

    /// Path of the durable database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_name)
    }
}

fn available_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn default_data_dir() -> Result<PathBuf> {
    if cfg!(windows) {
        env::var_os("LOCALAPPDATA")
            .map(|dir| PathBuf::from(dir).join("BCHostTrust"))
            .ok_or_else(|| Error::Config("%LOCALAPPDATA% is not set".to_string()))
    } else {
        env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".bchosttrust"))
            .ok_or_else(|| Error::Config("failed to resolve the home directory".to_string()))
    }
}
