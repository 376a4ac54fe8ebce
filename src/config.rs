use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{BRONZE_LAYER, GOLD_LAYER, SILVER_LAYER};
use crate::pipeline::processing::clean::CleaningRules;

pub const DEFAULT_CONFIG_PATH: &str = "medallion.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Missing AWS credentials in environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generation: GenerationConfig,
    pub paths: PathsConfig,
    pub cleaning: CleaningRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub records: usize,
    pub duplicates: usize,
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            records: 100_000,
            duplicates: 5_000,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub bronze_file: String,
    pub silver_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            bronze_file: "bronze_layer_raw".to_string(),
            silver_file: "silver_layer_clean".to_string(),
        }
    }
}

impl PathsConfig {
    pub fn bronze_dir(&self) -> PathBuf {
        self.data_dir.join(BRONZE_LAYER)
    }

    pub fn silver_dir(&self) -> PathBuf {
        self.data_dir.join(SILVER_LAYER)
    }

    pub fn gold_dir(&self) -> PathBuf {
        self.data_dir.join(GOLD_LAYER)
    }

    pub fn layer_dir(&self, layer: &str) -> PathBuf {
        self.data_dir.join(layer)
    }

    pub fn bronze_path(&self) -> PathBuf {
        self.bronze_dir().join(format!("{}.csv", self.bronze_file))
    }

    pub fn silver_path(&self) -> PathBuf {
        self.silver_dir().join(format!("{}.parquet", self.silver_file))
    }
}

impl Config {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let config = match fs::read_to_string(path) {
            Ok(content) => toml::from_str::<Config>(&content).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(source) => return Err(ConfigError::Read { path: display, source }),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.records == 0 {
            return Err(ConfigError::Invalid("generation.records must be positive".to_string()));
        }
        if self.generation.duplicates > self.generation.records {
            return Err(ConfigError::Invalid(
                "generation.duplicates cannot exceed generation.records".to_string(),
            ));
        }
        self.cleaning
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Object-storage credentials, taken only from the environment.
#[derive(Clone, PartialEq)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("access_key_id", &"***")
            .field("secret_access_key", &"***")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl StorageConfig {
    pub const REQUIRED_VARS: [&'static str; 4] =
        ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_REGION", "BUCKET_NAME"];

    /// Read credentials from the process environment, after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = Self::REQUIRED_VARS
            .iter()
            .filter(|key| get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        Ok(Self {
            access_key_id: get("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: get("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            region: get("AWS_REGION").unwrap_or_default(),
            bucket: get("BUCKET_NAME").unwrap_or_default(),
            endpoint: get("AWS_ENDPOINT"),
        })
    }
}
