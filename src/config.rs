// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for tomography runs.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. config.yaml file
//! 3. Environment variables (QUBITOS_TOMO_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::manifold::DEFAULT_CONDITIONING_THRESHOLD;
use crate::optimizer::{OptimizerConfig, OptimizerKind};
use crate::sampling::DEFAULT_ROW_SUM_TOLERANCE;
use crate::tomography::TomographyConfig;
use crate::validation::validate_tomography_config;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Problem size, data generation and stopping
    #[serde(default)]
    pub tomography: TomographyConfig,

    /// Optimizer hyperparameters
    #[serde(default)]
    pub optimizer: OptimizerConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            for path in &["config.yaml", "config.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        let t = &mut self.tomography;
        if let Some(v) = env_parse("QUBITOS_TOMO_NUM_QUBITS") {
            t.num_qubits = v;
        }
        if let Some(v) = env_parse("QUBITOS_TOMO_KRAUS_RANK") {
            t.kraus_rank = v;
        }
        if let Some(v) = env_parse("QUBITOS_TOMO_NUM_SAMPLES") {
            t.num_samples = v;
        }
        if let Some(v) = env_parse("QUBITOS_TOMO_NUM_ITERATIONS") {
            t.num_iterations = v;
        }
        if let Some(v) = env_parse("QUBITOS_TOMO_SEED") {
            t.seed = v;
        }
        if let Ok(val) = env::var("QUBITOS_TOMO_NOISELESS") {
            t.noiseless = parse_flag(&val);
        }
        if let Some(v) = env_parse("QUBITOS_TOMO_TARGET_DISTANCE") {
            t.target_distance = Some(v);
        }

        if let Some(v) = env_parse("QUBITOS_TOMO_LEARNING_RATE") {
            self.optimizer.learning_rate = v;
        }
        if let Ok(val) = env::var("QUBITOS_TOMO_OPTIMIZER") {
            match val.to_lowercase().as_str() {
                "radam" => self.optimizer.kind = OptimizerKind::RAdam,
                "rsgd" => self.optimizer.kind = OptimizerKind::RSgd,
                other => tracing::warn!(value = other, "ignoring unknown QUBITOS_TOMO_OPTIMIZER"),
            }
        }

        if let Ok(val) = env::var("QUBITOS_TOMO_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("QUBITOS_TOMO_LOG_FORMAT") {
            self.logging.format = val;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.tomography
            .validate()
            .map_err(|e| Error::Config(format!("tomography: {}", e)))?;
        self.optimizer
            .validate()
            .map_err(|e| Error::Config(format!("optimizer: {}", e)))?;
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(Error::Config(format!(
                "logging format must be json or pretty, got {:?}",
                self.logging.format
            )));
        }
        let v = &self.validation;
        if !v.row_sum_tolerance.is_finite() || v.row_sum_tolerance <= 0.0 {
            return Err(Error::Config("row_sum_tolerance must be > 0".into()));
        }
        if !v.conditioning_threshold.is_finite() || v.conditioning_threshold < 0.0 {
            return Err(Error::Config("conditioning_threshold must be >= 0".into()));
        }
        if !self.tomography.trace_preserving {
            tracing::warn!(
                "trace_preserving is off; the likelihood is unbounded on unconstrained Choi matrices"
            );
        }
        validate_tomography_config(&self.tomography, &v.limits)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let val = env::var(key).ok()?;
    match val.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %val, "ignoring unparsable environment override");
            None
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "json".into()
}

/// Validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Resource limits
    #[serde(default)]
    pub limits: ResourceLimits,

    /// Allowed deviation of a probability row sum from 1 before the sampler warns
    #[serde(default = "default_row_sum_tolerance")]
    pub row_sum_tolerance: f64,

    /// λ_min / λ_max of A†A below which the projection warns
    #[serde(default = "default_conditioning_threshold")]
    pub conditioning_threshold: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            row_sum_tolerance: default_row_sum_tolerance(),
            conditioning_threshold: default_conditioning_threshold(),
        }
    }
}

fn default_row_sum_tolerance() -> f64 {
    DEFAULT_ROW_SUM_TOLERANCE
}

fn default_conditioning_threshold() -> f64 {
    DEFAULT_CONDITIONING_THRESHOLD
}

/// Resource limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum qubits
    #[serde(default = "default_max_qubits")]
    pub max_qubits: u32,

    /// Maximum measurement shots (or noiseless input states)
    #[serde(default = "default_max_samples")]
    pub max_samples: u64,

    /// Maximum optimizer iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,

    /// Maximum rows of a noiseless dataset (inputs × outcomes)
    #[serde(default = "default_max_dataset_rows")]
    pub max_dataset_rows: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_qubits: default_max_qubits(),
            max_samples: default_max_samples(),
            max_iterations: default_max_iterations(),
            max_dataset_rows: default_max_dataset_rows(),
        }
    }
}

fn default_max_qubits() -> u32 {
    4
}

fn default_max_samples() -> u64 {
    10_000_000
}

fn default_max_iterations() -> u64 {
    100_000
}

fn default_max_dataset_rows() -> u64 {
    10_000_000
}
