use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForkparConfig {
    pub context: ContextConfig,
    pub run: RunConfig,
}

/// Which execution context computations are handed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// Grows a lane whenever every lane is busy
    Elastic,
    /// Fixed-size rayon pool
    Rayon,
    /// Runs everything on the calling thread
    Inline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    pub kind: ContextKind,

    /// Idle time before an elastic lane exits
    pub keep_alive_ms: u64,

    pub thread_name_prefix: String,

    /// Upper bound for fixed-size contexts (0 = no limit)
    pub max_lanes: usize,

    /// Share of CPU cores used by fixed-size contexts (1-100)
    pub lane_percentage: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Deadline for retrieving a result (0 = wait indefinitely)
    pub timeout_ms: u64,
}

impl RunConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl ForkparConfig {
    pub fn load_with_custom_config(custom_config: Option<&str>) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: Starting");
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(custom_path) = custom_config {
            if !Path::new(custom_path).exists() {
                bail!("Configuration file not found: {}", custom_path);
            }
            tracing::debug!("Using custom config: {}", custom_path);
            figment = figment.merge(Toml::file(custom_path));
        } else {
            figment = figment
                .merge(Toml::file(Self::user_config_path()))
                .merge(Toml::file("forkpar.toml"));
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed("FORKPAR_").split("__"));

        let config: Self = figment.extract().context("Invalid forkpar configuration")?;
        config.validate()?;
        tracing::trace!("CONFIG LOAD: context.kind = {:?}", config.context.kind);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let percentage = self.context.lane_percentage;
        if !(1..=100).contains(&percentage) {
            bail!("context.lane_percentage must be between 1 and 100, got {}", percentage);
        }
        Ok(())
    }

    fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{}/.config/forkpar/config.toml", home),
            Err(_) => "~/.config/forkpar/config.toml".to_string(),
        }
    }
}
