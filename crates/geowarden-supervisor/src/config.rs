//! Supervisor configuration.
//!
//! Loaded once at startup from a YAML file; the child process configuration
//! is fixed for the lifetime of the supervisor. Durations use the `"30s"` /
//! `"500ms"` / `"2m"` string syntax.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    pub supervisor: SupervisorOptions,
    pub process: ChildProcessConfig,
    #[serde(default)]
    pub output: OutputOptions,
}

/// Options for the supervisor's own control surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorOptions {
    /// Port the HTTP control API listens on
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Configuration of the supervised child process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildProcessConfig {
    pub executable_path: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    /// Passed through to the child; carries things like the child's listen port
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Grace period between SIGTERM and SIGKILL on stop
    #[serde(default = "default_graceful_timeout", with = "duration_serde")]
    pub graceful_timeout: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckConfig>,
}

/// HTTP health endpoint the child exposes once ready.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub url: String,
    #[serde(default = "default_probe_timeout", with = "duration_serde")]
    pub timeout: Duration,
    #[serde(default = "default_expected_status")]
    pub expected_status: Vec<u16>,
}

/// Output relay options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Ring buffer capacity in lines
    #[serde(default = "default_output_capacity")]
    pub capacity: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            capacity: default_output_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_graceful_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_expected_status() -> Vec<u16> {
    vec![200]
}

fn default_output_capacity() -> usize {
    500
}

impl SupervisorConfig {
    /// Load configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string.
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: SupervisorConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.process.executable_path.trim().is_empty() {
            bail!("process.executable_path must not be empty");
        }
        if self.process.graceful_timeout.is_zero() {
            bail!("process.graceful_timeout must be greater than zero");
        }
        if self.output.capacity == 0 {
            bail!("output.capacity must be greater than zero");
        }
        if let Some(hc) = &self.process.health_check {
            if !hc.url.starts_with("http://") && !hc.url.starts_with("https://") {
                bail!("process.health_check.url must be an http(s) URL: {}", hc.url);
            }
            if hc.timeout.is_zero() {
                bail!("process.health_check.timeout must be greater than zero");
            }
            if hc.expected_status.is_empty() {
                bail!("process.health_check.expected_status must not be empty");
            }
        }
        Ok(())
    }
}

// Custom serialization for Duration as "30s" / "500ms" / "2m" strings
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, String> {
        // Check "ms" before "s" since "ms" ends with 's'
        if s.ends_with("ms") {
            let num_str = &s[..s.len() - 2];
            let millis: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if s.ends_with('s') {
            let num_str = &s[..s.len() - 1];
            let secs: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if s.ends_with('m') {
            let num_str = &s[..s.len() - 1];
            let mins: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(mins * 60))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}
