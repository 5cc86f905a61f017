use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::container::ResourceLimits;
use crate::language::LanguageProfile;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub sandbox: SandboxConfig,
    pub logging: LoggingConfig,
    /// Externally supplied language profiles, keyed by language id.
    /// Extends or overrides the built-in table.
    #[serde(default)]
    pub languages: HashMap<String, LanguageProfile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SandboxConfig {
    /// Root under which per-request workspaces are created.
    pub workspace_root: PathBuf,
    /// Fallback timeout for languages without a per-language override.
    pub default_timeout_seconds: u64,
    /// Cap on execution units running concurrently within one request.
    /// 1 reproduces the sequential reference behavior.
    pub max_concurrency: usize,
    /// Ceiling on captured stdout/stderr per execution unit.
    pub max_output_bytes: usize,
    pub limits: ResourceLimits,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sandbox: SandboxConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
            languages: HashMap::new(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir(),
            default_timeout_seconds: 10,
            max_concurrency: 1,
            max_output_bytes: 1024 * 1024,
            limits: ResourceLimits::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut config = Self::default();

        if let Ok(root) = std::env::var("JUDGEBOX_WORKSPACE_ROOT") {
            config.sandbox.workspace_root = PathBuf::from(root);
        }
        if let Ok(timeout) = std::env::var("JUDGEBOX_DEFAULT_TIMEOUT_SECONDS") {
            config.sandbox.default_timeout_seconds =
                timeout.parse().unwrap_or(config.sandbox.default_timeout_seconds);
        }
        if let Ok(concurrency) = std::env::var("JUDGEBOX_MAX_CONCURRENCY") {
            config.sandbox.max_concurrency =
                concurrency.parse().unwrap_or(config.sandbox.max_concurrency);
        }
        if let Ok(bytes) = std::env::var("JUDGEBOX_MAX_OUTPUT_BYTES") {
            config.sandbox.max_output_bytes =
                bytes.parse().unwrap_or(config.sandbox.max_output_bytes);
        }
        if let Ok(memory) = std::env::var("JUDGEBOX_MEMORY_LIMIT_MB") {
            config.sandbox.limits.memory_mb =
                memory.parse().unwrap_or(config.sandbox.limits.memory_mb);
        }
        if let Ok(cores) = std::env::var("JUDGEBOX_CPU_CORES") {
            config.sandbox.limits.cpu_cores =
                cores.parse().unwrap_or(config.sandbox.limits.cpu_cores);
        }
        if let Ok(pids) = std::env::var("JUDGEBOX_PIDS_LIMIT") {
            config.sandbox.limits.pids = pids.parse().unwrap_or(config.sandbox.limits.pids);
        }
        if let Ok(level) = std::env::var("JUDGEBOX_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file (judgebox.toml).
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sandbox.default_timeout_seconds == 0 {
            anyhow::bail!("Default timeout cannot be 0");
        }

        if self.sandbox.max_concurrency == 0 {
            anyhow::bail!("Concurrency cap cannot be 0");
        }

        if self.sandbox.max_output_bytes == 0 {
            anyhow::bail!("Output capture ceiling cannot be 0");
        }

        if self.sandbox.limits.memory_mb < 16 {
            anyhow::bail!("Minimum memory limit is 16MB");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sandbox.max_concurrency, 1);
    }

    #[test]
    fn test_from_env_reads_sandbox_and_limit_knobs() {
        std::env::set_var("JUDGEBOX_DEFAULT_TIMEOUT_SECONDS", "3");
        std::env::set_var("JUDGEBOX_MAX_OUTPUT_BYTES", "4096");
        std::env::set_var("JUDGEBOX_MEMORY_LIMIT_MB", "128");
        std::env::set_var("JUDGEBOX_CPU_CORES", "0.25");
        std::env::set_var("JUDGEBOX_PIDS_LIMIT", "32");

        let config = Config::from_env().unwrap();
        assert_eq!(config.sandbox.default_timeout_seconds, 3);
        assert_eq!(config.sandbox.max_output_bytes, 4096);
        assert_eq!(config.sandbox.limits.memory_mb, 128);
        assert_eq!(config.sandbox.limits.cpu_cores, 0.25);
        assert_eq!(config.sandbox.limits.pids, 32);

        std::env::remove_var("JUDGEBOX_DEFAULT_TIMEOUT_SECONDS");
        std::env::remove_var("JUDGEBOX_MAX_OUTPUT_BYTES");
        std::env::remove_var("JUDGEBOX_MEMORY_LIMIT_MB");
        std::env::remove_var("JUDGEBOX_CPU_CORES");
        std::env::remove_var("JUDGEBOX_PIDS_LIMIT");
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.sandbox.default_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_from_file_with_language_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("judgebox.toml");
        tokio::fs::write(
            &path,
            r#"
[sandbox]
workspace_root = "/tmp"
default_timeout_seconds = 5
max_concurrency = 4
max_output_bytes = 65536

[sandbox.limits]
cpu_cores = 0.5
memory_mb = 256
pids = 64

[logging]
level = "debug"
format = "text"

[languages.go]
file_extension = "go"
image = "golang:1.22-alpine"
command = { argv = ["go", "run", "{source}"] }
timeout_seconds = 20
"#,
        )
        .await
        .unwrap();

        let config = Config::from_file(&path).await.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.sandbox.max_concurrency, 4);
        assert_eq!(config.languages["go"].image, "golang:1.22-alpine");
        assert_eq!(config.languages["go"].timeout_seconds, Some(20));
    }
}
