use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, path::PathBuf, time::Duration};
use tokio::fs;

use crate::{error::Error, process::ProcessSettings};

/// How a language is served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Spawn the language's toolchain
    Process,
    /// In-process script engine (JavaScript only)
    Embedded,
    /// Pattern simulator
    Simulator,
    /// Process when the toolchain is on `PATH`, otherwise the best in-process option
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub backend: BackendChoice,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LanguageConfig {
    pub fn new(backend: BackendChoice, aliases: &[&str]) -> Self {
        Self {
            backend,
            aliases: aliases.iter().map(|alias| alias.to_string()).collect(),
        }
    }
}

/// Executor configuration, usually read from a TOML file.
///
/// A `[languages]` table replaces the default language wiring entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Bound on compile steps (seconds)
    pub compile_timeout_secs: u64,
    /// Bound on run steps and embedded scripts (seconds)
    pub run_timeout_secs: u64,
    /// Parent directory for per-invocation workspaces
    pub temp_dir: Option<PathBuf>,
    /// Workspace directory name prefix
    pub temp_prefix: String,
    /// Captured process output kept per step (bytes)
    pub max_output_bytes: u64,
    /// Language name to backend wiring
    pub languages: BTreeMap<String, LanguageConfig>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let languages = [
            ("javascript", LanguageConfig::new(BackendChoice::Embedded, &["js"])),
            ("python", LanguageConfig::new(BackendChoice::Simulator, &["py"])),
            ("java", LanguageConfig::new(BackendChoice::Simulator, &[])),
            ("dart", LanguageConfig::new(BackendChoice::Simulator, &[])),
        ]
        .into_iter()
        .map(|(name, language)| (name.to_string(), language))
        .collect();

        Self {
            compile_timeout_secs: 10,
            run_timeout_secs: 10,
            temp_dir: None,
            temp_prefix: "snippet-exec-".to_string(),
            max_output_bytes: 1024 * 1024,
            languages,
        }
    }
}

impl ExecutorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path.as_ref()).await?;
        Self::from_toml_str(&content)
    }

    /// Serve `language` with `backend`, replacing any existing wiring
    pub fn with_language(mut self, language: &str, backend: BackendChoice, aliases: &[&str]) -> Self {
        self.languages
            .insert(language.to_lowercase(), LanguageConfig::new(backend, aliases));
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.compile_timeout_secs == 0 || self.run_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be at least one second".into()));
        }
        if self.temp_prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::Config(format!(
                "temp_prefix must not contain a path separator: {}",
                self.temp_prefix
            )));
        }
        if self.max_output_bytes == 0 {
            return Err(Error::Config("max_output_bytes must be positive".into()));
        }
        Ok(())
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn process_settings(&self) -> ProcessSettings {
        ProcessSettings {
            compile_timeout: self.compile_timeout(),
            run_timeout: self.run_timeout(),
            temp_dir: self.temp_dir.clone(),
            temp_prefix: self.temp_prefix.clone(),
            max_output_bytes: self.max_output_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wiring() {
        let config = ExecutorConfig::default();
        assert_eq!(config.languages["javascript"].backend, BackendChoice::Embedded);
        assert_eq!(config.languages["python"].aliases, vec!["py"]);
        assert_eq!(config.run_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() -> Result<(), Error> {
        let config = ExecutorConfig::from_toml_str(
            r#"
            run_timeout_secs = 3
            temp_prefix = "snip-"

            [languages.python]
            backend = "process"
            aliases = ["py", "python3"]

            [languages.shell]
            backend = "auto"
            "#,
        )?;
        assert_eq!(config.run_timeout_secs, 3);
        assert_eq!(config.compile_timeout_secs, 10);
        assert_eq!(config.languages.len(), 2);
        assert_eq!(config.languages["python"].backend, BackendChoice::Process);
        assert_eq!(config.languages["shell"].aliases, Vec::<String>::new());
        assert_eq!(config.process_settings().temp_prefix, "snip-");
        assert_eq!(config.process_settings().max_output_bytes, 1024 * 1024);
        Ok(())
    }

    #[test]
    fn test_zero_output_cap_rejected() {
        let result = ExecutorConfig::from_toml_str("max_output_bytes = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ExecutorConfig::from_toml_str("run_timeout_secs = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = ExecutorConfig::from_toml_str(
            "[languages.python]\nbackend = \"wasm\"",
        );
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[tokio::test]
    async fn test_load_from_file() -> Result<(), Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("exec.toml");
        fs::write(&path, "compile_timeout_secs = 20").await?;
        let config = ExecutorConfig::load(&path).await?;
        assert_eq!(config.compile_timeout(), Duration::from_secs(20));
        assert_eq!(config.languages, ExecutorConfig::default().languages);
        Ok(())
    }
}
