use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info};

use crate::{
    config::{BackendChoice, ExecutorConfig},
    embedded::EmbeddedScriptRunner,
    error::Error,
    executor::Backend,
    languages,
    process::ProcessRunner,
    simulator::PatternSimulator,
    types::LanguageInfo,
};

/// Lower-cased, trimmed language identifier used for lookups
pub fn normalize_language(language: &str) -> String {
    language.trim().to_lowercase()
}

/// Read-only mapping from language identifiers (names and aliases) to
/// backends, built once at startup.
#[derive(Default)]
pub struct LanguageRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
    languages: Vec<LanguageInfo>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ExecutorConfig) -> Result<Self, Error> {
        config.validate()?;
        let mut registry = Self::new();

        for (name, language) in &config.languages {
            let name = normalize_language(name);
            let backend = build_backend(&name, language.backend, config)?;
            let aliases: Vec<&str> = language.aliases.iter().map(String::as_str).collect();
            registry.register(&name, &aliases, backend)?;
        }

        info!(
            "Registered languages: {}",
            registry
                .languages
                .iter()
                .map(|language| format!("{} ({})", language.name, language.backend))
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(registry)
    }

    /// Register a backend under `name` and its aliases
    pub fn register(
        &mut self,
        name: &str,
        aliases: &[&str],
        backend: Arc<dyn Backend>,
    ) -> Result<(), Error> {
        let name = normalize_language(name);
        let aliases: Vec<String> = aliases.iter().map(|alias| normalize_language(alias)).collect();

        for key in std::iter::once(&name).chain(aliases.iter()) {
            if key.is_empty() {
                return Err(Error::Config("language identifiers must not be empty".into()));
            }
            if self.backends.contains_key(key) {
                return Err(Error::Config(format!(
                    "language identifier '{}' is registered twice",
                    key
                )));
            }
        }

        for key in std::iter::once(&name).chain(aliases.iter()) {
            self.backends.insert(key.clone(), Arc::clone(&backend));
        }
        self.languages.push(LanguageInfo {
            name,
            aliases,
            backend: backend.kind(),
            simulated: backend.is_simulated(),
        });
        Ok(())
    }

    /// Backend for a language name or alias, matched case-insensitively
    pub fn get(&self, language: &str) -> Option<&Arc<dyn Backend>> {
        self.backends.get(&normalize_language(language))
    }

    pub fn languages(&self) -> &[LanguageInfo] {
        &self.languages
    }
}

fn build_backend(
    name: &str,
    choice: BackendChoice,
    config: &ExecutorConfig,
) -> Result<Arc<dyn Backend>, Error> {
    let backend: Arc<dyn Backend> = match choice {
        BackendChoice::Process => {
            let toolchain = languages::toolchain(name)
                .ok_or_else(|| Error::unsupported(name, "process"))?;
            Arc::new(ProcessRunner::new(toolchain, config.process_settings()))
        }
        BackendChoice::Embedded => {
            if name != "javascript" {
                return Err(Error::unsupported(name, "embedded"));
            }
            Arc::new(EmbeddedScriptRunner::new(config.run_timeout()))
        }
        BackendChoice::Simulator => {
            let simulator = PatternSimulator::for_language(name)
                .ok_or_else(|| Error::unsupported(name, "simulator"))?;
            Arc::new(simulator)
        }
        BackendChoice::Auto => {
            let toolchain = languages::toolchain(name);
            match toolchain {
                Some(toolchain) if toolchain.is_available() => {
                    Arc::new(ProcessRunner::new(toolchain, config.process_settings()))
                }
                _ if name == "javascript" => Arc::new(EmbeddedScriptRunner::new(config.run_timeout())),
                Some(toolchain) => match PatternSimulator::for_language(name) {
                    Some(simulator) => Arc::new(simulator),
                    None => Arc::new(ProcessRunner::new(toolchain, config.process_settings())),
                },
                None => {
                    let simulator = PatternSimulator::for_language(name)
                        .ok_or_else(|| Error::unsupported(name, "auto"))?;
                    Arc::new(simulator)
                }
            }
        }
    };
    debug!("Language '{}' served by {} backend", name, backend.kind());
    Ok(backend)
}
