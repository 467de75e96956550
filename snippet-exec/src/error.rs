use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No {backend} backend available for '{language}'")]
    UnsupportedLanguage {
        language: String,
        backend: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Execution(String),

    #[error("JavaScript engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn unsupported(language: &str, backend: &'static str) -> Self {
        Error::UnsupportedLanguage {
            language: language.to_string(),
            backend,
        }
    }
}
