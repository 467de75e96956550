//! # Snippet Execution
//!
//! Runs a source snippet in a declared language and returns a uniform
//! envelope of output, error text and elapsed time. Each language is served
//! by exactly one backend: a spawned toolchain process, an in-process
//! JavaScript engine, or a pattern simulator that synthesizes plausible
//! output without executing anything.

mod config;
mod dispatcher;
mod embedded;
mod error;
mod executor;
pub mod languages;
mod process;
mod registry;
mod simulator;
mod types;

#[cfg(test)]
mod tests;

pub use config::{BackendChoice, ExecutorConfig, LanguageConfig};
pub use dispatcher::Dispatcher;
pub use embedded::EmbeddedScriptRunner;
pub use error::Error;
pub use executor::Backend;
pub use languages::{CommandSpec, ToolchainSpec};
pub use process::{ProcessOutcome, ProcessRunner, ProcessSettings};
pub use registry::{normalize_language, LanguageRegistry};
pub use simulator::{PatternSimulator, SimulatorRules, MAX_LOOP_ITERATIONS};
pub use types::{BackendKind, ExecutionRequest, LanguageInfo, ResultEnvelope};

/// Result type for snippet execution operations
pub type Result<T> = std::result::Result<T, Error>;
