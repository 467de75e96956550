use async_trait::async_trait;

use crate::{
    error::Error,
    types::{BackendKind, ResultEnvelope},
};

/// Execution strategy selected per language.
///
/// Implementations return an envelope for every outcome they understand
/// (including toolchain and program failures). An `Err` is reserved for
/// faults the backend cannot describe itself; the dispatcher turns those
/// into an `Execution failed` envelope.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Strategy used by this backend
    fn kind(&self) -> BackendKind;

    /// True when output is synthesized instead of produced by running the code
    fn is_simulated(&self) -> bool {
        self.kind() == BackendKind::Simulated
    }

    /// Run a snippet and describe the result
    async fn run(&self, code: &str) -> Result<ResultEnvelope, Error>;
}
