use std::{any::Any, sync::Arc};
use tokio::task::JoinError;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    config::ExecutorConfig,
    error::Error,
    registry::LanguageRegistry,
    types::{ExecutionRequest, LanguageInfo, ResultEnvelope},
};

/// Routes each request to the backend registered for its language.
///
/// `execute` never fails: unsupported languages, backend errors and backend
/// panics all come back as a well-formed envelope.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<LanguageRegistry>,
}

impl Dispatcher {
    pub fn new(registry: LanguageRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn from_config(config: &ExecutorConfig) -> Result<Self, Error> {
        Ok(Self::new(LanguageRegistry::from_config(config)?))
    }

    pub fn languages(&self) -> &[LanguageInfo] {
        self.registry.languages()
    }

    pub async fn handle(&self, request: ExecutionRequest) -> ResultEnvelope {
        self.execute(&request.code, &request.language).await
    }

    pub async fn execute(&self, code: &str, language: &str) -> ResultEnvelope {
        let request_id = Uuid::new_v4();
        let span = info_span!("execute", %request_id, language);
        self.dispatch(code, language).instrument(span).await
    }

    async fn dispatch(&self, code: &str, language: &str) -> ResultEnvelope {
        let Some(backend) = self.registry.get(language) else {
            warn!("Language '{}' not supported", language);
            return ResultEnvelope::unsupported(language);
        };
        let backend = Arc::clone(backend);
        let kind = backend.kind();
        debug!("Dispatching {} bytes to {} backend", code.len(), kind);

        let code = code.to_owned();
        let task = tokio::spawn(async move { backend.run(&code).await }.in_current_span());

        match task.await {
            Ok(Ok(envelope)) => {
                info!(
                    backend = %kind,
                    elapsed_ms = envelope.execution_time_ms,
                    success = envelope.is_success(),
                    "Execution finished"
                );
                envelope
            }
            Ok(Err(e)) => {
                error!("Backend failed: {}", e);
                ResultEnvelope::execution_failed(e)
            }
            Err(e) => {
                let message = join_error_message(e);
                error!("Backend task aborted: {}", message);
                ResultEnvelope::execution_failed(message)
            }
        }
    }
}

fn join_error_message(e: JoinError) -> String {
    if !e.is_panic() {
        return e.to_string();
    }
    panic_message(e.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .unwrap_or_else(|| "backend panicked".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        executor::Backend,
        types::BackendKind,
    };
    use async_trait::async_trait;

    struct Faulty;

    #[async_trait]
    impl Backend for Faulty {
        fn kind(&self) -> BackendKind {
            BackendKind::Process
        }

        async fn run(&self, _code: &str) -> Result<ResultEnvelope, Error> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "no access",
            )))
        }
    }

    struct EngineDown;

    #[async_trait]
    impl Backend for EngineDown {
        fn kind(&self) -> BackendKind {
            BackendKind::Embedded
        }

        async fn run(&self, _code: &str) -> Result<ResultEnvelope, Error> {
            Err(Error::Engine("out of memory".into()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Backend for Panicking {
        fn kind(&self) -> BackendKind {
            BackendKind::Embedded
        }

        async fn run(&self, _code: &str) -> Result<ResultEnvelope, Error> {
            panic!("engine exploded")
        }
    }

    fn dispatcher_with(name: &str, backend: Arc<dyn Backend>) -> Dispatcher {
        let mut registry = LanguageRegistry::new();
        registry.register(name, &[], backend).unwrap();
        Dispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_backend_error_becomes_envelope() {
        let dispatcher = dispatcher_with("faulty", Arc::new(Faulty));
        let envelope = dispatcher.execute("x", "faulty").await;
        assert_eq!(envelope.output, "");
        assert_eq!(envelope.error, "Execution failed: IO error: no access");
        assert_eq!(envelope.execution_time_ms, 0);
    }

    #[tokio::test]
    async fn test_engine_setup_error_becomes_envelope() {
        let dispatcher = dispatcher_with("js", Arc::new(EngineDown));
        let envelope = dispatcher.execute("console.log(1)", "js").await;
        assert_eq!(
            envelope.error,
            "Execution failed: JavaScript engine error: out of memory"
        );
        assert!(!envelope.is_success());
    }

    #[tokio::test]
    async fn test_backend_panic_becomes_envelope() {
        let dispatcher = dispatcher_with("boom", Arc::new(Panicking));
        let envelope = dispatcher.execute("x", "BOOM").await;
        assert_eq!(envelope.error, "Execution failed: engine exploded");
        assert_eq!(envelope.execution_time_ms, 0);
    }

    #[tokio::test]
    async fn test_unsupported_language_skips_backends() {
        let dispatcher = dispatcher_with("boom", Arc::new(Panicking));
        let envelope = dispatcher.execute("x", "Rust").await;
        assert_eq!(envelope, ResultEnvelope::unsupported("Rust"));
        assert_eq!(envelope.error, "Language 'Rust' not supported");
    }

    #[test]
    fn test_panic_message_from_str() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload), "static message");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload), "backend panicked");
    }
}
