//! In-process JavaScript through QuickJS.
//!
//! `console` is replaced by a capture that appends every logged line to an
//! accumulator; the accumulator is the value of the evaluated script.

use async_trait::async_trait;
use rquickjs::{Context, Ctx, Runtime};
use std::time::{Duration, Instant};
use tokio::task;
use tracing::debug;

use crate::{
    error::Error,
    executor::Backend,
    types::{BackendKind, ResultEnvelope},
};

const ACCUMULATOR: &str = "__snippetOutput";

const PREAMBLE: &str = r#"var __snippetOutput = "";
var console = (function () {
  function capture() {
    var parts = [];
    for (var i = 0; i < arguments.length; i++) {
      parts.push(String(arguments[i]));
    }
    __snippetOutput += parts.join(" ") + "\n";
  }
  return { log: capture, info: capture, warn: capture, error: capture, debug: capture };
})();
"#;

#[derive(Debug)]
enum ScriptFault {
    /// Exception raised by the script or the engine itself
    Engine(String),
    /// Failure outside script evaluation
    Other(String),
}

pub struct EmbeddedScriptRunner {
    timeout: Duration,
}

impl EmbeddedScriptRunner {
    /// Runner whose scripts are interrupted after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Evaluate `code` on the calling thread.
    ///
    /// Script faults are reported in the envelope; `Err` means the engine
    /// itself could not be set up.
    pub fn evaluate(&self, code: &str) -> Result<ResultEnvelope, Error> {
        let started = Instant::now();
        let context = new_context(self.timeout)?;
        Ok(match evaluate_script(&context, code) {
            Ok(output) => ResultEnvelope::success(output.trim(), started.elapsed()),
            Err(ScriptFault::Engine(message)) => ResultEnvelope::failure(
                format!("JavaScript Error: {}", message),
                started.elapsed(),
            ),
            Err(ScriptFault::Other(message)) => ResultEnvelope::failure(
                format!("Execution failed: {}", message),
                started.elapsed(),
            ),
        })
    }
}

impl Default for EmbeddedScriptRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

fn wrap_script(code: &str) -> String {
    format!("{}{}\n;{};\n", PREAMBLE, code, ACCUMULATOR)
}

/// Fresh runtime and context, interrupted once `timeout` has elapsed
fn new_context(timeout: Duration) -> Result<Context, Error> {
    let runtime = Runtime::new().map_err(|e| Error::Engine(e.to_string()))?;
    let deadline = Instant::now() + timeout;
    runtime.set_interrupt_handler(Some(Box::new(move || Instant::now() >= deadline)));
    Context::full(&runtime).map_err(|e| Error::Engine(e.to_string()))
}

fn evaluate_script(context: &Context, code: &str) -> Result<String, ScriptFault> {
    context.with(|ctx| match ctx.eval::<String, _>(wrap_script(code)) {
        Ok(output) => Ok(output),
        Err(rquickjs::Error::Exception) => Err(ScriptFault::Engine(exception_message(&ctx))),
        Err(e) => Err(ScriptFault::Other(e.to_string())),
    })
}

fn exception_message(ctx: &Ctx<'_>) -> String {
    let caught = ctx.catch();
    if let Some(exception) = caught.as_exception() {
        return exception
            .message()
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "Uncaught exception".to_string());
    }
    caught
        .as_string()
        .and_then(|thrown| thrown.to_string().ok())
        .unwrap_or_else(|| "Uncaught exception".to_string())
}

#[async_trait]
impl Backend for EmbeddedScriptRunner {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    async fn run(&self, code: &str) -> Result<ResultEnvelope, Error> {
        let code = code.to_owned();
        let timeout = self.timeout;
        let envelope = task::spawn_blocking(move || EmbeddedScriptRunner::new(timeout).evaluate(&code))
            .await
            .map_err(|e| Error::Execution(format!("Script task failed: {}", e)))??;
        debug!(
            "Embedded script finished in {} ms",
            envelope.execution_time_ms
        );
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(code: &str) -> ResultEnvelope {
        EmbeddedScriptRunner::default()
            .evaluate(code)
            .expect("QuickJS runtime should start")
    }

    #[test]
    fn test_console_log_is_captured() {
        let envelope = evaluate("console.log('Hello');");
        assert_eq!(envelope.output, "Hello");
        assert_eq!(envelope.error, "");
    }

    #[test]
    fn test_multiple_arguments_are_space_joined() {
        let envelope = evaluate("console.log('a', 1, true); console.warn('b');");
        assert_eq!(envelope.output, "a 1 true\nb");
    }

    #[test]
    fn test_real_evaluation() {
        let code = "let total = 0;\nfor (let i = 1; i <= 4; i++) { total += i; }\nconsole.log(`total=${total}`);";
        assert_eq!(evaluate(code).output, "total=10");
    }

    #[test]
    fn test_thrown_error_is_engine_error() {
        let envelope = evaluate("throw new Error('boom');");
        assert_eq!(envelope.output, "");
        assert_eq!(envelope.error, "JavaScript Error: boom");
    }

    #[test]
    fn test_syntax_error_is_engine_error() {
        let envelope = evaluate("console.log(;");
        assert!(envelope.error.starts_with("JavaScript Error: "));
        assert!(envelope.output.is_empty());
    }

    #[test]
    fn test_trailing_comment_does_not_hide_output() {
        assert_eq!(evaluate("console.log('x') // done").output, "x");
    }

    #[test]
    fn test_infinite_loop_is_interrupted() {
        let runner = EmbeddedScriptRunner::new(Duration::from_millis(200));
        let started = Instant::now();
        let envelope = runner.evaluate("while (true) {}").expect("QuickJS runtime should start");
        assert!(envelope.error.starts_with("JavaScript Error: "));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_backend_run() -> Result<(), Error> {
        let runner = EmbeddedScriptRunner::default();
        assert_eq!(runner.kind(), BackendKind::Embedded);
        assert!(!runner.is_simulated());
        let envelope = runner.run("console.log(6 * 7)").await?;
        assert_eq!(envelope.output, "42");
        Ok(())
    }
}
