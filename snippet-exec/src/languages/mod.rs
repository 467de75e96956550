//! Per-language toolchains and simulator rules

mod dart;
mod java;
mod javascript;
mod python;
mod shell;

use std::path::{Path, PathBuf};
use which::which;

use crate::simulator::SimulatorRules;

/// External binaries and arguments used to run one language as a subprocess.
///
/// Arguments may contain the placeholders `{source}` (path of the source
/// file), `{dir}` (the per-invocation workspace) and `{entry}` (the entry
/// type name for languages that need one).
#[derive(Debug, Clone)]
pub struct ToolchainSpec {
    /// Display name used in messages, e.g. "Java"
    pub language: &'static str,
    /// Source file extension without the dot
    pub extension: &'static str,
    /// What must be installed for this toolchain, used in remediation hints
    pub install_hint: &'static str,
    /// Optional compile step run before `run`
    pub compile: Option<CommandSpec>,
    /// Interpreter or runner invocation
    pub run: CommandSpec,
    /// Derives the entry type name from the source; also names the source file
    pub entry_type: Option<fn(&str) -> String>,
}

/// One subprocess invocation with ordered binary candidates
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub candidates: Vec<&'static str>,
    pub args: Vec<&'static str>,
}

impl CommandSpec {
    pub fn new(candidates: &[&'static str], args: &[&'static str]) -> Self {
        Self {
            candidates: candidates.to_vec(),
            args: args.to_vec(),
        }
    }

    /// First candidate found on `PATH`
    pub fn resolve(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find_map(|candidate| which(candidate).ok())
    }

    /// Arguments with placeholders replaced
    pub fn render_args(&self, source: &Path, dir: &Path, entry: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{source}", &source.to_string_lossy())
                    .replace("{dir}", &dir.to_string_lossy())
                    .replace("{entry}", entry)
            })
            .collect()
    }
}

impl ToolchainSpec {
    /// True when every step of the toolchain has a binary on `PATH`
    pub fn is_available(&self) -> bool {
        self.run.resolve().is_some()
            && self
                .compile
                .as_ref()
                .map_or(true, |compile| compile.resolve().is_some())
    }

    /// Name of the source file written into the workspace
    pub fn source_file_name(&self, code: &str) -> String {
        match self.entry_type {
            Some(entry_type) => format!("{}.{}", entry_type(code), self.extension),
            None => format!("source.{}", self.extension),
        }
    }
}

/// Built-in toolchain for a canonical language name
pub fn toolchain(language: &str) -> Option<ToolchainSpec> {
    match language {
        "python" => Some(python::toolchain()),
        "javascript" => Some(javascript::toolchain()),
        "java" => Some(java::toolchain()),
        "dart" => Some(dart::toolchain()),
        "shell" => Some(shell::toolchain()),
        _ => None,
    }
}

/// Built-in simulator rules for a canonical language name
pub(crate) fn simulator_rules(language: &str) -> Option<&'static SimulatorRules> {
    match language {
        "python" => Some(python::simulator_rules()),
        "java" => Some(java::simulator_rules()),
        "dart" => Some(dart::simulator_rules()),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn skip_if_not_available(tools: &[&str]) -> bool {
    let missing: Vec<_> = tools
        .iter()
        .filter(|tool| which(**tool).is_err())
        .map(|s| (*s).to_string())
        .collect();

    if !missing.is_empty() {
        eprintln!("Skipping test: {} not available", missing.join(", "));
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_args() {
        let command = CommandSpec::new(&["java"], &["-cp", "{dir}", "{entry}"]);
        let args = command.render_args(
            Path::new("/tmp/ws/Foo.java"),
            Path::new("/tmp/ws"),
            "Foo",
        );
        assert_eq!(args, vec!["-cp", "/tmp/ws", "Foo"]);
    }

    #[test]
    fn test_unknown_toolchain() {
        assert!(toolchain("cobol").is_none());
        assert!(simulator_rules("javascript").is_none());
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let command = CommandSpec::new(&["snippet-exec-no-such-binary"], &[]);
        assert!(command.resolve().is_none());
    }

    #[test]
    fn test_source_file_name() {
        let java = toolchain("java").unwrap();
        assert_eq!(
            java.source_file_name("public class Foo { }"),
            "Foo.java"
        );
        let python = toolchain("python").unwrap();
        assert_eq!(python.source_file_name("print(1)"), "source.py");
    }
}
