use regex::Regex;
use std::sync::LazyLock;

use super::{CommandSpec, ToolchainSpec};
use crate::simulator::SimulatorRules;

/// Entry type used when the source declares no public class
pub const DEFAULT_ENTRY_TYPE: &str = "TempClass";

const LITERAL_PRINT: &str = r#"\bSystem\.out\.print(?:ln)?\(\s*"((?:[^"\\\n]|\\.)*)"\s*\)"#;
const ENTRY_POINT: &str = r"\bpublic\s+static\s+void\s+main\s*\(";

static PUBLIC_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bpublic\s+(?:final\s+|abstract\s+)?class\s+([A-Za-z_$][\w$]*)")
        .expect("public class pattern is valid")
});

static RULES: LazyLock<SimulatorRules> = LazyLock::new(|| {
    SimulatorRules::new("Java", LITERAL_PRINT).with_entry_point(ENTRY_POINT)
});

pub(crate) fn simulator_rules() -> &'static SimulatorRules {
    &RULES
}

/// Name of the public class, which `javac` requires to match the file name
pub(crate) fn entry_type(code: &str) -> String {
    PUBLIC_CLASS
        .captures(code)
        .map_or_else(|| DEFAULT_ENTRY_TYPE.to_string(), |caps| caps[1].to_string())
}

pub(crate) fn toolchain() -> ToolchainSpec {
    ToolchainSpec {
        language: "Java",
        extension: "java",
        install_hint: "Java SDK",
        compile: Some(CommandSpec::new(&["javac"], &["-d", "{dir}", "{source}"])),
        run: CommandSpec::new(&["java"], &["-cp", "{dir}", "{entry}"]),
        entry_type: Some(entry_type),
    }
}
