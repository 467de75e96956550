use std::sync::LazyLock;

use super::{CommandSpec, ToolchainSpec};
use crate::simulator::SimulatorRules;

const LITERAL_PRINT: &str =
    r#"\bprint\(\s*(?:"((?:[^"\\$\n]|\\.)*)"|'((?:[^'\\$\n]|\\.)*)')\s*\)"#;
const INTERPOLATED_PRINT: &str = r#"\bprint\(\s*(?:"((?:[^"\\\n]|\\.)*\$(?:[^"\\\n]|\\.)*)"|'((?:[^'\\\n]|\\.)*\$(?:[^'\\\n]|\\.)*)')\s*\)"#;
const ARITHMETIC: &str = r"\$\{\s*(-?\d+)\s*([-+*/])\s*(-?\d+)\s*\}";
const ENTRY_POINT: &str = r"\bmain\s*\([^)]*\)\s*(?:async\s*)?\{";

static RULES: LazyLock<SimulatorRules> = LazyLock::new(|| {
    SimulatorRules::new("Dart", LITERAL_PRINT)
        .with_interpolation(INTERPOLATED_PRINT, ARITHMETIC)
        .with_entry_point(ENTRY_POINT)
});

pub(crate) fn simulator_rules() -> &'static SimulatorRules {
    &RULES
}

pub(crate) fn toolchain() -> ToolchainSpec {
    ToolchainSpec {
        language: "Dart",
        extension: "dart",
        install_hint: "Dart SDK",
        compile: None,
        run: CommandSpec::new(&["dart"], &["{source}"]),
        entry_type: None,
    }
}
