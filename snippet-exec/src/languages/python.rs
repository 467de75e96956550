use std::sync::LazyLock;

use super::{CommandSpec, ToolchainSpec};
use crate::simulator::SimulatorRules;

const LITERAL_PRINT: &str =
    r#"\bprint\(\s*(?:"((?:[^"\\\n]|\\.)*)"|'((?:[^'\\\n]|\\.)*)')\s*\)"#;
const FSTRING_PRINT: &str =
    r#"\bprint\(\s*[fF](?:"((?:[^"\\\n]|\\.)*)"|'((?:[^'\\\n]|\\.)*)')\s*\)"#;
const ARITHMETIC: &str = r"\{\s*(-?\d+)\s*([-+*/])\s*(-?\d+)\s*\}";
const RANGE_LOOP: &str = r"(?m)^([ \t]*)for[ \t]+([A-Za-z_]\w*)[ \t]+in[ \t]+range\([ \t]*(?:0[ \t]*,[ \t]*)?(\d+)[ \t]*\)[ \t]*:[ \t]*(?:#[^\n]*)?\r?$";
const LOOP_BODY_PRINT: &str = r#"\bprint\(\s*(?:[fF](?:"((?:[^"\\\n]|\\.)*)"|'((?:[^'\\\n]|\\.)*)')|([A-Za-z_]\w*))\s*\)"#;
const PLACEHOLDER: &str = r"\{([^{}]*)\}";

static RULES: LazyLock<SimulatorRules> = LazyLock::new(|| {
    SimulatorRules::new("Python", LITERAL_PRINT)
        .with_interpolation(FSTRING_PRINT, ARITHMETIC)
        .with_counted_loop(RANGE_LOOP, LOOP_BODY_PRINT, PLACEHOLDER)
        .with_brace_escapes()
});

pub(crate) fn simulator_rules() -> &'static SimulatorRules {
    &RULES
}

pub(crate) fn toolchain() -> ToolchainSpec {
    ToolchainSpec {
        language: "Python",
        extension: "py",
        install_hint: "Python",
        compile: None,
        run: CommandSpec::new(&["python3", "python"], &["{source}"]),
        entry_type: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulate(code: &str) -> String {
        simulator_rules().simulate(code)
    }

    #[test]
    fn test_literal_prints() {
        assert_eq!(simulate("print('Hi')"), "Hi");
        assert_eq!(
            simulate("print(\"Hello\")\nx = 1\nprint('World')"),
            "Hello\nWorld"
        );
    }

    #[test]
    fn test_escaped_quotes_and_newlines() {
        assert_eq!(simulate(r#"print("say \"hi\"")"#), "say \"hi\"");
        assert_eq!(simulate(r"print('a\nb')"), "a\nb");
    }

    #[test]
    fn test_fstring_arithmetic() {
        assert_eq!(simulate(r#"print(f"Sum: {2+3}")"#), "Sum: 5");
        assert_eq!(simulate(r#"print(f"{10 / 3} and {4 * 5}")"#), "3 and 20");
        assert_eq!(simulate(r#"print(f"Oops {1/0}")"#), "Oops Error");
    }

    #[test]
    fn test_fstring_unknown_placeholder_is_verbatim() {
        assert_eq!(simulate(r#"print(f"Hello, {name}!")"#), "Hello, {name}!");
    }

    #[test]
    fn test_literals_precede_interpolations() {
        let code = "print(f\"{1+1}\")\nprint(\"plain\")";
        assert_eq!(simulate(code), "plain\n2");
    }

    #[test]
    fn test_counted_loop_prints_variable() {
        let code = "for i in range(3):\n    print(i)\n";
        assert_eq!(simulate(code), "0\n1\n2");
    }

    #[test]
    fn test_counted_loop_with_explicit_zero_start() {
        let code = "for n in range(0, 2):\n    print(f\"n={n}\")";
        assert_eq!(simulate(code), "n=0\nn=1");
    }

    #[test]
    fn test_counted_loop_fstring_owned_by_loop_pass() {
        let code = "for i in range(4):\n    print(f\"Item {i}\")\n";
        let output = simulate(code);
        assert_eq!(output.lines().count(), 4);
        assert_eq!(output, "Item 0\nItem 1\nItem 2\nItem 3");
    }

    #[test]
    fn test_counted_loop_arithmetic_on_index() {
        let code = "for i in range(3):\n    print(f\"{i} squared-ish {i*2}\")";
        assert_eq!(simulate(code), "0 squared-ish 0\n1 squared-ish 2\n2 squared-ish 4");
    }

    #[test]
    fn test_counted_loop_repeats_prints_without_index() {
        let code = "for i in range(2):\n    print(f\"sum {2+3}\")\n";
        assert_eq!(simulate(code), "sum 5\nsum 5");

        let code = "for i in range(2):\n    print(f\"{i}\")\n    print(f\"tick {name}\")";
        assert_eq!(simulate(code), "0\ntick {name}\n1\ntick {name}");
    }

    #[test]
    fn test_fstring_escaped_braces_are_literal() {
        assert_eq!(simulate(r#"print(f"{{2+3}}")"#), "{2+3}");
        assert_eq!(simulate(r#"print(f"{{x}} = {1+1}")"#), "{x} = 2");

        let code = "for i in range(2):\n    print(f\"{{i}} is {i}\")";
        assert_eq!(simulate(code), "{i} is 0\n{i} is 1");
    }

    #[test]
    fn test_loop_body_ends_at_dedent() {
        let code = "for i in range(2):\n    print(i)\nprint(f\"after {i}\")";
        assert_eq!(simulate(code), "after {i}\n0\n1");
    }

    #[test]
    fn test_loop_unrolling_is_capped() {
        let code = "for i in range(5000):\n    print(i)";
        assert_eq!(
            simulate(code).lines().count() as u64,
            crate::simulator::MAX_LOOP_ITERATIONS
        );
    }

    #[test]
    fn test_unrecognized_constructs_are_omitted() {
        let code = "x = 2\nprint(x)\nprint('shown')\nwhile True:\n    pass";
        assert_eq!(simulate(code), "shown");
    }

    #[test]
    fn test_no_fallback_line() {
        assert_eq!(simulate("x = 1"), "");
    }
}
