use super::{CommandSpec, ToolchainSpec};

/// POSIX shell toolchain; `sh -n` stands in as a syntax-only compile step
pub(crate) fn toolchain() -> ToolchainSpec {
    ToolchainSpec {
        language: "Shell",
        extension: "sh",
        install_hint: "A POSIX shell",
        compile: Some(CommandSpec::new(&["sh"], &["-n", "{source}"])),
        run: CommandSpec::new(&["sh"], &["{source}"]),
        entry_type: None,
    }
}
