use super::{CommandSpec, ToolchainSpec};

pub(crate) fn toolchain() -> ToolchainSpec {
    ToolchainSpec {
        language: "JavaScript",
        extension: "js",
        install_hint: "Node.js",
        compile: None,
        run: CommandSpec::new(&["node"], &["{source}"]),
        entry_type: None,
    }
}
