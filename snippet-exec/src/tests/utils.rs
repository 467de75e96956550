use std::{path::Path, time::Duration};

use crate::{
    languages::{self, ToolchainSpec},
    ProcessRunner, ProcessSettings,
};

pub fn settings_in(dir: &Path, run_timeout: Duration) -> ProcessSettings {
    ProcessSettings {
        compile_timeout: Duration::from_secs(10),
        run_timeout,
        temp_dir: Some(dir.to_path_buf()),
        temp_prefix: "snippet-exec-test-".to_string(),
        max_output_bytes: 1024 * 1024,
    }
}

pub fn runner_in(language: &str, dir: &Path, run_timeout: Duration) -> ProcessRunner {
    let toolchain = languages::toolchain(language).expect("built-in toolchain");
    ProcessRunner::new(toolchain, settings_in(dir, run_timeout))
}

pub fn missing_toolchain() -> ToolchainSpec {
    let mut toolchain = languages::toolchain("java").expect("built-in toolchain");
    toolchain.compile = Some(languages::CommandSpec::new(&["snippet-exec-missing-javac"], &["{source}"]));
    toolchain.run = languages::CommandSpec::new(&["snippet-exec-missing-java"], &["{entry}"]);
    toolchain
}

/// Entries left behind in a workspace parent directory
pub fn leftovers(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("readable temp dir")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect()
}
