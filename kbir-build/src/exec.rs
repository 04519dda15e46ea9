//! External process execution
//!
//! Every native and LLVM tool is invoked through the narrow
//! [`ToolRunner`] seam so orchestration and translation logic can be
//! exercised against canned traces instead of a real toolchain. The
//! working directory is an explicit parameter of each invocation; the
//! process-wide current directory is never touched.

use kbir_common::BuildError;
use std::path::Path;
use std::process::{Command, Stdio};

/// Captured outcome of one external tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: i32,
    pub stdout: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Narrow interface to external processes
pub trait ToolRunner {
    /// Run `program` with `args` in `cwd`, blocking until it exits and
    /// capturing stdout
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<ToolOutput, BuildError>;
}

/// Runner backed by `std::process::Command`.
///
/// Stderr is discarded: the build system is noisy on stderr and only
/// the stdout trace is consumed.
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<ToolOutput, BuildError> {
        log::debug!("[{}] {} {}", cwd.display(), program, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()?;
        Ok(ToolOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        })
    }
}
