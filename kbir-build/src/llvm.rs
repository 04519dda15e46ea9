//! IR build execution and normalization
//!
//! Runs a translated build plan in order, normalizes each produced IR
//! file in place with a fixed opt pipeline, and verifies the final
//! module artifact before handing it to the caller.

use crate::exec::ToolRunner;
use kbir_common::{BuildError, Origin, TranslatedCommand};
use std::path::{Path, PathBuf};

/// Passes applied to compile-origin IR. Order matters: register
/// promotion requires lowered branches, and the loop/CFG cleanup runs
/// over the promoted form.
const COMPILE_PASSES: [&str; 4] = ["-lowerswitch", "-mem2reg", "-loop-simplify", "-simplifycfg"];

/// After whole-module linking only constant merging is meaningful; it
/// collapses constants duplicated across the linked units.
const LINK_PASSES: [&str; 1] = ["-constmerge"];

/// A kernel module successfully built into LLVM IR.
///
/// Only the verifying constructor creates one, so holding a value
/// means the primary IR artifact existed at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleBuildResult {
    name: String,
    object_base: String,
    dir: PathBuf,
}

impl ModuleBuildResult {
    /// Wrap a finished build, verifying the primary IR artifact exists.
    ///
    /// The check guards against build systems that silently no-op a
    /// step whose prerequisites were already satisfied.
    pub fn verified(name: &str, object_base: &str, dir: &Path) -> Result<Self, BuildError> {
        let artifact = dir.join(format!("{object_base}.bc"));
        if !artifact.is_file() {
            return Err(BuildError::ArtifactMissing {
                path: artifact.display().to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            object_base: object_base.to_string(),
            dir: dir.to_path_buf(),
        })
    }

    /// Module name as requested by the caller
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base name of the kernel object; may differ from the module name
    pub fn object_base(&self) -> &str {
        &self.object_base
    }

    /// Directory containing the produced artifacts
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the module's primary IR file
    pub fn ir_file(&self) -> PathBuf {
        self.dir.join(format!("{}.bc", self.object_base))
    }
}

/// Execute one translated command and normalize its output
pub fn build_ir_file(
    runner: &dyn ToolRunner,
    command: &TranslatedCommand,
    cwd: &Path,
    opt: &str,
) -> Result<(), BuildError> {
    log::info!("[{}] {}", command.program(), command.output());
    let result = runner.run(command.program(), command.args(), cwd)?;
    if !result.success() {
        return Err(BuildError::tool_failed(
            command.program(),
            command.output().to_string(),
        ));
    }
    optimize(runner, opt, command.output(), command.origin(), cwd)
}

/// Run the fixed normalization pipeline over one IR file, in place
fn optimize(
    runner: &dyn ToolRunner,
    opt: &str,
    file: &str,
    origin: Origin,
    cwd: &Path,
) -> Result<(), BuildError> {
    let passes: &[&str] = match origin {
        Origin::Compile => &COMPILE_PASSES,
        Origin::Link => &LINK_PASSES,
    };
    let mut args = vec![
        "-S".to_string(),
        file.to_string(),
        "-o".to_string(),
        file.to_string(),
    ];
    args.extend(passes.iter().map(|p| p.to_string()));

    let result = runner.run(opt, &args, cwd)?;
    if !result.success() {
        return Err(BuildError::tool_failed(opt, file.to_string()));
    }
    Ok(())
}

/// Execute a whole plan in order; the first failure aborts the rest.
///
/// Artifacts from completed steps are left on disk for inspection.
pub fn run_plan(
    runner: &dyn ToolRunner,
    plan: &[TranslatedCommand],
    cwd: &Path,
    opt: &str,
) -> Result<(), BuildError> {
    for command in plan {
        build_ir_file(runner, command, cwd, opt)?;
    }
    Ok(())
}
