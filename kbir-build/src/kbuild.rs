//! Kbuild orchestration
//!
//! Drives the native build system: verbose dry runs to recover the
//! exact command it would use for an object, target probing with the
//! underscore/hyphen fallback, and real module builds captured as
//! command traces.

use crate::config::BuildConfig;
use crate::exec::{ToolOutput, ToolRunner};
use kbir_common::{BuildError, RawCommand};
use std::fs;
use std::path::Path;

/// Exit status make uses when it has no rule for the requested target
const NO_SUCH_TARGET: i32 = 2;

/// Trace captured from a real module build
#[derive(Debug, Clone)]
pub struct ModuleTrace {
    /// Base name of the kernel object, possibly with underscores
    /// replaced by hyphens relative to the requested module name
    pub object_base: String,
    /// Verbatim trace lines in build order
    pub lines: Vec<String>,
}

/// Orchestrator for one configured kernel tree
pub struct Kbuild<'a> {
    config: &'a BuildConfig,
    runner: &'a dyn ToolRunner,
}

impl<'a> Kbuild<'a> {
    pub fn new(config: &'a BuildConfig, runner: &'a dyn ToolRunner) -> Self {
        Self { config, runner }
    }

    fn make(&self, args: &[String]) -> Result<ToolOutput, BuildError> {
        self.runner
            .run(&self.config.toolchain.make, args, &self.config.kernel_dir)
    }

    /// The compile command Kbuild would use for one object file.
    ///
    /// Any stale object is deleted first so the dry run has work to
    /// report; the trace is then scanned in reverse, each line split on
    /// `;`, for the last statement invoking the native compiler. Later
    /// statements are authoritative: the build system may re-issue a
    /// command after expanding wrappers.
    pub fn object_command(&self, object: &str) -> Result<RawCommand, BuildError> {
        let object_rel = self.config.modules_dir.join(object);
        self.remove_stale(&object_rel)?;

        let args = vec![
            "V=1".to_string(),
            object_rel.display().to_string(),
            "--just-print".to_string(),
        ];
        let output = self.make(&args)?;
        if !output.success() {
            return Err(BuildError::tool_failed(
                &self.config.toolchain.make,
                object_rel.display().to_string(),
            ));
        }

        last_compiler_statement(&output.stdout, &self.config.toolchain.compiler).ok_or_else(
            || {
                BuildError::malformed(format!(
                    "compiling {} did not produce a {} command",
                    object_rel.display(),
                    self.config.toolchain.compiler
                ))
            },
        )
    }

    /// Build a module with Kbuild, capturing the verbose command trace.
    ///
    /// Kbuild trees are inconsistent about separator normalization
    /// between module names and on-disk artifacts, so a name failing
    /// the target probe is retried once with underscores replaced by
    /// hyphens; no further variants are attempted. A zero exit with no
    /// `.ko` on disk is still a failure.
    pub fn build_module(&self, module: &str) -> Result<ModuleTrace, BuildError> {
        let mut name = module.to_string();
        if !self.target_exists(&self.module_args(&name))? {
            name = name.replace('_', "-");
            if !self.target_exists(&self.module_args(&name))? {
                return Err(BuildError::TargetNotFound {
                    target: module.to_string(),
                });
            }
        }

        let output = self.make(&self.module_args(&name))?;
        if !output.success() {
            return Err(BuildError::tool_failed(
                &self.config.toolchain.make,
                format!("{name}.ko"),
            ));
        }

        let ko_file = self.config.modules_path().join(format!("{name}.ko"));
        if !ko_file.is_file() {
            return Err(BuildError::ArtifactMissing {
                path: ko_file.display().to_string(),
            });
        }

        Ok(ModuleTrace {
            object_base: name,
            lines: output.stdout.lines().map(str::to_string).collect(),
        })
    }

    /// Run `make M=<modules-dir> clean` over the modules directory
    pub fn clean_modules(&self) -> Result<(), BuildError> {
        let args = vec![
            format!("M={}", self.config.modules_dir.display()),
            "clean".to_string(),
        ];
        let output = self.make(&args)?;
        if !output.success() {
            return Err(BuildError::tool_failed(
                &self.config.toolchain.make,
                self.config.modules_dir.display().to_string(),
            ));
        }
        Ok(())
    }

    fn module_args(&self, name: &str) -> Vec<String> {
        vec![
            "V=1".to_string(),
            format!("M={}", self.config.modules_dir.display()),
            format!("{name}.ko"),
        ]
    }

    /// Probe whether make knows the target; `make -n` exits with the
    /// no-such-target status when it has no rule for it
    fn target_exists(&self, args: &[String]) -> Result<bool, BuildError> {
        let mut probe = args.to_vec();
        probe.push("-n".to_string());
        let output = self.make(&probe)?;
        Ok(output.status != NO_SUCH_TARGET)
    }

    fn remove_stale(&self, object_rel: &Path) -> Result<(), BuildError> {
        let path = self.config.kernel_dir.join(object_rel);
        if path.is_file() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// Last statement in a trace that invokes the given compiler
fn last_compiler_statement(trace: &str, compiler: &str) -> Option<RawCommand> {
    for line in trace.lines().rev() {
        for statement in RawCommand::statements(line) {
            if statement.invokes(compiler) {
                return Some(statement);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{canned, FakeRunner};
    use pretty_assertions::assert_eq;

    fn test_config(kernel_dir: &Path) -> BuildConfig {
        BuildConfig::new(kernel_dir, Path::new("drivers/fake"))
    }

    #[test]
    fn test_object_command_picks_last_compiler_statement() {
        let tree = tempfile::tempdir().unwrap();
        let config = test_config(tree.path());
        let trace = "make[1]: Entering directory\n\
                     gcc -c -O2 -o drivers/fake/old.o drivers/fake/old.c\n\
                     set -e; gcc -c -DKBUILD_MODNAME='\"fake\"' -o drivers/fake/mod.o drivers/fake/mod.c; ./fixdep\n\
                     rm -f marker\n";
        let runner = FakeRunner::new(move |_, _| canned(0, trace));

        let kbuild = Kbuild::new(&config, &runner);
        let command = kbuild.object_command("mod.o").unwrap();
        assert_eq!(command.program(), Some("gcc"));
        assert!(command.mentions("drivers/fake/mod.c"));

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "make");
        assert_eq!(
            calls[0].1,
            vec!["V=1", "drivers/fake/mod.o", "--just-print"]
        );
    }

    #[test]
    fn test_object_command_removes_stale_object() {
        let tree = tempfile::tempdir().unwrap();
        let stale = tree.path().join("drivers/fake/mod.o");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"stale").unwrap();

        let config = test_config(tree.path());
        let runner =
            FakeRunner::new(|_, _| canned(0, "gcc -c -o drivers/fake/mod.o drivers/fake/mod.c\n"));
        Kbuild::new(&config, &runner).object_command("mod.o").unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_object_command_without_compiler_line_is_malformed() {
        let tree = tempfile::tempdir().unwrap();
        let config = test_config(tree.path());
        let runner = FakeRunner::new(|_, _| canned(0, "make[1]: nothing to be done\n"));

        let err = Kbuild::new(&config, &runner)
            .object_command("mod.o")
            .unwrap_err();
        assert!(matches!(err, BuildError::MalformedCommand { .. }));
    }

    #[test]
    fn test_build_module_retries_with_hyphens_once() {
        let tree = tempfile::tempdir().unwrap();
        let ko = tree.path().join("drivers/fake/foo-bar.ko");
        std::fs::create_dir_all(ko.parent().unwrap()).unwrap();
        std::fs::write(&ko, b"elf").unwrap();

        let config = test_config(tree.path());
        let runner = FakeRunner::new(|_, args: &[String]| {
            let probing = args.last().map(String::as_str) == Some("-n");
            if probing && args.iter().any(|a| a == "foo_bar.ko") {
                canned(NO_SUCH_TARGET, "")
            } else {
                canned(0, "gcc -c -o drivers/fake/foo-bar.o drivers/fake/foo-bar.c\n")
            }
        });

        let trace = Kbuild::new(&config, &runner).build_module("foo_bar").unwrap();
        assert_eq!(trace.object_base, "foo-bar");
        assert_eq!(trace.lines.len(), 1);

        // Two probes and one real build; no third name variant.
        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].1.contains(&"foo_bar.ko".to_string()));
        assert!(calls[1].1.contains(&"foo-bar.ko".to_string()));
        assert!(calls[2].1.contains(&"foo-bar.ko".to_string()));
        assert_eq!(calls[2].1.last().map(String::as_str), Some("foo-bar.ko"));
    }

    #[test]
    fn test_build_module_fails_when_both_probes_miss() {
        let tree = tempfile::tempdir().unwrap();
        let config = test_config(tree.path());
        let runner = FakeRunner::new(|_, _| canned(NO_SUCH_TARGET, ""));

        let err = Kbuild::new(&config, &runner)
            .build_module("foo_bar")
            .unwrap_err();
        assert!(matches!(err, BuildError::TargetNotFound { .. }));
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_build_module_distrusts_exit_status() {
        let tree = tempfile::tempdir().unwrap();
        let config = test_config(tree.path());
        // Probe and build both succeed, but no .ko ever appears.
        let runner = FakeRunner::new(|_, _| canned(0, "gcc -c -o a.o a.c\n"));

        let err = Kbuild::new(&config, &runner)
            .build_module("ghost")
            .unwrap_err();
        assert!(matches!(err, BuildError::ArtifactMissing { .. }));
    }

    #[test]
    fn test_clean_modules_invokes_make_clean() {
        let tree = tempfile::tempdir().unwrap();
        let config = test_config(tree.path());
        let runner = FakeRunner::new(|_, _| canned(0, ""));
        Kbuild::new(&config, &runner).clean_modules().unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].0, "make");
        assert_eq!(calls[0].1, vec!["M=drivers/fake", "clean"]);
    }
}
