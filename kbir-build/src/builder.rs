//! Module build facade
//!
//! Ties discovery, orchestration, translation and execution together
//! behind the surface the driver consumes: build one object, build one
//! module, or build everything that declares parameters.

use crate::config::BuildConfig;
use crate::discover::{self, ParameterizedSource};
use crate::exec::ToolRunner;
use crate::kbuild::Kbuild;
use crate::llvm::{self, ModuleBuildResult};
use crate::translate;
use kbir_common::BuildError;
use std::collections::BTreeSet;
use std::path::Path;

/// One module that failed during a batch build
#[derive(Debug)]
pub struct ModuleFailure {
    pub module: String,
    pub error: BuildError,
}

/// Outcome of a best-effort batch build: results plus a parallel list
/// of per-module failures. A failing module never aborts the batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub built: Vec<ModuleBuildResult>,
    pub failed: Vec<ModuleFailure>,
}

/// Builds kernel modules from one configured tree into LLVM IR
pub struct IrModuleBuilder<'a> {
    config: &'a BuildConfig,
    runner: &'a dyn ToolRunner,
}

impl<'a> IrModuleBuilder<'a> {
    pub fn new(config: &'a BuildConfig, runner: &'a dyn ToolRunner) -> Self {
        Self { config, runner }
    }

    fn kbuild(&self) -> Kbuild<'_> {
        Kbuild::new(self.config, self.runner)
    }

    /// Build a single object file into optimized IR.
    ///
    /// Captures the native compile command for `<name>.o`, translates
    /// it, and runs it; the result's object base equals the name.
    pub fn build_file(&self, name: &str) -> Result<ModuleBuildResult, BuildError> {
        let raw = self.kbuild().object_command(&format!("{name}.o"))?;
        let command = translate::compile_to_ir(&raw, &self.config.toolchain.clang, self.config.debug)?;
        llvm::build_ir_file(
            self.runner,
            &command,
            &self.config.kernel_dir,
            &self.config.toolchain.opt,
        )?;
        ModuleBuildResult::verified(name, name, &self.config.modules_path())
    }

    /// Build a kernel module into linked, normalized IR.
    ///
    /// The resolved object base may differ from the requested name by
    /// underscore/hyphen substitution.
    pub fn build_module(&self, module: &str, clean: bool) -> Result<ModuleBuildResult, BuildError> {
        let kbuild = self.kbuild();
        if clean {
            kbuild.clean_modules()?;
        }
        let trace = kbuild.build_module(module)?;
        let plan = translate::trace_to_plan(
            &trace.lines,
            &trace.object_base,
            &self.config.toolchain,
            self.config.debug,
        )?;
        llvm::run_plan(
            self.runner,
            &plan,
            &self.config.kernel_dir,
            &self.config.toolchain.opt,
        )?;
        ModuleBuildResult::verified(module, &trace.object_base, &self.config.modules_path())
    }

    /// Clean the modules directory through the native build system
    pub fn clean_modules(&self) -> Result<(), BuildError> {
        self.kbuild().clean_modules()
    }

    /// Resolve one parameter-declaring source to its owning module.
    ///
    /// The name is extracted from the compile command of the source's
    /// object counterpart; sources nested below the modules directory
    /// get the subdirectory prepended, producing composite identifiers
    /// for nested module groups.
    pub fn resolve_module(&self, source: &Path) -> Result<ParameterizedSource, BuildError> {
        let relative = source
            .strip_prefix(self.config.modules_path())
            .map_err(|_| BuildError::NameResolution {
                object: source.display().to_string(),
            })?;
        let object = relative.with_extension("o");
        let raw = self.kbuild().object_command(&object.to_string_lossy())?;

        let mut module = discover::module_name_of(&raw, &object.to_string_lossy())?;
        if let Some(subdir) = relative.parent().filter(|p| !p.as_os_str().is_empty()) {
            module = format!("{}/{}", subdir.display(), module);
        }
        Ok(ParameterizedSource {
            path: source.to_path_buf(),
            module,
        })
    }

    /// The set of modules owning parameter-declaring sources.
    ///
    /// Units whose module cannot be resolved are logged and skipped;
    /// discovery is best-effort, never all-or-nothing.
    pub fn parameterized_modules(&self) -> Result<BTreeSet<String>, BuildError> {
        let sources = discover::sources_with_params(&self.config.modules_path())?;
        let mut modules = BTreeSet::new();
        for source in &sources {
            match self.resolve_module(source) {
                Ok(resolved) => {
                    modules.insert(resolved.module);
                }
                Err(err) => log::warn!("skipping {}: {}", source.display(), err),
            }
        }
        Ok(modules)
    }

    /// Build every module that declares parameters, one at a time.
    ///
    /// Failures are recorded and the batch continues with the next
    /// module.
    pub fn build_modules_with_params(&self, clean: bool) -> Result<BatchOutcome, BuildError> {
        if clean {
            self.clean_modules()?;
        }
        let modules = self.parameterized_modules()?;

        let mut outcome = BatchOutcome::default();
        for module in modules {
            log::info!("building {module}");
            match self.build_module(&module, false) {
                Ok(result) => outcome.built.push(result),
                Err(error) => {
                    log::warn!("{module}: {error}");
                    outcome.failed.push(ModuleFailure { module, error });
                }
            }
        }
        Ok(outcome)
    }
}
