//! Build configuration
//!
//! Describes where the configured kernel tree lives and which external
//! tools drive the build. Loadable from JSON so a prepared tree can be
//! reused across runs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Names (or paths) of the external tools used during a build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toolchain {
    /// Native build system
    #[serde(default = "default_make")]
    pub make: String,
    /// Native compiler whose trace lines are captured
    #[serde(default = "default_compiler")]
    pub compiler: String,
    /// Native linker whose trace lines are captured
    #[serde(default = "default_linker")]
    pub linker: String,
    /// IR-emitting compiler
    #[serde(default = "default_clang")]
    pub clang: String,
    /// IR linker
    #[serde(default = "default_llvm_link")]
    pub llvm_link: String,
    /// IR optimizer
    #[serde(default = "default_opt")]
    pub opt: String,
}

fn default_make() -> String {
    "make".to_string()
}

fn default_compiler() -> String {
    "gcc".to_string()
}

fn default_linker() -> String {
    "ld".to_string()
}

fn default_clang() -> String {
    "clang".to_string()
}

fn default_llvm_link() -> String {
    "llvm-link".to_string()
}

fn default_opt() -> String {
    "opt".to_string()
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            make: default_make(),
            compiler: default_compiler(),
            linker: default_linker(),
            clang: default_clang(),
            llvm_link: default_llvm_link(),
            opt: default_opt(),
        }
    }
}

/// Configuration for building modules out of one kernel tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Root of the configured kernel source tree
    pub kernel_dir: PathBuf,
    /// Directory containing the modules, relative to `kernel_dir`
    pub modules_dir: PathBuf,
    /// Emit debug info into the produced IR
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub toolchain: Toolchain,
}

impl BuildConfig {
    pub fn new(kernel_dir: &Path, modules_dir: &Path) -> Self {
        Self {
            kernel_dir: kernel_dir.to_path_buf(),
            modules_dir: modules_dir.to_path_buf(),
            debug: false,
            toolchain: Toolchain::default(),
        }
    }

    /// Absolute path of the modules directory
    pub fn modules_path(&self) -> PathBuf {
        self.kernel_dir.join(&self.modules_dir)
    }
}

/// Load a build configuration from a JSON file
pub fn load_config(path: &Path) -> Result<BuildConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: BuildConfig = serde_json::from_str(&content)?;
    Ok(config)
}

/// Save a build configuration to a JSON file
pub fn save_config(config: &BuildConfig, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
