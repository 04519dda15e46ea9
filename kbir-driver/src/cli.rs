use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "kbir",
    about = "Builds kernel modules into LLVM IR",
    long_about = "kbir - Kbuild LLVM IR builder\n\nDrives an already-configured Kbuild tree to capture how modules are\ncompiled and linked, replays the captured invocations through clang and\nllvm-link, and leaves normalized LLVM IR next to the native objects.",
    version
)]
pub struct Cli {
    /// Root of the configured kernel source tree
    #[arg(long, default_value = "kernel")]
    pub kernel_dir: PathBuf,

    /// Modules directory, relative to the kernel tree
    #[arg(short, long, default_value = "drivers")]
    pub modules_dir: PathBuf,

    /// Load build configuration from a JSON file instead of flags
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit debug info into the produced IR
    #[arg(long)]
    pub debug_info: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a kernel module into linked, normalized IR
    Module {
        /// Module name (an underscore/hyphen variant is tried automatically)
        name: String,

        /// Clean the modules directory first
        #[arg(long)]
        clean: bool,
    },

    /// Build a single object file into IR
    File {
        /// Object base name, without extension
        name: String,
    },

    /// Build every module that declares parameters
    Params {
        /// Clean the modules directory first
        #[arg(long)]
        clean: bool,

        /// Write the function-list hand-off file into this directory
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,
    },

    /// List parameter-declaring source files
    Sources,

    /// Clean the modules directory
    Clean,

    /// Check that the configured toolchain is available
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_module_build() {
        let cli = Cli::parse_from(["kbir", "--kernel-dir", "/k", "module", "loop", "--clean"]);
        assert_eq!(cli.kernel_dir, PathBuf::from("/k"));
        match cli.command {
            Command::Module { name, clean } => {
                assert_eq!(name, "loop");
                assert!(clean);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_params_with_snapshot_dir() {
        let cli = Cli::parse_from(["kbir", "params", "--snapshot-dir", "snap"]);
        match cli.command {
            Command::Params {
                clean,
                snapshot_dir,
            } => {
                assert!(!clean);
                assert_eq!(snapshot_dir, Some(PathBuf::from("snap")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
