//! Kbuild LLVM IR Builder Driver
//!
//! Command-line front end over the kbir build library: builds single
//! objects, whole modules, or every parameterized module in a tree.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use kbir_build::{config, discover, probe, BuildConfig, IrModuleBuilder, SystemRunner};
use std::path::{Path, PathBuf};
use std::process;

mod cli;
mod report;

use cli::{Cli, Command};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let build_config = resolve_config(&cli)?;
    let runner = SystemRunner;
    let builder = IrModuleBuilder::new(&build_config, &runner);

    match cli.command {
        Command::Module { name, clean } => {
            let module = builder
                .build_module(&name, clean)
                .with_context(|| format!("building module {name}"))?;
            println!(
                "{} {}: {}",
                "✓".green(),
                module.name(),
                module.ir_file().display()
            );
        }

        Command::File { name } => {
            let module = builder
                .build_file(&name)
                .with_context(|| format!("building file {name}"))?;
            println!(
                "{} {}: {}",
                "✓".green(),
                module.name(),
                module.ir_file().display()
            );
        }

        Command::Params {
            clean,
            snapshot_dir,
        } => {
            let outcome = builder.build_modules_with_params(clean)?;
            if let Some(dir) = snapshot_dir {
                write_snapshot(&outcome, &dir)?;
            }
            report::print_batch(&outcome);
            let code = report::exit_code(&outcome);
            if code != 0 {
                process::exit(code);
            }
        }

        Command::Sources => {
            let sources = discover::sources_with_params(&build_config.modules_path())?;
            for source in sources {
                println!("{}", source.display());
            }
        }

        Command::Clean => {
            builder.clean_modules()?;
            println!("Cleaned {}", build_config.modules_path().display());
        }

        Command::Check => {
            let mut missing = false;
            for tool in probe::check_toolchain(&build_config.toolchain) {
                if tool.found {
                    println!("{} {}", "✓".green(), tool.name);
                } else {
                    println!("{} {} not found", "✗".red(), tool.name);
                    missing = true;
                }
            }
            if missing {
                anyhow::bail!("toolchain incomplete");
            }
        }
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<BuildConfig> {
    let mut build_config = if let Some(path) = &cli.config {
        config::load_config(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        BuildConfig::new(&cli.kernel_dir, &cli.modules_dir)
    };
    if cli.debug_info {
        build_config.debug = true;
    }
    Ok(build_config)
}

/// Write the function-list hand-off for the downstream analysis engine
fn write_snapshot(outcome: &kbir_build::BatchOutcome, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let ir_files: Vec<PathBuf> = outcome.built.iter().map(|m| m.ir_file()).collect();
    let names = discover::defined_functions(&ir_files)?;
    let path = discover::write_function_list(dir, &names)?;
    println!("Function list written to {}", path.display());
    Ok(())
}
