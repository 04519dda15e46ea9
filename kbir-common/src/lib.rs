//! Kbuild LLVM IR Builder - Common Types and Utilities
//!
//! This crate contains the shared data model and error definitions used
//! across all components of the kbir toolchain.

pub mod command;
pub mod error;

pub use command::{strip_shell_quotes, CommandKind, Origin, RawCommand, TranslatedCommand};
pub use error::BuildError;
