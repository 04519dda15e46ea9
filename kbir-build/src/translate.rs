//! Native-to-LLVM command translation
//!
//! Rewrites the compiler and linker invocations captured from the
//! native build into clang/llvm-link invocations emitting textual IR.
//! Everything here works on token lists; nothing touches the
//! filesystem or spawns a process.

use crate::config::Toolchain;
use kbir_common::{
    strip_shell_quotes, BuildError, CommandKind, Origin, RawCommand, TranslatedCommand,
};

/// Suffix of native compilation units
const SOURCE_SUFFIX: &str = ".c";
/// Suffix of native object files
const OBJECT_SUFFIX: &str = ".o";
/// Suffix of the final loadable module
const MODULE_SUFFIX: &str = ".ko";
/// Suffix given to emitted IR files
const IR_SUFFIX: &str = ".bc";

/// Fixed invocation prefix: textual IR at a stable low optimization
/// level, with clang's own default simplification disabled so all
/// normalization is left to the fixed opt pipeline.
fn clang_prefix(clang: &str, debug: bool) -> Vec<String> {
    let mut tokens: Vec<String> = [clang, "-S", "-emit-llvm", "-O1", "-Xclang", "-disable-llvm-passes"]
        .iter()
        .map(|t| t.to_string())
        .collect();
    if debug {
        tokens.push("-g".to_string());
    }
    tokens
}

/// Whether a native compile token has no place in the IR invocation.
///
/// Warning, feature, machine and optimization flags are native-compiler
/// specific and would fight the forced `-O1`; debug, output and object
/// tokens are recomputed; the asm-goto define enables code paths the IR
/// compiler cannot take.
fn dropped_from_compile(token: &str) -> bool {
    token.starts_with("-W")
        || token.starts_with("-f")
        || token.starts_with("-m")
        || token.starts_with("-O")
        || token == "-DCC_HAVE_ASM_GOTO"
        || token == "-g"
        || token == "-o"
        || token.ends_with(OBJECT_SUFFIX)
}

/// Translate a native compile command into an IR-emitting one.
///
/// The output name is the source token with its suffix replaced, and
/// the `-o <output>` pair is appended as the final two tokens. A
/// command with no source token fails output validation.
pub fn compile_to_ir(
    command: &RawCommand,
    clang: &str,
    debug: bool,
) -> Result<TranslatedCommand, BuildError> {
    let mut tokens = clang_prefix(clang, debug);
    let mut output = None;

    for token in command.tokens().iter().skip(1) {
        if dropped_from_compile(token) {
            continue;
        }
        let token = strip_shell_quotes(token);
        if let Some(stem) = token.strip_suffix(SOURCE_SUFFIX) {
            output = Some(format!("{stem}{IR_SUFFIX}"));
        }
        tokens.push(token);
    }

    if let Some(output) = output {
        tokens.push("-o".to_string());
        tokens.push(output);
    }
    TranslatedCommand::new(Origin::Compile, tokens)
}

/// Translate a native link command into an llvm-link command.
///
/// Only object inputs and the output designation survive; link
/// commands carry no other semantically relevant flags. The output
/// path keeps its position and gets the IR suffix, which also covers
/// the final loadable-module link whose IR artifact is the linked
/// `.bc`.
pub fn link_to_ir(command: &RawCommand, llvm_link: &str) -> Result<TranslatedCommand, BuildError> {
    link_to_ir_filtered(command, llvm_link, None)
}

fn link_to_ir_filtered(
    command: &RawCommand,
    llvm_link: &str,
    exclude: Option<&str>,
) -> Result<TranslatedCommand, BuildError> {
    let mut tokens = vec![llvm_link.to_string(), "-S".to_string()];
    let mut inputs = command.tokens().iter().skip(1);

    while let Some(token) = inputs.next() {
        let token = strip_shell_quotes(token);
        if token == "-o" {
            let path = inputs.next().ok_or_else(|| {
                BuildError::malformed("output designation without a path".to_string())
            })?;
            tokens.push("-o".to_string());
            tokens.push(ir_name(&strip_shell_quotes(path)));
        } else if let Some(stem) = token.strip_suffix(OBJECT_SUFFIX) {
            if exclude.map_or(false, |needle| token.contains(needle)) {
                continue;
            }
            tokens.push(format!("{stem}{IR_SUFFIX}"));
        }
        // Anything else is dropped.
    }
    TranslatedCommand::new(Origin::Link, tokens)
}

/// IR counterpart of a native artifact name
fn ir_name(path: &str) -> String {
    for suffix in [OBJECT_SUFFIX, MODULE_SUFFIX] {
        if let Some(stem) = path.strip_suffix(suffix) {
            return format!("{stem}{IR_SUFFIX}");
        }
    }
    path.to_string()
}

/// Translate a captured module build trace into an ordered IR build
/// plan.
///
/// Two parts of the trace have no IR counterpart and are filtered out:
/// compiles of the `<base>.mod` bookkeeping object, and that object's
/// appearance as an input of the final link (modpost metadata, not
/// code). Plan order follows trace order, since link steps consume
/// earlier compile outputs.
pub fn trace_to_plan(
    lines: &[String],
    object_base: &str,
    toolchain: &Toolchain,
    debug: bool,
) -> Result<Vec<TranslatedCommand>, BuildError> {
    let mod_object = format!("{object_base}.mod");
    let mut plan = Vec::new();

    for line in lines {
        // The command is the first statement of a line; anything after
        // a `;` is build-system bookkeeping.
        let Some(command) = RawCommand::statements(line).into_iter().next() else {
            continue;
        };
        match command.kind(&toolchain.compiler, &toolchain.linker) {
            CommandKind::Compile => {
                if command.mentions(&mod_object) {
                    continue;
                }
                plan.push(compile_to_ir(&command, &toolchain.clang, debug)?);
            }
            CommandKind::Link => {
                plan.push(link_to_ir_filtered(
                    &command,
                    &toolchain.llvm_link,
                    Some(&mod_object),
                )?);
            }
            CommandKind::Unknown => {}
        }
    }
    Ok(plan)
}
