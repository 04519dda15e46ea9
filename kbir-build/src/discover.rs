//! Parameterized-module discovery
//!
//! Finds the compilation units in a modules tree that declare tunable
//! parameters and resolves each unit to the module that owns it. Also
//! provides the plain-text function-list hand-off consumed by the
//! downstream analysis engine.

use kbir_common::{strip_shell_quotes, BuildError, RawCommand};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Marker a compilation unit uses to declare a tunable parameter
const PARAM_MARKER: &str = "module_param";

/// File name of the function-list hand-off in a snapshot directory
pub const FUNCTION_LIST_FILE: &str = "function_list";

/// A source file known to declare a module parameter, with the module
/// that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedSource {
    pub path: PathBuf,
    pub module: String,
}

/// Recursively collect `.c` files under `root` that contain the
/// parameter-declaration marker.
///
/// Unreadable files are logged and skipped; discovery is best-effort
/// and never aborted by a single unit.
pub fn sources_with_params(root: &Path) -> Result<BTreeSet<PathBuf>, BuildError> {
    let mut found = BTreeSet::new();
    collect_sources(root, &mut found)?;
    Ok(found)
}

fn collect_sources(dir: &Path, found: &mut BTreeSet<PathBuf>) -> Result<(), BuildError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_sources(&path, found)?;
        } else if path.extension().map_or(false, |ext| ext == "c") {
            match fs::read_to_string(&path) {
                Ok(contents) if contents.contains(PARAM_MARKER) => {
                    found.insert(path);
                }
                Ok(_) => {}
                Err(err) => log::warn!("skipping unreadable {}: {}", path.display(), err),
            }
        }
    }
    Ok(())
}

// The module name reaches the compiler through KBUILD_MODNAME, in one of
// two forms depending on the build-system generation:
//   -D"KBUILD_MODNAME=KBUILD_STR(name)"
//   -DKBUILD_MODNAME='"name"'
static MODNAME_WRAPPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-DKBUILD_MODNAME=KBUILD_STR\((.*)\)$").unwrap());
static MODNAME_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^-DKBUILD_MODNAME="(.*)"$"#).unwrap());

/// Extract the module name from a native compile command.
///
/// Shell quoting is stripped from candidate tokens before matching.
/// Fails with a name-resolution error when neither form matches.
pub fn module_name_of(command: &RawCommand, object: &str) -> Result<String, BuildError> {
    for token in command.tokens() {
        if !token.contains("KBUILD_MODNAME") {
            continue;
        }
        let token = strip_shell_quotes(token);
        for regex in [&*MODNAME_WRAPPED, &*MODNAME_QUOTED] {
            if let Some(captures) = regex.captures(&token) {
                return Ok(captures[1].to_string());
            }
        }
    }
    Err(BuildError::NameResolution {
        object: object.to_string(),
    })
}

static IR_DEFINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^define\b.*@([\w.$-]+)\s*\(").unwrap());

/// Collect the names of functions defined in the given textual IR files
pub fn defined_functions(ir_files: &[PathBuf]) -> Result<BTreeSet<String>, BuildError> {
    let mut names = BTreeSet::new();
    for file in ir_files {
        let contents = fs::read_to_string(file)?;
        for line in contents.lines() {
            if let Some(captures) = IR_DEFINE.captures(line) {
                names.insert(captures[1].to_string());
            }
        }
    }
    Ok(names)
}

/// Write the function list, one name per line, into the snapshot
/// directory; returns the path written
pub fn write_function_list(
    snapshot_dir: &Path,
    names: &BTreeSet<String>,
) -> Result<PathBuf, BuildError> {
    let path = snapshot_dir.join(FUNCTION_LIST_FILE);
    let mut contents = String::new();
    for name in names {
        contents.push_str(name);
        contents.push('\n');
    }
    fs::write(&path, contents)?;
    Ok(path)
}
