//! Build-command data model
//!
//! Commands captured from the native build system are kept as ordered
//! token lists, not free-form strings, so the translation rules stay
//! exhaustive and testable without spawning any process.

use crate::error::BuildError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Classification of a captured build command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    Compile,
    Link,
    Unknown,
}

/// Which kind of build step produced an IR artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Compile,
    Link,
}

/// One command exactly as the native build system emitted it.
///
/// Immutable once captured; consumed by translation, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommand {
    tokens: Vec<String>,
}

impl RawCommand {
    /// Tokenize a single statement (no `;` separators) into a command
    pub fn from_statement(statement: &str) -> Self {
        Self {
            tokens: statement
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Split one trace line into its `;`-separated statements, dropping
    /// empty ones
    pub fn statements(line: &str) -> Vec<RawCommand> {
        line.split(';')
            .map(RawCommand::from_statement)
            .filter(|c| !c.is_empty())
            .collect()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The tool being invoked, if any
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Whether the leading token invokes the given tool, by name or path
    pub fn invokes(&self, tool: &str) -> bool {
        self.program()
            .map(|p| Path::new(p).file_name().map_or(false, |f| f == tool))
            .unwrap_or(false)
    }

    /// Whether any token contains the given substring
    pub fn mentions(&self, needle: &str) -> bool {
        self.tokens.iter().any(|t| t.contains(needle))
    }

    /// Classify the command by its leading token
    pub fn kind(&self, compiler: &str, linker: &str) -> CommandKind {
        if self.invokes(compiler) {
            CommandKind::Compile
        } else if self.invokes(linker) {
            CommandKind::Link
        } else {
            CommandKind::Unknown
        }
    }
}

/// An IR-producing command derived from a native one.
///
/// Carries its origin and its declared output path. The constructor
/// rejects token lists without exactly one `-o <path>` designation, so a
/// command that reaches execution always knows what it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedCommand {
    origin: Origin,
    tokens: Vec<String>,
    output: String,
}

impl TranslatedCommand {
    pub fn new(origin: Origin, tokens: Vec<String>) -> Result<Self, BuildError> {
        let output = declared_output(&tokens)?;
        Ok(Self {
            origin,
            tokens,
            output,
        })
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// The tool to invoke
    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    /// Arguments following the tool
    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    /// Path this command declares it will produce
    pub fn output(&self) -> &str {
        &self.output
    }
}

/// Extract the single `-o` output designation from a token list
fn declared_output(tokens: &[String]) -> Result<String, BuildError> {
    let mut designations = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.as_str() == "-o");
    let (index, _) = designations.next().ok_or_else(|| {
        BuildError::malformed("no output designation".to_string())
    })?;
    if designations.next().is_some() {
        return Err(BuildError::malformed(
            "more than one output designation".to_string(),
        ));
    }
    match tokens.get(index + 1) {
        Some(path) => Ok(path.clone()),
        None => Err(BuildError::malformed(
            "output designation without a path".to_string(),
        )),
    }
}

/// Remove shell quoting from a token.
///
/// Trace lines are shell-joinable, but the receiving tools do no shell
/// expansion, so quote characters must go before a token is reused.
/// Stripping an already-unquoted token returns it unchanged.
pub fn strip_shell_quotes(token: &str) -> String {
    if token.contains('\'') {
        token.replace('\'', "")
    } else {
        token.replace('"', "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_statement_tokenizes_on_whitespace() {
        let cmd = RawCommand::from_statement("gcc  -c\t-o foo.o foo.c");
        assert_eq!(cmd.tokens(), &["gcc", "-c", "-o", "foo.o", "foo.c"]);
        assert_eq!(cmd.program(), Some("gcc"));
    }

    #[test]
    fn test_statements_split_on_separator() {
        let stmts = RawCommand::statements("set -e; gcc -c -o a.o a.c ; ");
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].program(), Some("set"));
        assert_eq!(stmts[1].program(), Some("gcc"));
    }

    #[test]
    fn test_invokes_matches_path_basename() {
        let cmd = RawCommand::from_statement("/usr/bin/gcc -c foo.c");
        assert!(cmd.invokes("gcc"));
        assert!(!cmd.invokes("clang"));
        assert!(RawCommand::from_statement("").program().is_none());
    }

    #[test]
    fn test_kind_classification() {
        let compile = RawCommand::from_statement("gcc -c -o a.o a.c");
        let link = RawCommand::from_statement("ld -r -o m.o a.o b.o");
        let other = RawCommand::from_statement("rm -f a.o");
        assert_eq!(compile.kind("gcc", "ld"), CommandKind::Compile);
        assert_eq!(link.kind("gcc", "ld"), CommandKind::Link);
        assert_eq!(other.kind("gcc", "ld"), CommandKind::Unknown);
    }

    #[test]
    fn test_translated_command_accessors() {
        let cmd = TranslatedCommand::new(
            Origin::Compile,
            vec![
                "clang".to_string(),
                "-S".to_string(),
                "a.c".to_string(),
                "-o".to_string(),
                "a.bc".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(cmd.program(), "clang");
        assert_eq!(cmd.args(), &["-S", "a.c", "-o", "a.bc"]);
        assert_eq!(cmd.output(), "a.bc");
        assert_eq!(cmd.origin(), Origin::Compile);
    }

    #[test]
    fn test_translated_command_requires_output() {
        let err = TranslatedCommand::new(
            Origin::Link,
            vec!["llvm-link".to_string(), "-S".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::MalformedCommand { .. }));
    }

    #[test]
    fn test_translated_command_rejects_trailing_output_flag() {
        let err = TranslatedCommand::new(
            Origin::Link,
            vec!["llvm-link".to_string(), "a.bc".to_string(), "-o".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::MalformedCommand { .. }));
    }

    #[test]
    fn test_translated_command_rejects_double_output() {
        let err = TranslatedCommand::new(
            Origin::Compile,
            vec![
                "clang".to_string(),
                "-o".to_string(),
                "a.bc".to_string(),
                "-o".to_string(),
                "b.bc".to_string(),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::MalformedCommand { .. }));
    }

    #[test]
    fn test_strip_shell_quotes() {
        // Single quotes go first; inner double quotes survive one pass.
        assert_eq!(
            strip_shell_quotes("-DKBUILD_MODNAME='\"mod\"'"),
            "-DKBUILD_MODNAME=\"mod\""
        );
        assert_eq!(
            strip_shell_quotes("-D\"KBUILD_STR(x)=#x\""),
            "-DKBUILD_STR(x)=#x"
        );
    }

    #[test]
    fn test_strip_shell_quotes_is_idempotent_on_unquoted_tokens() {
        let plain = strip_shell_quotes("-Iinclude");
        assert_eq!(plain, "-Iinclude");
        assert_eq!(strip_shell_quotes(&plain), plain);

        let stripped = strip_shell_quotes("-D\"KBUILD_BASENAME=KBUILD_STR(mod)\"");
        assert_eq!(strip_shell_quotes(&stripped), stripped);
    }
}
