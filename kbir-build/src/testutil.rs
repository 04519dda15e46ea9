//! Canned-process support for tests
//!
//! A [`FakeRunner`] answers tool invocations from a closure and records
//! every call, so orchestration logic can be exercised against scripted
//! traces without a real toolchain.

use crate::exec::{ToolOutput, ToolRunner};
use kbir_common::BuildError;
use std::cell::RefCell;
use std::path::Path;

pub struct FakeRunner<F>
where
    F: Fn(&str, &[String]) -> ToolOutput,
{
    respond: F,
    calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl<F> FakeRunner<F>
where
    F: Fn(&str, &[String]) -> ToolOutput,
{
    pub fn new(respond: F) -> Self {
        Self {
            respond,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Every `(program, args)` pair seen so far, in invocation order
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.borrow().clone()
    }
}

impl<F> ToolRunner for FakeRunner<F>
where
    F: Fn(&str, &[String]) -> ToolOutput,
{
    fn run(&self, program: &str, args: &[String], _cwd: &Path) -> Result<ToolOutput, BuildError> {
        self.calls
            .borrow_mut()
            .push((program.to_string(), args.to_vec()));
        Ok((self.respond)(program, args))
    }
}

pub fn canned(status: i32, stdout: &str) -> ToolOutput {
    ToolOutput {
        status,
        stdout: stdout.to_string(),
    }
}
