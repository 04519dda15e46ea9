//! Toolchain availability probing

use crate::config::Toolchain;

/// A configured tool and whether it resolves on PATH
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub name: String,
    pub found: bool,
}

/// Check every configured tool for availability
pub fn check_toolchain(toolchain: &Toolchain) -> Vec<ToolStatus> {
    [
        &toolchain.make,
        &toolchain.compiler,
        &toolchain.linker,
        &toolchain.clang,
        &toolchain.llvm_link,
        &toolchain.opt,
    ]
    .into_iter()
    .map(|name| ToolStatus {
        name: name.clone(),
        found: which::which(name).is_ok(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_every_configured_tool() {
        let mut toolchain = Toolchain::default();
        toolchain.clang = "definitely-not-a-real-clang".to_string();

        let statuses = check_toolchain(&toolchain);
        assert_eq!(statuses.len(), 6);
        let clang = statuses
            .iter()
            .find(|s| s.name == "definitely-not-a-real-clang")
            .unwrap();
        assert!(!clang.found);
    }
}
