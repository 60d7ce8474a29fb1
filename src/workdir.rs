//! Working-directory resolution for terminals.
//!
//! Every terminal belongs to a work context: a single worktree, or a
//! connection spanning several project directories. The context supplies the
//! directory a new shell starts in.

use std::path::{Path, PathBuf};

/// Stable key for one work context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(String);

impl ContextId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContextId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The owning context of a terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkContext {
    /// A single checked-out worktree.
    Worktree { root: PathBuf },
    /// A multi-project connection; terminals open in the first member.
    Connection { members: Vec<PathBuf> },
}

impl WorkContext {
    pub fn worktree(root: impl Into<PathBuf>) -> Self {
        Self::Worktree { root: root.into() }
    }

    pub fn connection(members: Vec<PathBuf>) -> Self {
        Self::Connection { members }
    }

    /// The directory a new terminal for this context starts in. `None` only
    /// for a connection with no members.
    pub fn resolve_cwd(&self) -> Option<&Path> {
        match self {
            WorkContext::Worktree { root } => Some(root),
            WorkContext::Connection { members } => members.first().map(PathBuf::as_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worktree_resolves_to_its_root() {
        let ctx = WorkContext::worktree("/work/repo-a");
        assert_eq!(ctx.resolve_cwd(), Some(Path::new("/work/repo-a")));
    }

    #[test]
    fn connection_resolves_to_first_member() {
        let ctx = WorkContext::connection(vec![
            PathBuf::from("/work/one"),
            PathBuf::from("/work/two"),
        ]);
        assert_eq!(ctx.resolve_cwd(), Some(Path::new("/work/one")));
    }

    #[test]
    fn empty_connection_resolves_to_nothing() {
        let ctx = WorkContext::connection(Vec::new());
        assert_eq!(ctx.resolve_cwd(), None);
    }
}
