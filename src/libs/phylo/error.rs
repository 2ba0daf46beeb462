//! Failures of newick parsing and of genome lookups in a tree.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Newick text that does not parse. Positions are 1-based.
    Syntax {
        line: usize,
        column: usize,
        reason: String,
        near: String,
    },
    /// Input ended before the closing `;`
    Truncated,
    /// A hub genome with no node in the tree
    UnknownGenome(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::Syntax {
                line,
                column,
                reason,
                near,
            } => write!(
                f,
                "Newick parse error at {}:{} near \"{}\"\n{}",
                line,
                column,
                near,
                reason.trim_end()
            ),
            TreeError::Truncated => write!(f, "Newick parse error: input ends before `;`"),
            TreeError::UnknownGenome(genome) => write!(f, "genome {} is not in the tree", genome),
        }
    }
}

impl std::error::Error for TreeError {}
