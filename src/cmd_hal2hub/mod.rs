//! Subcommand modules for the `hal2hub` binary.

pub mod build;
pub mod genomes;
pub mod tree;
