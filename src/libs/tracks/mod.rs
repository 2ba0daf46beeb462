//! Track builders, one module per kind of track.

pub mod alignability;
pub mod annotation;
pub mod basic;
pub mod clade;
pub mod conservation;
pub mod gc;
pub mod lod;
