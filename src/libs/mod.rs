pub mod hal;
pub mod hub;
pub mod io;
pub mod jobs;
pub mod phylo;
pub mod pipeline;
pub mod tools;
pub mod tracks;
