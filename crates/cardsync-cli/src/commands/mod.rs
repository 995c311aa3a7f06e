pub mod common;
pub mod completions;
pub mod config;
pub mod decks;
pub mod scan;
pub mod status;
pub mod sync;
