//! Core types shared across the seqsmith workspace.

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{SeqsmithError, SeqsmithResult};
