//! Shared types, error definitions, and utilities used across all voxrelay crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, ErrorKind, FromMessage, Result},
    types::{Jid, MessageKind},
};
