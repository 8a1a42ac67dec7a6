//! Shared utilities.
//!
//! Common utilities used across the crate including hashing, command-line
//! argument handling and test helpers.

pub mod args;
pub mod hash;

#[cfg(test)]
pub mod testutil;
