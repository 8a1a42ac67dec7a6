//! Build platform detection and well-known directories.

pub mod os;
pub mod paths;

pub use os::BuildPlatform;
