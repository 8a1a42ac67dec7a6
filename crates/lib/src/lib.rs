//! setup-sdl-lib: Core types and logic for setup-sdl
//!
//! This crate provides everything needed to fetch, build and cache SDL and its
//! satellite libraries inside a CI pipeline:
//! - `version`: version values and version-request parsing
//! - `release`: the release catalog and release matching
//! - `project`: static project descriptions and the build-order resolver
//! - `state`: the state fingerprint used as build cache key
//! - `pm`: system package manager dispatch
//! - `ninja`, `msvc`: build tools made available before building
//! - `setup`: the driver tying resolution, caching and building together

pub mod cache;
pub mod cmake;
pub mod consts;
pub mod execute;
pub mod msvc;
pub mod ninja;
pub mod platform;
pub mod pm;
pub mod project;
pub mod release;
pub mod repo;
pub mod setup;
pub mod state;
pub mod util;
pub mod version;
