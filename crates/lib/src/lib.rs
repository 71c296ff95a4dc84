//! releaser-lib: release pipeline for `ssh_add_with_pass`
//!
//! This crate provides the stages of a release:
//! - `matrix`: cross-compile, archive and package every build target
//! - `checksum`: SHA-256 manifest of the produced downloads
//! - `render`: version/hash substitution into distribution manifests
//! - `publish`: clone, update, commit and push each distribution channel
//!
//! `pipeline` strings them together into the `prepare` and `publish` stages.

pub mod channel;
pub mod checksum;
pub mod config;
pub mod consts;
pub mod matrix;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod publish;
pub mod render;
pub mod util;
