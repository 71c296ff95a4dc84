//! Integration tests for releaser-lib.

mod common;
#[cfg(unix)]
mod prepare_tests;
mod publish_tests;
