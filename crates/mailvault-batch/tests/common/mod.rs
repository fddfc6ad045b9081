//! Common test utilities for mailvault-batch
//!
//! This module provides shared test infrastructure including:
//! - A scripted backup tool standing in for the external program
//! - A scripted operator prompter
//! - Run fixtures rooted in a temporary directory

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
