//! This module provides reusable test utilities:
//! - In-memory databases with seed data
//! - Bootstrapped registries and web state
//! - Test configuration

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod test_config;
pub mod test_data;
pub mod test_database;

pub use test_config::*;
pub use test_data::*;
pub use test_database::*;
