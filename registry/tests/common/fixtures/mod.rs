//! Shared services and names for registry integration tests

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod test_data;
pub mod test_services;

pub use test_data::*;
pub use test_services::*;
