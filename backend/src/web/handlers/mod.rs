//! HTTP request handlers for the backend API.
//!
//! - `admin` - registry maintenance (re-register, reinitialize)
//! - `common` - response envelope and shared payloads
//! - `health` - service health and availability endpoints

pub mod admin;
pub mod common;
pub mod health;

pub use admin::*;
pub use health::*;
