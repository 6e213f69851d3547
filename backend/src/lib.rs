//! FloresYa backend: configuration, database, repositories and the HTTP
//! surface wired together through a `service_registry::ServiceRegistry`.

pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod database;
pub mod logger;
pub mod repositories;
pub mod web;
