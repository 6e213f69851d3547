//! Error types for the service registry
//!
//! Every failure a caller of `resolve` can observe is one of these variants.
//! The enum is `Clone` because a single in-flight resolution may be awaited
//! by several callers at once and each of them receives its own copy.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No descriptor and no instance under this name. This is a caller bug,
    /// never absorbed by a fallback.
    #[error("Service not registered: {service}")]
    NotRegistered { service: String },

    /// The dependency graph reachable from `service` loops back on itself
    #[error("Dependency cycle detected while resolving {service}: {}", path.join(" -> "))]
    DependencyCycle { service: String, path: Vec<String> },

    #[error("Dependency resolution timeout: {dependency} (required by {service}, waited {timeout_ms}ms)")]
    DependencyTimeout {
        service: String,
        dependency: String,
        timeout_ms: u64,
    },

    #[error("Failed to resolve dependency {dependency} for service {service}: {reason}")]
    DependencyFailed {
        service: String,
        dependency: String,
        reason: String,
    },

    #[error("Failed to instantiate {service}: {reason}")]
    Instantiation { service: String, reason: String },

    /// The service could not be built and no usable fallback exists.
    /// Replaces the "resolved to nothing" signal with an explicit reason.
    #[error("Service {service} is unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("Service {service} is not of type {expected}")]
    TypeMismatch {
        service: String,
        expected: &'static str,
    },
}

impl RegistryError {
    /// True for errors caused by how the registry was set up rather than
    /// by a service misbehaving at runtime.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            RegistryError::NotRegistered { .. } | RegistryError::DependencyCycle { .. }
        )
    }

    /// Name of the service the error is about
    pub fn service(&self) -> &str {
        match self {
            RegistryError::NotRegistered { service }
            | RegistryError::DependencyCycle { service, .. }
            | RegistryError::DependencyTimeout { service, .. }
            | RegistryError::DependencyFailed { service, .. }
            | RegistryError::Instantiation { service, .. }
            | RegistryError::Unavailable { service, .. }
            | RegistryError::TypeMismatch { service, .. } => service,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_registered_message_names_service() {
        let err = RegistryError::NotRegistered {
            service: "ProductRepository".to_string(),
        };
        assert_eq!(err.to_string(), "Service not registered: ProductRepository");
        assert!(err.is_configuration_error());
        assert_eq!(err.service(), "ProductRepository");
    }

    #[test]
    fn test_cycle_message_renders_path() {
        let err = RegistryError::DependencyCycle {
            service: "A".to_string(),
            path: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        };
        assert!(err.to_string().contains("A -> B -> A"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_runtime_errors_are_not_configuration_errors() {
        let err = RegistryError::Unavailable {
            service: "OrderRepository".to_string(),
            reason: "database down".to_string(),
        };
        assert!(!err.is_configuration_error());
    }
}
