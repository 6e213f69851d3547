//! Application logger service handed to components through the registry

use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Structured logger forwarding to `tracing`, with optional JSON metadata
#[derive(Debug, Clone)]
pub struct AppLogger {
    component: String,
}

impl AppLogger {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn info(&self, message: &str, metadata: Option<&Value>) {
        info!(component = %self.component, metadata = %render(metadata), "{}", message);
    }

    pub fn warn(&self, message: &str, metadata: Option<&Value>) {
        warn!(component = %self.component, metadata = %render(metadata), "{}", message);
    }

    pub fn error(&self, message: &str, metadata: Option<&Value>) {
        error!(component = %self.component, metadata = %render(metadata), "{}", message);
    }

    pub fn debug(&self, message: &str, metadata: Option<&Value>) {
        debug!(component = %self.component, metadata = %render(metadata), "{}", message);
    }
}

impl Default for AppLogger {
    fn default() -> Self {
        Self::new("floresya")
    }
}

fn render(metadata: Option<&Value>) -> String {
    metadata.map(Value::to_string).unwrap_or_default()
}
