//! Common test data and constants

use serde_json::{json, Value};

/// Products used across repository tests
pub mod products {
    pub const ROSES_SKU: &str = "ROSA-12";
    pub const TULIPS_SKU: &str = "TULIP-6";
    pub const ORCHID_SKU: &str = "ORQ-1";
}

pub fn roses() -> Value {
    json!({
        "name": "Ramo de 12 rosas rojas",
        "sku": products::ROSES_SKU,
        "price_usd": 45.0,
        "stock": 10,
        "featured": true
    })
}

pub fn tulips() -> Value {
    json!({
        "name": "Tulipanes amarillos",
        "sku": products::TULIPS_SKU,
        "price_usd": 30.0,
        "stock": 4,
        "featured": false
    })
}

pub fn orchid() -> Value {
    json!({
        "name": "Orquidea blanca",
        "sku": products::ORCHID_SKU,
        "price_usd": 60.0,
        "stock": 1,
        "featured": true
    })
}
