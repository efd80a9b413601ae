//! Shared fixtures: a small catalogue of tours.

use fireshim::{Client, InMemoryStore};
use serde_json::json;

/// Route builder logs to the test writer. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn tours_client() -> Client<InMemoryStore> {
    init_tracing();
    let client = Client::in_memory();
    client
        .seed(&json!({
            "tours": {
                "ella-rock": {
                    "title": "Ella Rock Hike",
                    "region": "hill",
                    "price": 80,
                    "active": true,
                    "tags": ["hike", "views"],
                    "guide": { "name": "Nimal", "rating": 4.8 }
                },
                "galle-fort": {
                    "title": "Galle Fort Walk",
                    "region": "south",
                    "price": 45,
                    "active": true,
                    "tags": ["history", "walk"]
                },
                "mirissa-whales": {
                    "title": "Mirissa Whale Watching",
                    "region": "south",
                    "price": 120,
                    "active": false,
                    "tags": ["boat", "wildlife"],
                    "guide": { "name": "Kasun", "rating": 4.5 }
                },
                "sigiriya": {
                    "title": "Sigiriya Sunrise",
                    "region": "cultural",
                    "price": 95,
                    "active": true,
                    "tags": ["history", "views"]
                },
                "yala-safari": {
                    "title": "Yala Safari",
                    "region": "south",
                    "price": "on request",
                    "active": true,
                    "tags": ["wildlife"]
                }
            }
        }))
        .expect("seed tours");
    client
}

pub fn ids(rows: &[fireshim::Document]) -> Vec<&str> {
    rows.iter().map(|doc| doc.id.as_str()).collect()
}
