use fireshim::{Client, Document, InMemoryStore, ShimConfig};
use serde_json::json;

pub fn client() -> Client<InMemoryStore> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Client::in_memory()
}

pub fn client_with(config: ShimConfig) -> Client<InMemoryStore> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = InMemoryStore::from_config(&config);
    Client::with_config(store, config).expect("valid config")
}

/// Three bookings: two confirmed, one pending.
pub fn seed_bookings(client: &Client<InMemoryStore>) {
    client
        .seed(&json!({
            "bookings": {
                "b-1": { "guest": "Asha", "status": "confirmed", "guests": 2 },
                "b-2": { "guest": "Ben", "status": "pending", "guests": 4 },
                "b-3": { "guest": "Chen", "status": "confirmed", "guests": 1 }
            }
        }))
        .expect("seed bookings");
}

pub fn fetch(client: &Client<InMemoryStore>, id: &str) -> Document {
    client
        .get("bookings", id)
        .expect("read booking")
        .expect("booking exists")
}
