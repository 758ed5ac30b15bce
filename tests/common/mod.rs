#![allow(dead_code)]

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};
use shilp_rs::ClientConfig;

/// Load ClientConfig from environment when `SHILP_INTEGRATION=1` is set.
/// Returns None and prints a SKIP message otherwise.
pub fn load_config_for_integration() -> Option<ClientConfig> {
    if std::env::var("SHILP_INTEGRATION").ok().as_deref() != Some("1") {
        eprintln!("SKIP: set SHILP_INTEGRATION=1 and SHILP_BASE_URL to run integration tests");
        return None;
    }
    ClientConfig::from_env().ok()
}

/// Millisecond timestamp string used to make collection names unique.
pub fn ts_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    ts.to_string()
}

/// Route SDK logs to the test output; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn ok_body(message: &str) -> Value {
    json!({"success": true, "message": message})
}

/// Minimal collection listing entry as the server reports it.
pub fn collection_entry(name: &str, loaded: bool) -> Value {
    json!({
        "name": name,
        "is_loaded": loaded,
        "fields": ["title", "body"],
        "searchable_fields": ["title"],
        "metadata": null
    })
}
