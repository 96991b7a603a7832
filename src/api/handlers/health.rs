use crate::error::Result;
use serde_json::{json, Value};
use std::time::Instant;

pub fn check(started_at: Instant) -> Result<Value> {
    Ok(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": started_at.elapsed().as_secs(),
    }))
}
