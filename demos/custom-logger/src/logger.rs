//! JSON event sink.
//!
//! Replaces the default tracing sink: every container event becomes one
//! JSON line on stdout, with a timestamp and a severity derived from
//! whether the event carries an error.

use armature::{Event, EventSink};
use serde_json::{Value, json};

pub struct JsonSink;

impl JsonSink {
    pub fn new() -> Self {
        Self
    }

    fn line(event: &Event) -> Value {
        let level = if event.error_text().is_some() {
            "ERROR"
        } else {
            "INFO"
        };
        json!({
            "time": chrono::Utc::now().to_rfc3339(),
            "level": level,
            "kind": event.kind(),
            "event": event,
        })
    }
}

impl Default for JsonSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for JsonSink {
    fn handle(&self, event: &Event) {
        println!("{}", Self::line(event));
    }
}
