use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Track id used when the page does not say what is playing.
pub const UNKNOWN_TRACK: &str = "unknown";

/// Persisted playback state. Replaced wholesale on every capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Opaque track token; compared, never parsed
    pub id: String,
    /// Position in seconds, never negative
    pub time: f64,
    pub paused: bool,
    pub saved_at: DateTime<Utc>,
}

/// `{id, time, paused}` as read from or written back to the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSample {
    pub id: String,
    pub time: f64,
    pub paused: bool,
}

impl PlaybackSample {
    /// Read a sample out of a JSON object, defaulting each missing or
    /// mistyped field (`id` to "unknown", `time` to 0, `paused` to true).
    /// Anything other than an object is rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let id = match obj.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => UNKNOWN_TRACK.to_string(),
        };
        let time = obj
            .get("time")
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite())
            .map(|t| t.max(0.0))
            .unwrap_or(0.0);
        let paused = obj.get("paused").and_then(Value::as_bool).unwrap_or(true);

        Some(Self { id, time, paused })
    }

    /// Parse a sample from JSON text; `None` if it is not a JSON object.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        Self::from_value(&value)
    }

    pub fn stamp(self, saved_at: DateTime<Utc>) -> PlaybackState {
        PlaybackState {
            id: self.id,
            time: self.time,
            paused: self.paused,
            saved_at,
        }
    }
}
