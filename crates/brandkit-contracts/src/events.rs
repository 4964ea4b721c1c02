use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::creative::AspectRatio;
use crate::profile::{Brightness, Mood};

/// Pipeline milestones recorded in a session's `events.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudioEvent {
    SessionStarted {
        session_dir: String,
        brand_name: String,
        product_name: String,
        tone: String,
        variations: u32,
        aspect_ratios: Vec<AspectRatio>,
    },
    ProfileExtracted {
        dominant_hex: String,
        mood: Mood,
        brightness: Brightness,
        fallback: bool,
    },
    GenerationAttemptFailed {
        creative_id: u32,
        backend: String,
        attempt: u32,
        error: String,
    },
    CreativeSaved {
        creative_id: u32,
        variation: u32,
        aspect_ratio: AspectRatio,
        backend: String,
        placeholder: bool,
        path: String,
    },
    GenerationStageFailed {
        error: String,
        saved: usize,
    },
    CaptionsReady {
        count: usize,
        source: String,
    },
    ArchiveWritten {
        archive_path: String,
        files: usize,
    },
    SessionFinished {
        creative_count: usize,
        caption_count: usize,
    },
}

/// Append-only writer for session event logs.
///
/// - every line carries `type`, `session_id` and `ts`
/// - one compact JSON object per line
#[derive(Debug, Clone)]
pub struct EventWriter {
    inner: Arc<EventWriterInner>,
}

#[derive(Debug)]
struct EventWriterInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventWriterInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit(&self, event: &StudioEvent) -> anyhow::Result<Value> {
        let body = match serde_json::to_value(event)? {
            Value::Object(body) => body,
            other => anyhow::bail!("event did not serialize to an object: {other}"),
        };
        let mut line_obj = Map::new();
        if let Some(kind) = body.get("type") {
            line_obj.insert("type".to_string(), kind.clone());
        }
        line_obj.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        line_obj.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in body {
            line_obj.entry(key).or_insert(value);
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&line_obj)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(line_obj))
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::DateTime;
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn emit_writes_compact_jsonl_line() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        let emitted = writer.emit(&StudioEvent::CaptionsReady {
            count: 2,
            source: "fallback".to_string(),
        })?;

        let content = fs::read_to_string(&path)?;
        let line = content.lines().next().unwrap_or("");
        let parsed: Value = serde_json::from_str(line)?;

        assert_eq!(parsed, emitted);
        assert_eq!(parsed["type"], json!("captions_ready"));
        assert_eq!(parsed["session_id"], json!("session-123"));
        assert_eq!(parsed["count"], json!(2));
        assert_eq!(parsed["source"], json!("fallback"));

        let ts = parsed["ts"].as_str().unwrap_or("");
        DateTime::parse_from_rfc3339(ts)?;
        Ok(())
    }

    #[test]
    fn enum_fields_use_wire_names() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let writer = EventWriter::new(temp.path().join("events.jsonl"), "s");
        let emitted = writer.emit(&StudioEvent::CreativeSaved {
            creative_id: 3,
            variation: 2,
            aspect_ratio: AspectRatio::Portrait,
            backend: "pollinations".to_string(),
            placeholder: false,
            path: "9x16/creative_3_9x16.png".to_string(),
        })?;
        assert_eq!(emitted["type"], json!("creative_saved"));
        assert_eq!(emitted["aspect_ratio"], json!("9:16"));
        Ok(())
    }

    #[test]
    fn emit_appends_lines_in_order() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("events.jsonl");
        let writer = EventWriter::new(&path, "session-123");

        writer.emit(&StudioEvent::GenerationStageFailed {
            error: "disk full".to_string(),
            saved: 1,
        })?;
        writer.emit(&StudioEvent::SessionFinished {
            creative_count: 1,
            caption_count: 2,
        })?;

        let content = fs::read_to_string(&path)?;
        let types: Vec<String> = content
            .lines()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
            .collect();
        assert_eq!(types, vec!["generation_stage_failed", "session_finished"]);
        Ok(())
    }
}
