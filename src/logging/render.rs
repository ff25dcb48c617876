//! Terminal serialization of enriched records.
//!
//! Structured mode emits one self-contained JSON object per line. Human
//! mode emits one colorized line with the same field set, coloring only the
//! level token.

use serde_json::Value;

use super::record::EventRecord;

/// Output format, selected once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Machine-parseable, one JSON object per line.
    Structured,
    /// Colorized single-line console output.
    Human,
}

const ANSI_CYAN: &str = "\u{1b}[36m";
const ANSI_GREEN: &str = "\u{1b}[32m";
const ANSI_YELLOW: &str = "\u{1b}[33m";
const ANSI_RED: &str = "\u{1b}[31m";
const ANSI_BRIGHT_RED: &str = "\u{1b}[1;31m";
const ANSI_RESET: &str = "\u{1b}[0m";

/// Color for a level token. Unmapped levels render uncolored.
fn level_color(level: &str) -> Option<&'static str> {
    match level {
        "debug" => Some(ANSI_CYAN),
        "info" => Some(ANSI_GREEN),
        "warning" => Some(ANSI_YELLOW),
        "error" => Some(ANSI_RED),
        "critical" => Some(ANSI_BRIGHT_RED),
        _ => None,
    }
}

/// Serializes a fully enriched record to one output line.
pub struct Renderer {
    mode: RenderMode,
    color: bool,
}

impl Renderer {
    pub fn new(mode: RenderMode, color: bool) -> Self {
        Renderer { mode, color }
    }

    pub fn render_line(&self, record: &EventRecord) -> String {
        match self.mode {
            RenderMode::Structured => self.render_structured(record),
            RenderMode::Human => self.render_human(record),
        }
    }

    fn render_structured(&self, record: &EventRecord) -> String {
        match serde_json::to_string(&record.fields) {
            Ok(line) => line,
            Err(e) => format!(
                "{{\"event\":\"record serialization failure\",\"error\":{}}}",
                Value::String(e.to_string())
            ),
        }
    }

    fn render_human(&self, record: &EventRecord) -> String {
        let fields = &record.fields;
        let timestamp = fields
            .get("timestamp")
            .and_then(Value::as_str)
            .unwrap_or("-");
        let level = fields
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or_else(|| record.level.as_str());
        let logger = fields.get("logger").and_then(Value::as_str).unwrap_or("-");

        let token = match level_color(level) {
            Some(color) if self.color => format!("{}{}{}", color, level, ANSI_RESET),
            _ => level.to_string(),
        };

        let mut line = format!("{} [{}] {}: {}", timestamp, token, logger, record.event());
        for (key, value) in fields {
            if matches!(key.as_str(), "timestamp" | "level" | "logger" | "event") {
                continue;
            }
            line.push(' ');
            line.push_str(key);
            line.push('=');
            line.push_str(&human_value(value));
        }

        // The structured chain folds exceptions into a field; here we
        // pretty-print the raw exception below the line instead.
        if let Some(exc) = &record.exception {
            line.push('\n');
            line.push_str(&format!("{}: {}\n{}", exc.kind, exc.message, exc.trace));
        }
        line
    }
}

fn human_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::logging::record::{CallSite, EventRecord, ExceptionInfo, Level};

    fn enriched(level: &str) -> EventRecord {
        let mut record = EventRecord::new("app", Level::Info, "hello", CallSite::default());
        record.insert("timestamp", json!("2026-01-01T00:00:00.000000Z"));
        record.insert("level", json!(level));
        record.insert("logger", json!("app"));
        record.insert("value", json!(1));
        record
    }

    #[test]
    fn structured_line_is_parseable_json() {
        let renderer = Renderer::new(RenderMode::Structured, false);
        let line = renderer.render_line(&enriched("info"));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], json!("hello"));
        assert_eq!(parsed["value"], json!(1));
    }

    #[test]
    fn human_line_colors_only_the_level_token() {
        let renderer = Renderer::new(RenderMode::Human, true);
        let line = renderer.render_line(&enriched("info"));
        assert!(line.contains("[\u{1b}[32minfo\u{1b}[0m]"));
        assert!(line.contains("value=1"));
        assert!(!line.contains("\u{1b}[32mvalue"));
    }

    #[test]
    fn human_line_has_no_ansi_when_color_disabled() {
        let renderer = Renderer::new(RenderMode::Human, false);
        let line = renderer.render_line(&enriched("error"));
        assert!(!line.contains('\u{1b}'));
        assert!(line.contains("[error]"));
    }

    #[test]
    fn unmapped_level_falls_back_to_plain_token() {
        let renderer = Renderer::new(RenderMode::Human, true);
        let line = renderer.render_line(&enriched("notset"));
        assert!(line.contains("[notset]"));
        assert!(!line.contains('\u{1b}'));
    }

    #[test]
    fn human_renderer_pretty_prints_exceptions() {
        let renderer = Renderer::new(RenderMode::Human, false);
        let record = enriched("critical").with_exception(ExceptionInfo {
            kind: "&str".to_string(),
            message: "boom".to_string(),
            trace: "0: main".to_string(),
        });
        let line = renderer.render_line(&record);
        assert!(line.contains("&str: boom\n0: main"));
    }
}
