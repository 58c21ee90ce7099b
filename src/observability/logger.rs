//! Structured JSON logger
//!
//! - One log line = one event
//! - `event`, `severity`, `ts` first, then fields in alphabetical key order
//! - Synchronous, no buffering
//! - Sinks: console, append-only file, in-memory buffer

use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::events::MonitorEvent;
use super::{ObservabilityError, ObservabilityResult};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable, process exits
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared in-memory log destination.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    /// Everything logged so far.
    pub fn contents(&self) -> String {
        match self.bytes.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }

    /// Logged lines parsed as JSON objects.
    pub fn lines(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Event names in the order they were logged.
    pub fn events(&self) -> Vec<String> {
        self.lines()
            .iter()
            .filter_map(|line| line["event"].as_str().map(str::to_string))
            .collect()
    }
}

enum Sink {
    /// stdout, with ERROR and FATAL on stderr
    Console,
    File(Mutex<File>),
    Memory(LogBuffer),
}

type Fields = Vec<(String, String)>;

/// A structured logger that outputs JSON lines.
///
/// Cloning is cheap; clones share the sink and the open scopes. Context
/// fields are attached to every line written through that clone.
#[derive(Clone)]
pub struct Logger {
    sink: Arc<Sink>,
    scopes: Arc<Mutex<Fields>>,
    context: Fields,
}

/// Field attached to every line of every clone of a logger until dropped.
#[must_use = "the scope closes when dropped"]
pub struct LogScope {
    scopes: Arc<Mutex<Fields>>,
    key: String,
}

impl Drop for LogScope {
    fn drop(&mut self) {
        if let Ok(mut scopes) = self.scopes.lock() {
            if let Some(pos) = scopes.iter().rposition(|(k, _)| *k == self.key) {
                scopes.remove(pos);
            }
        }
    }
}

impl Logger {
    /// Log to stdout/stderr.
    pub fn console() -> Self {
        Self {
            sink: Arc::new(Sink::Console),
            scopes: Arc::default(),
            context: Vec::new(),
        }
    }

    /// Append to `path`, creating it and its parent directory if needed.
    pub fn file(path: &Path) -> ObservabilityResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ObservabilityError::with_source(
                        format!("failed to create log directory {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                ObservabilityError::with_source(
                    format!("failed to open log file {}", path.display()),
                    e,
                )
            })?;

        Ok(Self {
            sink: Arc::new(Sink::File(Mutex::new(file))),
            scopes: Arc::default(),
            context: Vec::new(),
        })
    }

    /// Log into memory. Returns the logger and a handle to read it back.
    pub fn memory() -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        let logger = Self {
            sink: Arc::new(Sink::Memory(buffer.clone())),
            scopes: Arc::default(),
            context: Vec::new(),
        };
        (logger, buffer)
    }

    /// Attach a field to every subsequent line. Replaces an existing key.
    pub fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.retain(|(k, _)| k != key);
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    /// Attach `key=value` to every line written through this logger and all
    /// of its clones, including clones made earlier, until the returned
    /// scope is dropped. Context fields of a clone win over scope fields.
    pub fn scope(&self, key: &str, value: &str) -> LogScope {
        if let Ok(mut scopes) = self.scopes.lock() {
            scopes.push((key.to_string(), value.to_string()));
        }
        LogScope {
            scopes: Arc::clone(&self.scopes),
            key: key.to_string(),
        }
    }

    /// Log a typed monitor event at its own severity.
    pub fn event(&self, event: MonitorEvent, fields: &[(&str, &str)]) {
        self.log(event.severity(), event.as_str(), fields);
    }

    /// Log an event with the given severity and fields
    pub fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = match self.scopes.lock() {
            Ok(scopes) if !scopes.is_empty() => {
                let mut context: Fields = scopes
                    .iter()
                    .filter(|(k, _)| !self.context.iter().any(|(c, _)| c == k))
                    .cloned()
                    .collect();
                context.extend(self.context.iter().cloned());
                render(&ts, severity, event, &context, fields)
            }
            _ => render(&ts, severity, event, &self.context, fields),
        };

        match self.sink.as_ref() {
            Sink::Console => {
                if severity >= Severity::Error {
                    write_line(&mut io::stderr(), &line);
                } else {
                    write_line(&mut io::stdout(), &line);
                }
            }
            Sink::File(file) => {
                if let Ok(mut file) = file.lock() {
                    write_line(&mut *file, &line);
                }
            }
            Sink::Memory(buffer) => {
                if let Ok(mut bytes) = buffer.bytes.lock() {
                    bytes.extend_from_slice(line.as_bytes());
                }
            }
        }
    }

    /// Log at TRACE level
    pub fn trace(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at ERROR level
    pub fn error(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }
}

fn write_line<W: Write>(writer: &mut W, line: &str) {
    // Write atomically (one syscall)
    let _ = writer.write_all(line.as_bytes());
    let _ = writer.flush();
}

/// Render one JSON line. Call-site fields win over context fields.
fn render(
    ts: &str,
    severity: Severity,
    event: &str,
    context: &[(String, String)],
    fields: &[(&str, &str)],
) -> String {
    let mut output = String::with_capacity(256);

    output.push_str("{\"event\":\"");
    escape_json_string(&mut output, event);
    output.push_str("\",\"severity\":\"");
    output.push_str(severity.as_str());
    output.push_str("\",\"ts\":\"");
    escape_json_string(&mut output, ts);
    output.push('"');

    let mut sorted_fields: Vec<(&str, &str)> = context
        .iter()
        .filter(|(k, _)| !fields.iter().any(|(f, _)| f == k))
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .chain(fields.iter().copied())
        .collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push_str(",\"");
        escape_json_string(&mut output, key);
        output.push_str("\":\"");
        escape_json_string(&mut output, value);
        output.push('"');
    }

    output.push_str("}\n");
    output
}

/// Escape special characters for JSON strings
fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => {
                output.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TS: &str = "2026-10-17T00:00:00.000Z";

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_render_json_format() {
        let output = render(TS, Severity::Info, "TEST_EVENT", &[], &[]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "TEST_EVENT");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["ts"], TS);
    }

    #[test]
    fn test_render_deterministic_ordering() {
        let output1 = render(TS, Severity::Info, "TEST", &[], &[("zebra", "1"), ("apple", "2"), ("mango", "3")]);
        let output2 = render(TS, Severity::Info, "TEST", &[], &[("apple", "2"), ("mango", "3"), ("zebra", "1")]);

        assert_eq!(output1, output2);

        let apple_pos = output1.find("apple").unwrap();
        let mango_pos = output1.find("mango").unwrap();
        let zebra_pos = output1.find("zebra").unwrap();
        assert!(apple_pos < mango_pos);
        assert!(mango_pos < zebra_pos);
    }

    #[test]
    fn test_render_escapes_special_chars() {
        let output = render(TS, Severity::Info, "TEST", &[], &[("message", "hello \"world\"\nline2")]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["message"], "hello \"world\"\nline2");
        assert_eq!(output.chars().filter(|c| *c == '\n').count(), 1);
    }

    #[test]
    fn test_call_site_fields_override_context() {
        let context = vec![("environment".to_string(), "production".to_string())];
        let output = render(TS, Severity::Info, "TEST", &context, &[("environment", "test")]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["environment"], "test");
        assert_eq!(output.matches("environment").count(), 1);
    }

    #[test]
    fn test_memory_sink_collects_lines() {
        let (logger, buffer) = Logger::memory();
        let logger = logger.with_context("environment", "test");

        logger.info("FIRST", &[]);
        logger.error("SECOND", &[("reason", "boom")]);

        assert_eq!(buffer.events(), vec!["FIRST", "SECOND"]);
        let lines = buffer.lines();
        assert_eq!(lines[0]["environment"], "test");
        assert_eq!(lines[1]["severity"], "ERROR");
        assert_eq!(lines[1]["reason"], "boom");
    }

    #[test]
    fn test_with_context_replaces_key() {
        let (logger, buffer) = Logger::memory();
        let logger = logger.with_context("cycle", "a").with_context("cycle", "b");
        logger.info("TEST", &[]);
        assert_eq!(buffer.lines()[0]["cycle"], "b");
    }

    #[test]
    fn test_scope_reaches_earlier_clones() {
        let (logger, buffer) = Logger::memory();
        let adapter = logger.clone();

        {
            let _cycle = logger.scope("cycle", "c-1");
            adapter.info("INSIDE", &[]);
        }
        adapter.info("OUTSIDE", &[]);

        let lines = buffer.lines();
        assert_eq!(lines[0]["cycle"], "c-1");
        assert!(lines[1].get("cycle").is_none());
    }

    #[test]
    fn test_context_wins_over_scope() {
        let (logger, buffer) = Logger::memory();
        let _cycle = logger.scope("cycle", "scoped");
        logger.clone().with_context("cycle", "own").info("TEST", &[]);
        assert_eq!(buffer.lines()[0]["cycle"], "own");
        assert_eq!(buffer.contents().matches("cycle").count(), 1);
    }

    #[test]
    fn test_file_sink_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("ha_admin.log");

        Logger::file(&path).unwrap().info("ONE", &[]);
        Logger::file(&path).unwrap().info("TWO", &[]);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"event\":\"ONE\""));
        assert!(content.contains("\"event\":\"TWO\""));
    }
}
