use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use toolgate_policy::PolicyDecision;
use tracing::error;

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Chain integrity violation: {0}")]
    IntegrityViolation(String),
}

/// One recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    /// Process-wide arrival order, assigned by the recorder.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub tool_name: String,
    pub decision: PolicyDecision,
    pub executed: bool,
    pub result_summary: Option<String>,
}

impl EvidenceEntry {
    pub fn new(
        session_id: &str,
        tool_name: &str,
        decision: PolicyDecision,
        executed: bool,
        result_summary: Option<String>,
    ) -> Self {
        Self {
            seq: 0,
            timestamp: Utc::now(),
            session_id: session_id.to_string(),
            tool_name: tool_name.to_string(),
            decision,
            executed,
            result_summary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMetadata {
    pub session_id: String,
    pub exported_at: DateTime<Utc>,
    pub entry_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidencePack {
    pub metadata: EvidenceMetadata,
    pub entries: Vec<EvidenceEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceFormat {
    Json,
    Markdown,
}

impl EvidenceFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            EvidenceFormat::Json => "application/json",
            EvidenceFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

impl FromStr for EvidenceFormat {
    type Err = EvidenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(EvidenceFormat::Json),
            "markdown" | "md" => Ok(EvidenceFormat::Markdown),
            other => Err(EvidenceError::InvalidFormat(format!(
                "'{}' (expected json or markdown)",
                other
            ))),
        }
    }
}

impl EvidencePack {
    pub fn render(&self, format: EvidenceFormat) -> Result<String, EvidenceError> {
        match format {
            EvidenceFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            EvidenceFormat::Markdown => Ok(self.render_markdown()),
        }
    }

    fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Evidence pack: {}", self.metadata.session_id);
        let _ = writeln!(out);
        let _ = writeln!(out, "- Exported at: {}", self.metadata.exported_at.to_rfc3339());
        let _ = writeln!(out, "- Entries: {}", self.metadata.entry_count);
        let _ = writeln!(out);
        let _ = writeln!(out, "| Seq | Timestamp | Tool | Action | Matched rule | Executed | Reason | Result |");
        let _ = writeln!(out, "|---|---|---|---|---|---|---|---|");
        for e in &self.entries {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                e.seq,
                e.timestamp.to_rfc3339(),
                escape_cell(&e.tool_name),
                e.decision.action,
                escape_cell(e.decision.matched_rule.as_deref().unwrap_or("-")),
                e.executed,
                escape_cell(&e.decision.reason),
                escape_cell(e.result_summary.as_deref().unwrap_or("")),
            );
        }
        out
    }
}

/// Keep a value inside one table cell: no column breaks, no row breaks.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// A validated export request: the pack plus the format it will be rendered in.
#[derive(Debug, Clone)]
pub struct EvidenceExport {
    pub format: EvidenceFormat,
    pub pack: EvidencePack,
}

impl EvidenceExport {
    pub fn render(&self) -> Result<String, EvidenceError> {
        self.pack.render(self.format)
    }
}

/// Durable destination for recorded entries.
pub trait EvidenceSink: Send + Sync {
    fn append(&self, entry: &EvidenceEntry) -> Result<(), EvidenceError>;
}

#[derive(Default)]
struct Timelines {
    next_seq: u64,
    by_session: HashMap<String, Vec<EvidenceEntry>>,
}

/// Append-only per-session decision timeline.
///
/// `record` never fails: a sink error is logged and counted, and the entry
/// still lands in the in-memory timeline.
pub struct EvidenceRecorder {
    timelines: Mutex<Timelines>,
    sink: Option<Arc<dyn EvidenceSink>>,
    sink_failures: AtomicU64,
}

impl Default for EvidenceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl EvidenceRecorder {
    pub fn new() -> Self {
        Self {
            timelines: Mutex::new(Timelines {
                next_seq: 1,
                by_session: HashMap::new(),
            }),
            sink: None,
            sink_failures: AtomicU64::new(0),
        }
    }

    pub fn with_sink(sink: Arc<dyn EvidenceSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new()
        }
    }

    /// Load previously persisted entries without re-sending them to the sink.
    pub fn restore(&self, entries: Vec<EvidenceEntry>) {
        let mut timelines = self.timelines.lock();
        for entry in entries {
            timelines.next_seq = timelines.next_seq.max(entry.seq + 1);
            timelines
                .by_session
                .entry(entry.session_id.clone())
                .or_default()
                .push(entry);
        }
    }

    pub fn record(&self, mut entry: EvidenceEntry) -> EvidenceEntry {
        {
            let mut timelines = self.timelines.lock();
            entry.seq = timelines.next_seq;
            timelines.next_seq += 1;

            // The sink is written under the timeline lock so its order matches seq.
            if let Some(sink) = &self.sink {
                if let Err(e) = sink.append(&entry) {
                    self.sink_failures.fetch_add(1, Ordering::Relaxed);
                    error!(
                        session_id = %entry.session_id,
                        seq = entry.seq,
                        error = %e,
                        "Failed to persist evidence entry"
                    );
                }
            }

            timelines
                .by_session
                .entry(entry.session_id.clone())
                .or_default()
                .push(entry.clone());
        }
        entry
    }

    pub fn entries(&self, session_id: &str) -> Vec<EvidenceEntry> {
        self.timelines
            .lock()
            .by_session
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn entry_count(&self, session_id: &str) -> usize {
        self.timelines
            .lock()
            .by_session
            .get(session_id)
            .map_or(0, Vec::len)
    }

    /// Assemble the pack for a session. Unknown sessions give an empty pack.
    pub fn pack(&self, session_id: &str) -> EvidencePack {
        let entries = self.entries(session_id);
        EvidencePack {
            metadata: EvidenceMetadata {
                session_id: session_id.to_string(),
                exported_at: Utc::now(),
                entry_count: entries.len(),
            },
            entries,
        }
    }

    pub fn export_pack(&self, session_id: &str, format: &str) -> Result<EvidenceExport, EvidenceError> {
        let format = format.parse::<EvidenceFormat>()?;
        Ok(EvidenceExport {
            format,
            pack: self.pack(session_id),
        })
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }
}
