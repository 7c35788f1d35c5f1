//! JSONL persistence for event logs.
//!
//! Storage for the replay data contract: a versioned header line followed
//! by one event per line. Consoles record live sessions through
//! [`TraceArchiveWriter`] and load them back as a complete ordered log for
//! replay.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::event::TraceEvent;

pub const TRACE_ARCHIVE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "line", rename_all = "snake_case")]
enum ArchiveLine {
    Header {
        schema_version: u32,
        recording_id: Uuid,
        created_at: DateTime<Utc>,
    },
    Event {
        event: TraceEvent,
    },
}

/// A fully loaded event log plus its header metadata.
#[derive(Debug, Clone)]
pub struct TraceArchive {
    pub schema_version: u32,
    pub recording_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub events: Vec<TraceEvent>,
}

impl TraceArchive {
    pub fn new(events: Vec<TraceEvent>) -> Self {
        Self {
            schema_version: TRACE_ARCHIVE_SCHEMA_VERSION,
            recording_id: Uuid::new_v4(),
            created_at: Utc::now(),
            events,
        }
    }

    /// Events belonging to one session, in log order.
    pub fn events_for_session(&self, session_id: &str) -> Vec<TraceEvent> {
        self.events
            .iter()
            .filter(|event| event.session_id.as_deref() == Some(session_id))
            .cloned()
            .collect()
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), EngineError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let header = ArchiveLine::Header {
            schema_version: self.schema_version,
            recording_id: self.recording_id,
            created_at: self.created_at,
        };
        writeln!(writer, "{}", serde_json::to_string(&header)?)?;
        for event in &self.events {
            let line = ArchiveLine::Event {
                event: event.clone(),
            };
            writeln!(writer, "{}", serde_json::to_string(&line)?)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_from_path(path: &Path) -> Result<Self, EngineError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut header: Option<(u32, Uuid, DateTime<Utc>)> = None;
        let mut events = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ArchiveLine>(&line)? {
                ArchiveLine::Header {
                    schema_version,
                    recording_id,
                    created_at,
                } => {
                    if index != 0 {
                        return Err(EngineError::ArchiveHeader(
                            "header must be the first line".to_string(),
                        ));
                    }
                    header = Some((schema_version, recording_id, created_at));
                }
                ArchiveLine::Event { event } => events.push(event),
            }
        }

        let (schema_version, recording_id, created_at) = header
            .ok_or_else(|| EngineError::ArchiveHeader("missing header line".to_string()))?;

        Ok(Self {
            schema_version,
            recording_id,
            created_at,
            events,
        })
    }
}

/// Append-only archive writer for live recording.
///
/// Appends are flushed per line so a crash loses at most the event being
/// written.
pub struct TraceArchiveWriter {
    recording_id: Uuid,
    writer: Mutex<BufWriter<File>>,
}

impl TraceArchiveWriter {
    pub fn create(path: &Path) -> Result<Self, EngineError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let recording_id = Uuid::new_v4();
        let header = ArchiveLine::Header {
            schema_version: TRACE_ARCHIVE_SCHEMA_VERSION,
            recording_id,
            created_at: Utc::now(),
        };
        writeln!(writer, "{}", serde_json::to_string(&header)?)?;
        writer.flush()?;

        Ok(Self {
            recording_id,
            writer: Mutex::new(writer),
        })
    }

    pub fn recording_id(&self) -> Uuid {
        self.recording_id
    }

    pub fn append(&self, event: &TraceEvent) -> Result<(), EngineError> {
        let line = ArchiveLine::Event {
            event: event.clone(),
        };
        let json = serde_json::to_string(&line)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{json}")?;
        writer.flush()?;
        Ok(())
    }
}
