//! Append-only record of pocket/current swaps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// A model as it stood at the time of a swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionSnapshot {
    pub model: String,
    pub fitness: f64,
    pub error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub timestamp: DateTime<Utc>,
    pub generation: usize,
    pub agent: usize,
    pub old: SolutionSnapshot, // pocket before the swap
    pub new: SolutionSnapshot, // pocket after the swap
}

pub trait SwapLog {
    fn record(&mut self, record: SwapRecord);

    /// Called once when a run finishes
    fn flush(&mut self) {}
}

impl<L: SwapLog + ?Sized> SwapLog for &mut L {
    fn record(&mut self, record: SwapRecord) {
        (**self).record(record);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}

/// Drops every record
#[derive(Debug, Default)]
pub struct DiscardSwapLog;

impl SwapLog for DiscardSwapLog {
    fn record(&mut self, _record: SwapRecord) {}
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySwapLog {
    records: Vec<SwapRecord>,
}

impl MemorySwapLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[SwapRecord] {
        &self.records
    }
}

impl SwapLog for MemorySwapLog {
    fn record(&mut self, record: SwapRecord) {
        self.records.push(record);
    }
}

/// Writes one JSON object per line.
///
/// Write failures are reported once and never interrupt the run.
pub struct JsonLinesSwapLog<W: Write> {
    writer: W,
    failed: bool,
}

impl<W: Write> JsonLinesSwapLog<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, record: &SwapRecord) -> Result<(), crate::error::MemeticoError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> SwapLog for JsonLinesSwapLog<W> {
    fn record(&mut self, record: SwapRecord) {
        if self.failed {
            return;
        }
        if let Err(e) = self.write(&record) {
            log::warn!("Swap log disabled after write failure: {}", e);
            self.failed = true;
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            log::warn!("Failed to flush swap log: {}", e);
        }
    }
}
