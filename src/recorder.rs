//! Result recording interface
//!
//! Every classified check outcome becomes exactly one [`Sample`] handed to
//! the recorder. Implementations may buffer and batch writes, but must
//! preserve per-item ordering and must not block the poll loop beyond a
//! bounded flush interval. Calls are not idempotent - each one is a
//! distinct point-in-time observation.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::item::{ItemId, ItemStatus, ValueType};

/// What one fetch attempt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleValue {
    Value(String),
    Failure(String),
}

/// One recorded observation
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub item_id: ItemId,
    pub value_type: ValueType,
    pub value: SampleValue,
    pub taken_at: DateTime<Utc>,
    /// Item status after this observation
    pub status: ItemStatus,
}

#[async_trait]
pub trait ResultRecorder: Send + Sync {
    async fn record(&self, sample: Sample) -> anyhow::Result<()>;
}

/// Maximum samples kept in the in-memory ring buffer
const MAX_SAMPLES: usize = 1000;

/// Ring-buffer recorder for tests and small setups.
///
/// Oldest samples are evicted once the buffer is full.
pub struct MemoryRecorder {
    samples: Mutex<VecDeque<Sample>>,
    capacity: usize,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SAMPLES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Snapshot of all buffered samples, oldest first.
    pub fn samples(&self) -> Vec<Sample> {
        self.samples
            .lock()
            .expect("sample buffer lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Buffered samples for one item, oldest first.
    pub fn samples_for(&self, item_id: ItemId) -> Vec<Sample> {
        self.samples
            .lock()
            .expect("sample buffer lock poisoned")
            .iter()
            .filter(|s| s.item_id == item_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.lock().expect("sample buffer lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultRecorder for MemoryRecorder {
    async fn record(&self, sample: Sample) -> anyhow::Result<()> {
        let mut samples = self.samples.lock().expect("sample buffer lock poisoned");
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
        Ok(())
    }
}
