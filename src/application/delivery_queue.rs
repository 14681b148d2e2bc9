// Delivery queue - Ordered, mutex-guarded buffer of records awaiting upload
use crate::domain::position::TelemetryRecord;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct QueueState {
    records: VecDeque<TelemetryRecord>,
    next_sequence: u64,
}

/// Records are kept in enqueue order. Every record gets a sequence number so a failed
/// batch can be merged back into its original position.
#[derive(Default)]
pub struct DeliveryQueue {
    state: Mutex<QueueState>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a record and return the new queue length.
    pub fn push(&self, mut record: TelemetryRecord) -> usize {
        let mut state = self.lock();
        record.sequence = state.next_sequence;
        state.next_sequence += 1;
        state.records.push_back(record);
        state.records.len()
    }

    /// Atomically take every queued record, oldest first.
    pub fn take_all(&self) -> Vec<TelemetryRecord> {
        let mut state = self.lock();
        state.records.drain(..).collect()
    }

    /// Put an undelivered batch back, restoring relative order with whatever is queued.
    pub fn requeue(&self, batch: Vec<TelemetryRecord>) {
        if batch.is_empty() {
            return;
        }

        let mut state = self.lock();
        let queued = std::mem::take(&mut state.records);
        let mut merged = VecDeque::with_capacity(queued.len() + batch.len());

        let mut returning = batch.into_iter().peekable();
        let mut waiting = queued.into_iter().peekable();
        loop {
            let take_returning = match (returning.peek(), waiting.peek()) {
                (Some(r), Some(w)) => r.sequence <= w.sequence,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_returning { returning.next() } else { waiting.next() };
            merged.extend(next);
        }

        state.records = merged;
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<TelemetryRecord> {
        self.lock().records.iter().cloned().collect()
    }
}
