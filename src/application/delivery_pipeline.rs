// Delivery pipeline - Flushes the queue to the collector with at-least-once semantics
use crate::application::delivery_queue::DeliveryQueue;
use crate::application::ports::LocationCollector;
use crate::domain::credentials::Credentials;
use crate::domain::position::TelemetryRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Timer,
    SizeThreshold,
    MemoryPressure,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    Empty,
    /// No bearer token; the batch went back to the queue untouched.
    Deferred(usize),
    Delivered(usize),
    /// Upload failed; the batch was requeued in its original position.
    Failed(usize),
}

#[derive(Clone)]
pub struct DeliveryPipeline {
    queue: Arc<DeliveryQueue>,
    collector: Arc<dyn LocationCollector>,
    workers: Arc<Semaphore>,
    worker_count: u32,
    max_batch_size: usize,
}

impl DeliveryPipeline {
    pub fn new(collector: Arc<dyn LocationCollector>, max_batch_size: usize, worker_count: u32) -> Self {
        let worker_count = worker_count.max(1);
        Self {
            queue: Arc::new(DeliveryQueue::new()),
            collector,
            workers: Arc::new(Semaphore::new(worker_count as usize)),
            worker_count,
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    /// Append a record. Reaching the batch limit hands the whole queue to a worker
    /// before this call returns.
    pub fn enqueue(&self, record: TelemetryRecord, credentials: &Credentials) -> Option<JoinHandle<FlushOutcome>> {
        let len = self.queue.push(record);
        if len >= self.max_batch_size {
            tracing::info!(size = len, "Batch full, forcing flush");
            return self.dispatch(credentials, FlushTrigger::SizeThreshold);
        }
        None
    }

    /// Snapshot the queue now and deliver it on the worker pool.
    pub fn dispatch(&self, credentials: &Credentials, trigger: FlushTrigger) -> Option<JoinHandle<FlushOutcome>> {
        let batch = self.take_batch(credentials, trigger).ok()?;
        let pipeline = self.clone();
        let credentials = credentials.clone();

        Some(tokio::spawn(async move {
            let permit = pipeline.workers.clone().acquire_owned().await;
            if permit.is_err() {
                let count = batch.len();
                pipeline.queue.requeue(batch);
                return FlushOutcome::Failed(count);
            }
            let outcome = pipeline.deliver(batch, &credentials, trigger).await;
            drop(permit);
            outcome
        }))
    }

    /// Snapshot the queue and deliver it on the caller's task.
    pub async fn flush_now(&self, credentials: &Credentials, trigger: FlushTrigger) -> FlushOutcome {
        match self.take_batch(credentials, trigger) {
            Ok(batch) => self.deliver(batch, credentials, trigger).await,
            Err(outcome) => outcome,
        }
    }

    /// Wait for in-flight deliveries to finish, up to `grace`.
    pub async fn drain(&self, grace: Duration) -> bool {
        match tokio::time::timeout(grace, self.workers.acquire_many(self.worker_count)).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(grace_ms = grace.as_millis() as u64, "Deliveries still in flight after grace period");
                false
            }
        }
    }

    fn take_batch(&self, credentials: &Credentials, trigger: FlushTrigger) -> Result<Vec<TelemetryRecord>, FlushOutcome> {
        let batch = self.queue.take_all();
        if batch.is_empty() {
            return Err(FlushOutcome::Empty);
        }

        if !credentials.has_token() {
            let count = batch.len();
            tracing::warn!(count, ?trigger, "No auth token, keeping records for a later flush");
            self.queue.requeue(batch);
            return Err(FlushOutcome::Deferred(count));
        }

        Ok(batch)
    }

    async fn deliver(&self, batch: Vec<TelemetryRecord>, credentials: &Credentials, trigger: FlushTrigger) -> FlushOutcome {
        let count = batch.len();
        match self.collector.upload(credentials, &batch).await {
            Ok(()) => {
                tracing::info!(count, ?trigger, "Synced locations");
                FlushOutcome::Delivered(count)
            }
            Err(error) => {
                tracing::warn!(%error, count, ?trigger, "Sync failed, requeueing batch");
                self.queue.requeue(batch);
                FlushOutcome::Failed(count)
            }
        }
    }
}
