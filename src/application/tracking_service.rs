// Tracking service - Single-writer event loop around the tracker core
use crate::application::delivery_pipeline::DeliveryPipeline;
use crate::application::tracker::{MemoryPressure, Tracker, TrackerError, TrackerStatus};
use crate::domain::motion::ActivityTransition;
use crate::domain::position::PositionFix;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

const COMMAND_BUFFER: usize = 256;

enum Command {
    Start(oneshot::Sender<Result<(), TrackerError>>),
    Stop(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
    Fix(PositionFix),
    Transition(ActivityTransition),
    Battery(f32),
    MemoryPressure(MemoryPressure),
}

/// Cloneable handle to the tracking service. Every event and lifecycle call is queued
/// onto one task, so the tracker's state is only ever mutated in arrival order.
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<TrackerStatus>,
    pipeline: DeliveryPipeline,
}

impl TrackerHandle {
    pub fn spawn(tracker: Tracker) -> (Self, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(COMMAND_BUFFER);
        let (status_tx, status) = watch::channel(tracker.status());
        let pipeline = tracker.pipeline().clone();
        let worker = tokio::spawn(run(tracker, receiver, status_tx));
        (
            Self {
                commands,
                status,
                pipeline,
            },
            worker,
        )
    }

    pub async fn start(&self) -> Result<(), TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Start(reply)).await?;
        response.await.map_err(|_| TrackerError::ServiceStopped)?
    }

    pub async fn stop(&self) -> Result<(), TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Stop(reply)).await?;
        response.await.map_err(|_| TrackerError::ServiceStopped)
    }

    /// Stop tracking and end the event loop.
    pub async fn shutdown(&self) -> Result<(), TrackerError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Shutdown(reply)).await?;
        response.await.map_err(|_| TrackerError::ServiceStopped)
    }

    pub fn is_active(&self) -> bool {
        self.status.borrow().active
    }

    /// Last published status. The queue length is read live, since background
    /// deliveries change it between events.
    pub fn status(&self) -> TrackerStatus {
        let mut status = self.status.borrow().clone();
        status.queued = self.pipeline.queued();
        status
    }

    pub async fn submit_fix(&self, fix: PositionFix) -> Result<(), TrackerError> {
        self.send(Command::Fix(fix)).await
    }

    pub async fn submit_transition(&self, transition: ActivityTransition) -> Result<(), TrackerError> {
        self.send(Command::Transition(transition)).await
    }

    pub async fn submit_battery(&self, level_percent: f32) -> Result<(), TrackerError> {
        self.send(Command::Battery(level_percent)).await
    }

    pub async fn submit_memory_pressure(&self, level: MemoryPressure) -> Result<(), TrackerError> {
        self.send(Command::MemoryPressure(level)).await
    }

    async fn send(&self, command: Command) -> Result<(), TrackerError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| TrackerError::ServiceStopped)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn run(mut tracker: Tracker, mut commands: mpsc::Receiver<Command>, status: watch::Sender<TrackerStatus>) {
    let mut next_flush: Option<Instant> = None;
    tracing::debug!("Tracking service loop started");

    loop {
        let deadline = next_flush;
        let flush_timer = async move {
            match deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                let exit = matches!(command, Command::Shutdown(_));
                handle(&mut tracker, command, &status).await;

                next_flush = match (tracker.is_active(), next_flush) {
                    (true, None) => Some(Instant::now() + tracker.settings().flush_interval),
                    (true, armed) => armed,
                    (false, _) => None,
                };

                if exit {
                    break;
                }
            }
            () = flush_timer => {
                tracker.on_flush_timer();
                next_flush = Some(Instant::now() + tracker.flush_cadence());
                status.send_replace(tracker.status());
            }
        }
    }

    tracing::debug!("Tracking service loop finished");
}

/// Apply one command. Status is published before any reply so callers observe the result.
async fn handle(tracker: &mut Tracker, command: Command, status: &watch::Sender<TrackerStatus>) {
    match command {
        Command::Start(reply) => {
            let result = tracker.start(now_millis());
            status.send_replace(tracker.status());
            let _ = reply.send(result);
        }
        Command::Stop(reply) | Command::Shutdown(reply) => {
            tracker.stop().await;
            status.send_replace(tracker.status());
            let _ = reply.send(());
        }
        Command::Fix(fix) => {
            tracker.on_fix(fix, now_millis());
            status.send_replace(tracker.status());
        }
        Command::Transition(transition) => {
            tracker.on_transition(transition, now_millis());
            status.send_replace(tracker.status());
        }
        Command::Battery(level) => {
            tracker.on_battery_sample(level);
            status.send_replace(tracker.status());
        }
        Command::MemoryPressure(level) => {
            tracker.on_memory_pressure(level);
            status.send_replace(tracker.status());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::delivery_pipeline::DeliveryPipeline;
    use crate::application::test_support::{
        FakeActivitySource, FakeCollector, FakePositionSource, FakeWakeLock, MemoryPreferenceStore,
    };
    use crate::application::tracker::{TrackerPorts, TrackerSettings};
    use crate::domain::motion::ActivityType;
    use std::sync::Arc;
    use std::time::Duration;

    struct Service {
        handle: TrackerHandle,
        worker: JoinHandle<()>,
        positions: Arc<FakePositionSource>,
        collector: Arc<FakeCollector>,
    }

    fn service(flush_interval: Duration) -> Service {
        let positions = Arc::new(FakePositionSource::default());
        let collector = Arc::new(FakeCollector::default());
        let ports = TrackerPorts {
            positions: positions.clone(),
            activities: Arc::new(FakeActivitySource::default()),
            wake_lock: Arc::new(FakeWakeLock::default()),
            preferences: Arc::new(MemoryPreferenceStore::with_token("secret")),
        };
        let settings = TrackerSettings {
            flush_interval,
            ..TrackerSettings::default()
        };
        let pipeline = DeliveryPipeline::new(collector.clone(), 100, 2);
        let (handle, worker) = TrackerHandle::spawn(Tracker::new(ports, pipeline, settings));
        Service {
            handle,
            worker,
            positions,
            collector,
        }
    }

    /// Round-trips a start so every previously queued event has been handled.
    async fn settle(handle: &TrackerHandle) {
        handle.start().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_twice_keeps_single_subscription() {
        let s = service(Duration::from_secs(15));
        assert!(!s.handle.is_active());

        s.handle.start().await.unwrap();
        s.handle.start().await.unwrap();

        assert!(s.handle.is_active());
        assert_eq!(s.positions.active_subscriptions(), 1);
    }

    #[tokio::test]
    async fn test_events_are_applied_in_order() {
        let s = service(Duration::from_secs(15));
        s.handle.start().await.unwrap();

        s.handle
            .submit_transition(ActivityTransition::enter(ActivityType::Still))
            .await
            .unwrap();
        s.handle.submit_fix(PositionFix::new(10.0, 20.0, 5.0, 0)).await.unwrap();
        s.handle.submit_fix(PositionFix::new(10.00005, 20.00005, 5.0, 1)).await.unwrap();
        s.handle.submit_battery(15.0).await.unwrap();
        settle(&s.handle).await;

        let status = s.handle.status();
        assert_eq!(status.queued, 1);
        assert_eq!(status.activity, "Stationary");
        assert!(status.low_power);
        assert_eq!(status.interval_millis, 60_000);
    }

    #[tokio::test]
    async fn test_periodic_flush_delivers_queue() {
        let s = service(Duration::from_millis(30));
        s.handle.start().await.unwrap();
        s.handle.submit_fix(PositionFix::new(1.0, 2.0, 5.0, 0)).await.unwrap();
        s.handle.submit_fix(PositionFix::new(1.1, 2.0, 5.0, 1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(s.collector.delivered().len(), 2);
    }

    #[tokio::test]
    async fn test_status_reflects_requeue_after_background_flush() {
        let s = service(Duration::from_secs(15));
        s.collector.set_failing(true);
        s.handle.start().await.unwrap();
        s.handle.submit_fix(PositionFix::new(1.0, 2.0, 5.0, 0)).await.unwrap();
        s.handle.submit_fix(PositionFix::new(1.1, 2.0, 5.0, 1)).await.unwrap();

        s.handle.submit_memory_pressure(MemoryPressure::Severe).await.unwrap();
        settle(&s.handle).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(s.collector.attempts().len(), 1);
        assert_eq!(s.handle.status().queued, 2);
    }

    #[tokio::test]
    async fn test_stop_flushes_and_deactivates() {
        let s = service(Duration::from_secs(15));
        s.handle.start().await.unwrap();
        s.handle.submit_fix(PositionFix::new(1.0, 2.0, 5.0, 0)).await.unwrap();

        s.handle.stop().await.unwrap();
        assert!(!s.handle.is_active());
        assert_eq!(s.collector.delivered().len(), 1);
        assert_eq!(s.positions.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_loop() {
        let s = service(Duration::from_secs(15));
        s.handle.start().await.unwrap();
        s.handle.shutdown().await.unwrap();

        s.worker.await.unwrap();
        assert!(matches!(s.handle.start().await, Err(TrackerError::ServiceStopped)));
    }
}
