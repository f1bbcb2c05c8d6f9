use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Local;
use serde::Serialize;
use tokio::{
    sync::RwLock,
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{DeliveryReport, Notification, ScheduleEntry, ScheduleTime},
};

use super::dispatcher::BroadcastDispatcher;

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Identifies one recurring schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ScheduleHandle(pub Uuid);

struct ScheduledTask {
    entry: ScheduleEntry,
    fires: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

/// Turns daily times of day into recurring broadcasts. Schedules live only
/// as long as this process.
pub struct ScheduleManager {
    dispatcher: Arc<BroadcastDispatcher>,
    schedules: RwLock<HashMap<Uuid, ScheduledTask>>,
    closed: AtomicBool,
}

impl ScheduleManager {
    pub fn new(dispatcher: Arc<BroadcastDispatcher>) -> Self {
        Self {
            dispatcher,
            schedules: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a broadcast of `notification` every day at `time`, server
    /// local time. Every call adds an independent trigger, even for an
    /// identical payload and time.
    pub async fn schedule(
        &self,
        notification: Notification,
        time: ScheduleTime,
    ) -> AppResult<ScheduleHandle> {
        // Held across the check, spawn and insert so `shutdown` either sees
        // this entry or this call sees `closed`.
        let mut schedules = self.schedules.write().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(AppError::Scheduling(
                "scheduler is shut down".to_string(),
            ));
        }

        let entry = ScheduleEntry::new(time, notification);
        let id = entry.id;
        let fires = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(run_daily(
            id,
            time,
            entry.notification.clone(),
            self.dispatcher.clone(),
            fires.clone(),
        ));

        tracing::info!(
            "Notification {} scheduled for: {} (\"{}\")",
            id,
            entry.cron,
            entry.notification.title
        );

        schedules.insert(id, ScheduledTask { entry, fires, task });

        Ok(ScheduleHandle(id))
    }

    /// Run one dispatch for a schedule right now, outside its daily timer.
    pub async fn fire(&self, handle: ScheduleHandle) -> AppResult<DeliveryReport> {
        let (notification, fires) = {
            let schedules = self.schedules.read().await;
            let scheduled = schedules.get(&handle.0).ok_or(AppError::ScheduleNotFound)?;
            (scheduled.entry.notification.clone(), scheduled.fires.clone())
        };

        fires.fetch_add(1, Ordering::SeqCst);
        self.dispatcher.broadcast(&notification).await
    }

    /// Snapshot of all live schedules, oldest first.
    pub async fn entries(&self) -> Vec<ScheduleEntry> {
        let schedules = self.schedules.read().await;
        let mut entries: Vec<ScheduleEntry> = schedules
            .values()
            .map(|scheduled| {
                let mut entry = scheduled.entry.clone();
                entry.fire_count = scheduled.fires.load(Ordering::SeqCst);
                entry
            })
            .collect();
        entries.sort_by_key(|entry| entry.created_at);
        entries
    }

    /// Stop every trigger. Later `schedule` calls fail.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let mut schedules = self.schedules.write().await;
        for (_, scheduled) in schedules.drain() {
            scheduled.task.abort();
        }
        tracing::info!("Schedule manager stopped");
    }
}

impl Drop for ScheduleManager {
    fn drop(&mut self) {
        if let Ok(mut schedules) = self.schedules.try_write() {
            for (_, scheduled) in schedules.drain() {
                scheduled.task.abort();
            }
        }
    }
}

async fn run_daily(
    id: Uuid,
    time: ScheduleTime,
    notification: Notification,
    dispatcher: Arc<BroadcastDispatcher>,
    fires: Arc<AtomicU64>,
) {
    let now = Local::now();
    let Some(mut target) = time.next_occurrence(&now) else {
        tracing::error!("Schedule {} has no future occurrence", id);
        return;
    };
    let mut deadline = Instant::now() + (target - now).to_std().unwrap_or_default();

    loop {
        sleep_until(deadline).await;

        fires.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            "Sending scheduled notification {} at {}:{:02}",
            id,
            time.hour(),
            time.minute()
        );
        if let Err(e) = dispatcher.broadcast(&notification).await {
            tracing::error!("Scheduled notification {} failed: {}", id, e);
        }

        let Some(next) = time.next_occurrence(&target) else {
            tracing::error!("Schedule {} has no future occurrence", id);
            return;
        };
        deadline += (next - target).to_std().unwrap_or(ONE_DAY);
        target = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use crate::{
        models::TokenRecord,
        services::registry::TokenRegistry,
        storage::memory::MemoryTokenStore,
        test_utils::RecordingTransport,
    };

    fn manager(store: MemoryTokenStore, transport: RecordingTransport) -> ScheduleManager {
        let registry = TokenRegistry::new(Arc::new(store));
        let dispatcher = BroadcastDispatcher::new(registry, Arc::new(transport));
        ScheduleManager::new(Arc::new(dispatcher))
    }

    fn daily(hour: i64, minute: i64) -> ScheduleTime {
        ScheduleTime::new(hour, minute).unwrap()
    }

    fn seeded_store() -> MemoryTokenStore {
        MemoryTokenStore::with_documents(vec![("abc".to_string(), TokenRecord::new("abc"))])
    }

    #[tokio::test]
    async fn manual_fire_broadcasts_the_stored_payload() {
        let transport = RecordingTransport::new();
        let manager = manager(seeded_store(), transport.clone());

        let notification = Notification::new("Standup", "In five minutes")
            .with_link(Some("https://meet.example.com".to_string()));
        let handle = manager
            .schedule(notification.clone(), daily(9, 30))
            .await
            .unwrap();

        let report = manager.fire(handle).await.unwrap();

        assert_eq!(report.success_count, 1);
        let calls = transport.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].notification, notification);
        assert_eq!(calls[0].tokens, vec!["abc".to_string()]);
        assert_eq!(manager.entries().await[0].fire_count, 1);
    }

    #[tokio::test]
    async fn identical_schedules_are_independent() {
        let manager = manager(seeded_store(), RecordingTransport::new());

        let first = manager
            .schedule(Notification::new("t", "b"), daily(9, 0))
            .await
            .unwrap();
        let second = manager
            .schedule(Notification::new("t", "b"), daily(9, 0))
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(manager.entries().await.len(), 2);
    }

    #[tokio::test]
    async fn firing_unknown_handle_is_an_error() {
        let manager = manager(seeded_store(), RecordingTransport::new());

        let result = manager.fire(ScheduleHandle(Uuid::new_v4())).await;
        assert!(matches!(result, Err(AppError::ScheduleNotFound)));
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_fires_within_a_day() {
        let transport = RecordingTransport::new();
        let manager = manager(seeded_store(), transport.clone());
        let now = Local::now();

        let target = now + chrono::Duration::minutes(90);
        let time = ScheduleTime::new(target.hour() as i64, target.minute() as i64).unwrap();
        manager
            .schedule(Notification::new("Daily", "Digest"), time)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;

        assert_eq!(transport.call_count().await, 1);
        assert_eq!(manager.entries().await[0].fire_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_firing_keeps_the_trigger_alive() {
        let store = MemoryTokenStore::new();
        let transport = RecordingTransport::new();
        let manager = manager(store.clone(), transport.clone());

        manager
            .schedule(Notification::new("Daily", "Digest"), daily(12, 0))
            .await
            .unwrap();

        // First firing finds no recipients.
        tokio::time::sleep(ONE_DAY + Duration::from_secs(60)).await;
        assert_eq!(transport.call_count().await, 0);
        assert!(manager.entries().await[0].fire_count >= 1);

        TokenRegistry::new(Arc::new(store)).register("late").await.unwrap();
        tokio::time::sleep(ONE_DAY).await;

        assert!(transport.call_count().await >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_racing_schedule_leaves_no_live_trigger() {
        let transport = RecordingTransport::new();
        let manager = manager(seeded_store(), transport.clone());

        let (scheduled, ()) = tokio::join!(
            manager.schedule(Notification::new("t", "b"), daily(12, 0)),
            manager.shutdown(),
        );
        if scheduled.is_err() {
            assert!(matches!(scheduled, Err(AppError::Scheduling(_))));
        }

        tokio::time::sleep(ONE_DAY * 2).await;

        assert!(manager.entries().await.is_empty());
        assert_eq!(transport.call_count().await, 0);
    }

    #[tokio::test]
    async fn shutdown_stops_accepting_schedules() {
        let manager = manager(seeded_store(), RecordingTransport::new());
        manager
            .schedule(Notification::new("t", "b"), daily(8, 0))
            .await
            .unwrap();

        manager.shutdown().await;

        assert!(manager.entries().await.is_empty());
        assert!(matches!(
            manager.schedule(Notification::new("t", "b"), daily(8, 0)).await,
            Err(AppError::Scheduling(_))
        ));
    }
}
