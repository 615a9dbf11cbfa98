/// Task statistics and the shared statistics ticker
///
/// Statistics are time-driven rather than change-driven: a single background
/// task recomputes them every `statistics_interval` (and immediately on
/// login/logout) and publishes the result on a `watch` channel. Every
/// [`StatisticsFeed`] is a receiver of that channel. When the last feed is
/// dropped the channel closes and the ticker exits, so nothing runs while
/// statistics are unobserved.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;

use super::scope_for;
use crate::auth::service::AuthState;
use crate::models::task::Task;
use crate::store::{StoreError, TaskScope, TaskStore};

/// Completion summary over a visibility scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total_tasks: usize,
    pub completed_tasks: usize,

    /// Percentage in `0.0..=100.0`; `0.0` when there are no tasks
    pub completion_rate: f64,
}

impl TaskStatistics {
    pub fn from_counts(total_tasks: usize, completed_tasks: usize) -> Self {
        let completion_rate = if total_tasks > 0 {
            completed_tasks as f64 / total_tasks as f64 * 100.0
        } else {
            0.0
        };

        TaskStatistics {
            total_tasks,
            completed_tasks,
            completion_rate,
        }
    }

    pub fn pending_tasks(&self) -> usize {
        self.total_tasks.saturating_sub(self.completed_tasks)
    }
}

/// Counts the tasks in `scope`
pub async fn compute(
    tasks: &dyn TaskStore,
    scope: TaskScope,
) -> Result<TaskStatistics, StoreError> {
    if scope == TaskScope::Nothing {
        return Ok(TaskStatistics::default());
    }

    let total = tasks.count_where(&|t: &Task| scope.includes(t)).await?;
    let completed = tasks
        .count_where(&|t: &Task| scope.includes(t) && t.is_completed)
        .await?;

    Ok(TaskStatistics::from_counts(total, completed))
}

/// Live statistics for the current identity
///
/// Cloning yields another observer of the same ticker.
#[derive(Debug, Clone)]
pub struct StatisticsFeed {
    rx: watch::Receiver<TaskStatistics>,
}

impl StatisticsFeed {
    pub(crate) fn new(rx: watch::Receiver<TaskStatistics>) -> Self {
        StatisticsFeed { rx }
    }

    /// Latest published statistics
    pub fn current(&self) -> TaskStatistics {
        *self.rx.borrow()
    }

    /// Waits for the next changed value; `None` once the ticker is gone
    pub async fn next(&mut self) -> Option<TaskStatistics> {
        self.rx.changed().await.ok()?;
        let stats = *self.rx.borrow_and_update();
        Some(stats)
    }

    /// Stream yielding the current value, then every change
    pub fn into_stream(self) -> WatchStream<TaskStatistics> {
        WatchStream::new(self.rx)
    }
}

/// Recomputes statistics until every receiver has been dropped
///
/// `auth_rx` must be subscribed before the initial value was computed so
/// that a login or logout in between is not missed.
pub(crate) async fn run_ticker(
    tx: Arc<watch::Sender<TaskStatistics>>,
    mut auth_rx: watch::Receiver<AuthState>,
    tasks: Arc<dyn TaskStore>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the initial value is already published.
    interval.tick().await;

    tracing::debug!(period_ms = period.as_millis() as u64, "Statistics ticker started");

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            changed = auth_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = interval.tick() => {}
        }

        let scope = scope_for(&auth_rx.borrow_and_update());
        match compute(tasks.as_ref(), scope).await {
            Ok(stats) => {
                tx.send_if_modified(|current| {
                    if *current == stats {
                        false
                    } else {
                        *current = stats;
                        true
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "Failed to recompute task statistics"),
        }
    }

    tracing::debug!("Statistics ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts() {
        let stats = TaskStatistics::from_counts(4, 2);
        assert_eq!(stats.total_tasks, 4);
        assert_eq!(stats.completed_tasks, 2);
        assert_eq!(stats.completion_rate, 50.0);
        assert_eq!(stats.pending_tasks(), 2);
    }

    #[test]
    fn test_empty_scope_has_zero_rate() {
        let stats = TaskStatistics::from_counts(0, 0);
        assert_eq!(stats.completion_rate, 0.0);
        assert_eq!(stats, TaskStatistics::default());
    }

    #[test]
    fn test_rate_is_a_percentage() {
        let stats = TaskStatistics::from_counts(3, 1);
        assert!((stats.completion_rate - 33.333).abs() < 0.01);
    }
}
