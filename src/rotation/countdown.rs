//! Minute countdown printed while a session runs

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Interval between two countdown lines
pub const TICK: Duration = Duration::from_secs(60);

/// Remaining-minute values announced for a session of `total_minutes`
pub fn remaining_marks(total_minutes: u64) -> impl Iterator<Item = u64> {
    (1..total_minutes).rev()
}

/// Starts the countdown task
///
/// Returns the task handle and a sender; sending on it (or dropping it)
/// stops the countdown.
pub fn spawn_countdown(
    channel: &str,
    total_minutes: u64,
) -> (JoinHandle<()>, mpsc::Sender<()>) {
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
    let channel = channel.to_string();

    let handle = tokio::spawn(async move {
        for left in remaining_marks(total_minutes) {
            tokio::select! {
                _ = tokio::time::sleep(TICK) => {
                    info!(channel = %channel, "⏳ {} min left", left);
                }
                _ = stop_rx.recv() => {
                    debug!(channel = %channel, "Countdown stopped");
                    return;
                }
            }
        }
    });

    (handle, stop_tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_marks() {
        assert_eq!(remaining_marks(4).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(remaining_marks(1).count(), 0);
        assert_eq!(remaining_marks(0).count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_runs_for_total_minus_one_minutes() {
        let (mut handle, _stop) = spawn_countdown("chan", 3);

        let early = tokio::time::timeout(Duration::from_secs(119), &mut handle).await;
        assert!(early.is_err(), "countdown finished before its last tick");

        let done = tokio::time::timeout(Duration::from_secs(2), &mut handle).await;
        assert!(done.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_stops_on_signal() {
        let (handle, stop) = spawn_countdown("chan", 600);
        stop.send(()).await.unwrap();

        let done = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(done.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_stops_when_sender_dropped() {
        let (handle, stop) = spawn_countdown("chan", 600);
        drop(stop);

        let done = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(done.is_ok());
    }
}
