use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::metrics;
use crate::services::sessions::SessionStore;

/// Drops sessions idle for longer than `max_idle` until shutdown is broadcast.
pub(crate) async fn run(
    sessions: SessionStore,
    period: Duration,
    max_idle: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let removed = sessions.sweep_idle(max_idle).await;
                if removed > 0 {
                    let active = sessions.len().await;
                    metrics::set_active_sessions(active);
                    tracing::info!(removed, active, "Idle sessions dropped");
                }
            }
        }
    }

    tracing::debug!("Session sweeper stopped");
}

#[cfg(test)]
mod tests {
    use tokio::sync::watch;
    use tokio::time::{sleep, timeout, Duration};

    use crate::services::sessions::SessionStore;

    #[tokio::test]
    async fn sweeper_drops_idle_sessions_and_stops_on_shutdown() {
        let store = SessionStore::new();
        store.create("alice").await.expect("create");
        sleep(Duration::from_millis(20)).await;

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(super::run(
            store.clone(),
            Duration::from_millis(10),
            Duration::from_millis(5),
            rx,
        ));

        timeout(Duration::from_secs(2), async {
            while store.len().await > 0 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("session swept");

        tx.send(true).expect("send shutdown");
        timeout(Duration::from_secs(2), handle).await.expect("sweeper stopped").expect("join");
    }

    #[tokio::test]
    async fn active_sessions_survive() {
        let store = SessionStore::new();
        store.create("bob").await.expect("create");

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(super::run(
            store.clone(),
            Duration::from_millis(5),
            Duration::from_secs(3600),
            rx,
        ));
        sleep(Duration::from_millis(30)).await;
        assert_eq!(store.len().await, 1);

        tx.send(true).expect("send shutdown");
        timeout(Duration::from_secs(2), handle).await.expect("sweeper stopped").expect("join");
    }
}
