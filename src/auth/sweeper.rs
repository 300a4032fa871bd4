use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use super::session::SessionStore;

/// Background worker that drops expired sessions
pub struct SessionSweeper {
    sessions: Arc<SessionStore>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<SessionStore>, interval: Duration) -> Self {
        Self {
            sessions,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the background worker
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!("Session sweeper started with interval {:?}", self.interval);

            let mut interval = time::interval(self.interval);

            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;

                let dropped = self.sessions.purge_expired();
                if dropped > 0 {
                    tracing::info!("Session sweeper dropped {} expired sessions", dropped);
                }
            }

            tracing::info!("Session sweeper stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
