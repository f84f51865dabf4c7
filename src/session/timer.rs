use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Wall-clock recording timer.
///
/// `start` records the current time and begins sampling elapsed seconds once
/// per second; `stop` freezes the value. Elapsed time is monotonic within a
/// session and resets to zero on the next `start`. Used for display and for
/// the duration attached to the finished note.
pub struct SessionTimer {
    started_at: Mutex<Option<Instant>>,
    sampled_secs: AtomicU64,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionTimer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            started_at: Mutex::new(None),
            sampled_secs: AtomicU64::new(0),
            ticker: Mutex::new(None),
        })
    }

    pub fn start(self: &Arc<Self>) {
        *self.started_at.lock().unwrap() = Some(Instant::now());
        self.sampled_secs.store(0, Ordering::SeqCst);

        let timer = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let started = match *timer.started_at.lock().unwrap() {
                    Some(started) => started,
                    None => break,
                };
                timer
                    .sampled_secs
                    .store(started.elapsed().as_secs(), Ordering::SeqCst);
            }
        });

        if let Some(previous) = self.ticker.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    pub fn stop(&self) {
        if let Some(ticker) = self.ticker.lock().unwrap().take() {
            ticker.abort();
        }
        if let Some(started) = self.started_at.lock().unwrap().take() {
            self.sampled_secs
                .store(started.elapsed().as_secs(), Ordering::SeqCst);
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.lock().unwrap().is_some()
    }

    /// Elapsed whole seconds: live while running, frozen after stop
    pub fn elapsed_secs(&self) -> u64 {
        match *self.started_at.lock().unwrap() {
            Some(started) => started.elapsed().as_secs(),
            None => self.sampled_secs.load(Ordering::SeqCst),
        }
    }
}
