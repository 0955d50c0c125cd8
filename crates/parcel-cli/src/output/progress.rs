//! Terminal progress bar for pack, extract and transfer operations.
//!
//! The bar is a [`ProgressObserver`]: bundle and site code drive it, and it
//! redraws on stderr at most every 100ms. Cancellation is shared through an
//! atomic flag that the Ctrl-C handler sets.

use parcel_bundle::{Action, ProgressObserver};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

struct State {
    label: String,
    action: Action,
    total: u64,
    current: u64,
    start_time: Instant,
    last_update: Option<Instant>,
}

/// Progress bar for terminal output
pub struct ProgressBar {
    state: Mutex<Option<State>>,
    cancelled: Arc<AtomicBool>,
    visible: bool,
}

impl ProgressBar {
    pub fn new(visible: bool) -> Self {
        Self {
            state: Mutex::new(None),
            cancelled: Arc::new(AtomicBool::new(false)),
            visible,
        }
    }

    /// Flag that cancels the operation this bar observes once set
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current position and total of the running operation
    #[cfg(test)]
    pub fn position(&self) -> Option<(u64, u64)> {
        self.lock().as_ref().map(|state| (state.current, state.total))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<State>> {
        // A poisoned bar only loses display state
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn render(state: &State) -> String {
        let elapsed = state.start_time.elapsed().as_secs();
        let rate = if elapsed > 0 { state.current / elapsed } else { 0 };

        if state.total > 0 {
            let percentage = (state.current.min(state.total) * 100) / state.total;
            format!(
                "{} {} [{}/{}] {}% ({}/s)",
                state.action, state.label, state.current, state.total, percentage, rate
            )
        } else {
            format!("{} {} [{}] ({}/s)", state.action, state.label, state.current, rate)
        }
    }

    fn display(&self, state: &State) {
        if !self.visible {
            return;
        }
        let mut stderr = io::stderr();
        let _ = write!(stderr, "\r{}", Self::render(state));
        let _ = stderr.flush();
    }
}

impl ProgressObserver for ProgressBar {
    fn start(&self, label: &str, action: Action, total: u64) {
        let state = State {
            label: label.to_string(),
            action,
            total,
            current: 0,
            start_time: Instant::now(),
            last_update: None,
        };
        self.display(&state);
        *self.lock() = Some(state);
    }

    fn advance(&self, amount: u64) {
        let mut guard = self.lock();
        let Some(state) = guard.as_mut() else {
            return;
        };
        state.current += amount;

        // Only redraw every 100ms to avoid flickering
        let now = Instant::now();
        if state.last_update.map_or(true, |last| now.duration_since(last) > REDRAW_INTERVAL) {
            state.last_update = Some(now);
            self.display(state);
        }
    }

    fn finish(&self) {
        if let Some(state) = self.lock().as_ref() {
            self.display(state);
            if self.visible {
                eprintln!();
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
