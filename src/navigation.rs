//! Navigation surface the session drives: an address path plus a window
//! title, with external jumps (history navigation) flowing back in.

use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// Where the session publishes its canonical location and reads back
/// navigation performed outside of it.
pub trait Navigator: Send + Sync {
    /// Current path, without any leading separator. Empty when at the root.
    fn current_path(&self) -> String;

    /// Pushes a new path. Implementations must not echo pushes back
    /// through `back_events`, only external jumps.
    fn push(&self, path: &str);

    fn set_title(&self, title: &str);

    /// Subscribes to paths activated outside the session.
    fn back_events(&self) -> broadcast::Receiver<String>;
}

/// In-process navigator for headless runs and tests. External jumps can be
/// injected with [`MemoryNavigator::jump`].
pub struct MemoryNavigator {
    path: Mutex<String>,
    title: Mutex<String>,
    pushes: Mutex<Vec<String>>,
    back_tx: broadcast::Sender<String>,
}

impl MemoryNavigator {
    pub fn new() -> Self {
        let (back_tx, _) = broadcast::channel(16);
        Self {
            path: Mutex::new(String::new()),
            title: Mutex::new(String::new()),
            pushes: Mutex::new(Vec::new()),
            back_tx,
        }
    }

    /// Simulates a navigation performed outside the session.
    pub fn jump(&self, path: &str) {
        *self.path.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
        let _ = self.back_tx.send(path.to_string());
    }

    pub fn title(&self) -> String {
        self.title
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every path pushed so far, oldest first.
    pub fn pushes(&self) -> Vec<String> {
        self.pushes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, path: &str) {
        *self.path.lock().unwrap_or_else(PoisonError::into_inner) = path.to_string();
        self.pushes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }

    fn set_title(&self, title: &str) {
        *self.title.lock().unwrap_or_else(PoisonError::into_inner) = title.to_string();
    }

    fn back_events(&self) -> broadcast::Receiver<String> {
        self.back_tx.subscribe()
    }
}
