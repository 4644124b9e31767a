// SPDX-License-Identifier: MIT

//! Per-path write-event debouncing.
//!
//! A burst of writes to the same path should produce exactly one action.
//! This is implemented with a generation counter per path: each event bumps
//! the path's generation and schedules a timer; when the timer fires, it
//! only acts if its captured generation is still the latest one.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Tracks the most recent generation observed for each debounced path.
#[derive(Clone, Default)]
pub struct Debouncer {
    generations: Arc<Mutex<HashMap<PathBuf, u64>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write event for `path` and arm a timer of `window`. When the
    /// timer elapses, `path` is sent on `fire` iff no later event for the
    /// same path arrived in the meantime.
    pub fn note_event(&self, path: PathBuf, window: Duration, fire: mpsc::Sender<PathBuf>) {
        let generation = {
            let mut generations = self.generations.lock();
            let next = generations.get(&path).copied().unwrap_or(0) + 1;
            generations.insert(path.clone(), next);
            next
        };
        let generations = self.generations.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let is_latest = generations.lock().get(&path).copied() == Some(generation);
            if is_latest {
                let _ = fire.send(path).await;
            }
        });
    }
}

#[cfg(test)]
#[path = "debounce_tests.rs"]
mod tests;
