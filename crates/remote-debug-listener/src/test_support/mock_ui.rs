use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use remote_debug_common::mutex_lock_or_recover;
use tokio::sync::Notify;

use crate::ports::UiSurface;

/// UI double that answers confirmations from a queue and records prompts.
pub struct MockUi {
    answers: Mutex<VecDeque<bool>>,
    default_answer: bool,
    confirms: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    changed: Notify,
}

impl Default for MockUi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUi {
    /// Declines every confirmation unless answers are queued.
    pub fn new() -> Self {
        Self::answering(false)
    }

    /// Uses `default_answer` once queued answers run out.
    pub fn answering(default_answer: bool) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            default_answer,
            confirms: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            changed: Notify::new(),
        }
    }

    pub fn push_answer(&self, answer: bool) -> &Self {
        mutex_lock_or_recover(&self.answers).push_back(answer);
        self
    }

    pub fn confirms(&self) -> Vec<String> {
        mutex_lock_or_recover(&self.confirms).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        mutex_lock_or_recover(&self.errors).clone()
    }

    /// Waits until at least `count` errors have been shown.
    pub async fn wait_for_errors(&self, count: usize) -> Vec<String> {
        loop {
            let changed = self.changed.notified();
            let errors = self.errors();
            if errors.len() >= count {
                return errors;
            }
            changed.await;
        }
    }

    /// Waits until at least `count` confirmations have been requested.
    pub async fn wait_for_confirms(&self, count: usize) -> Vec<String> {
        loop {
            let changed = self.changed.notified();
            let confirms = self.confirms();
            if confirms.len() >= count {
                return confirms;
            }
            changed.await;
        }
    }
}

#[async_trait]
impl UiSurface for MockUi {
    async fn confirm(&self, message: &str) -> bool {
        mutex_lock_or_recover(&self.confirms).push(message.to_string());
        self.changed.notify_waiters();
        mutex_lock_or_recover(&self.answers)
            .pop_front()
            .unwrap_or(self.default_answer)
    }

    fn show_error(&self, message: &str) {
        mutex_lock_or_recover(&self.errors).push(message.to_string());
        self.changed.notify_waiters();
    }
}
