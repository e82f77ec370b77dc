use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domains::logger::DomainLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub level: ActivityLevel,
    pub message: String,
}

/// The user-visible activity log: the most recent `capacity` lines, oldest first.
/// Debug lines are not shown to users and are dropped.
pub struct ActivityLog {
    capacity: usize,
    entries: Mutex<VecDeque<ActivityEntry>>,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut e) = self.entries.lock() {
            e.clear();
        }
    }

    fn push(&self, level: ActivityLevel, msg: &str) {
        if let Ok(mut e) = self.entries.lock() {
            if e.len() == self.capacity {
                e.pop_front();
            }
            e.push_back(ActivityEntry {
                timestamp: Utc::now(),
                level,
                message: msg.to_string(),
            });
        }
    }
}

impl DomainLogger for ActivityLog {
    fn info(&self, msg: &str) {
        self.push(ActivityLevel::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(ActivityLevel::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(ActivityLevel::Error, msg);
    }
}
