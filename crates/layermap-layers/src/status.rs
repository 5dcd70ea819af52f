//! User-visible status panel.

use chrono::{DateTime, Utc};
use layermap_core::models::DatasetId;
use serde::Serialize;
use std::collections::VecDeque;

/// Messages kept before the oldest are dropped
pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub dataset: Option<DatasetId>,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Bounded, oldest-first message log
#[derive(Debug, Clone)]
pub struct StatusLog {
    messages: VecDeque<StatusMessage>,
    capacity: usize,
}

impl StatusLog {
    pub fn new(capacity: usize) -> Self {
        Self { messages: VecDeque::new(), capacity: capacity.max(1) }
    }

    pub fn push(&mut self, level: StatusLevel, dataset: Option<&DatasetId>, text: impl Into<String>) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(StatusMessage {
            level,
            dataset: dataset.cloned(),
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub fn info(&mut self, dataset: &DatasetId, text: impl Into<String>) {
        self.push(StatusLevel::Info, Some(dataset), text);
    }

    pub fn warning(&mut self, dataset: &DatasetId, text: impl Into<String>) {
        self.push(StatusLevel::Warning, Some(dataset), text);
    }

    pub fn error(&mut self, dataset: &DatasetId, text: impl Into<String>) {
        self.push(StatusLevel::Error, Some(dataset), text);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusMessage> {
        self.messages.iter()
    }

    pub fn latest(&self) -> Option<&StatusMessage> {
        self.messages.back()
    }

    /// Messages about one dataset, oldest first
    pub fn for_dataset<'a>(
        &'a self,
        dataset: &'a DatasetId,
    ) -> impl Iterator<Item = &'a StatusMessage> + 'a {
        self.messages.iter().filter(move |m| m.dataset.as_ref() == Some(dataset))
    }

    pub fn errors(&self) -> impl Iterator<Item = &StatusMessage> {
        self.messages.iter().filter(|m| m.level == StatusLevel::Error)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
