//! Bounded buffer of structured runtime log entries.

use std::collections::VecDeque;

use parking_lot::Mutex;

use agentflow_protocols::{LogEntry, LogFilter};

/// Keeps the most recent `capacity` entries.
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Entries matching `filter`, oldest first.
    pub fn filtered(&self, filter: &LogFilter) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_protocols::LogLevel;

    #[test]
    fn test_capacity_drops_oldest() {
        let buffer = LogBuffer::new(2);
        for message in ["a", "b", "c"] {
            buffer.push(LogEntry::new(LogLevel::Info, message));
        }

        let messages: Vec<String> = buffer
            .filtered(&LogFilter::default())
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["b", "c"]);
    }

    #[test]
    fn test_filtered() {
        let buffer = LogBuffer::new(10);
        buffer.push(LogEntry::new(LogLevel::Info, "one").with_agent("dom"));
        buffer.push(LogEntry::new(LogLevel::Error, "two").with_agent("dom"));
        buffer.push(LogEntry::new(LogLevel::Error, "three").with_agent("form"));

        assert_eq!(buffer.filtered(&LogFilter::agent("dom")).len(), 2);
        assert_eq!(
            buffer
                .filtered(&LogFilter::agent("dom").with_level(LogLevel::Error))
                .len(),
            1
        );

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let buffer = LogBuffer::new(0);
        buffer.push(LogEntry::new(LogLevel::Info, "dropped"));
        assert_eq!(buffer.len(), 0);
    }
}
