//! Finished-job history.

use std::collections::VecDeque;

use reelflow_models::JobRecord;

/// Bounded, newest-first list of completed runs.
#[derive(Debug, Clone)]
pub struct JobHistory {
    records: VecDeque<JobRecord>,
    capacity: usize,
}

impl JobHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a record at the front, evicting the oldest beyond capacity.
    pub fn push(&mut self, record: JobRecord) {
        self.records.push_front(record);
        self.records.truncate(self.capacity);
    }

    pub fn records(&self) -> Vec<JobRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for JobHistory {
    fn default() -> Self {
        Self::new(20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_newest_first_and_bounded() {
        let mut history = JobHistory::default();
        for i in 0..25 {
            history.push(JobRecord::finished(format!("task-{}", i), Some(0), ""));
        }

        assert_eq!(history.len(), 20);
        let records = history.records();
        assert_eq!(records[0].name, "task-24");
        assert_eq!(records[19].name, "task-5");
    }

    #[test]
    fn test_history_keeps_duplicate_names() {
        let mut history = JobHistory::new(5);
        history.push(JobRecord::finished("Build", Some(1), "first"));
        history.push(JobRecord::finished("Build", Some(0), "second"));

        assert_eq!(history.len(), 2);
        assert_eq!(history.records()[0].output, "second");
    }

    #[test]
    fn test_clear() {
        let mut history = JobHistory::new(3);
        history.push(JobRecord::cancelled("Build", None, ""));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 3);
    }
}
