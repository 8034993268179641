use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use case_core::CaseId;
use serde_json::Value;

/// A unit of work submitted to the dead-letter queue after exhausting all
/// retry attempts.
#[derive(Debug, Clone)]
pub struct DeadLetterJob {
    /// Logical queue this job belongs to (`"execution"` for proposal sends).
    pub queue_name: String,
    /// Stable identifier for the job within its queue — the `execution_key`
    /// for execution jobs.
    pub job_id: String,
    /// The case this job was acting on, if any.
    pub case_id: Option<CaseId>,
    /// Serialized payload of the job (the outbound message, in practice).
    pub job_data: Value,
}

/// An entry in the dead-letter queue representing a permanently failed job.
#[derive(Debug, Clone)]
pub struct DeadLetterEntry {
    pub queue_name: String,
    pub job_id: String,
    pub case_id: Option<CaseId>,
    pub job_data: Value,
    /// Human-readable description of the final error.
    pub error: String,
    /// Number of attempts made before the job was abandoned.
    pub attempt_count: u32,
    /// Wall-clock time at which the entry was created.
    pub timestamp: SystemTime,
    /// Set once an operator has investigated and resolved the entry.
    pub resolution: Option<String>,
}

/// Trait for dead-letter queue backends.
///
/// Implementations must be `Send + Sync` for use across async tasks.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Append a failed job to the dead-letter queue.
    async fn push(&self, job: DeadLetterJob, error: String, attempt_count: u32);

    /// Drain all entries from the queue, returning them.
    async fn drain(&self) -> Vec<DeadLetterEntry>;

    /// Return the number of entries in the queue.
    async fn len(&self) -> usize;

    /// Return true if the queue is empty.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// In-memory dead-letter queue for jobs that exhausted all retry attempts.
///
/// The DLQ is a simple append-only buffer guarded by a [`Mutex`]. The
/// Postgres-backed store persists the same shape to the `dead_letter_queue`
/// table; this implementation is suitable for tests and development.
///
/// # Thread safety
///
/// All methods acquire the internal lock for the minimum duration needed.
/// Because the lock is a standard `Mutex` (not `tokio::sync::Mutex`), callers
/// must not hold the lock across `.await` points. The public API ensures this
/// by never returning a guard.
pub struct DeadLetterQueue {
    entries: Mutex<Vec<DeadLetterEntry>>,
}

impl DeadLetterQueue {
    /// Create a new empty dead-letter queue.
    ///
    /// # Examples
    ///
    /// ```
    /// use case_executor::dlq::DeadLetterQueue;
    ///
    /// let dlq = DeadLetterQueue::new();
    /// assert!(dlq.is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Append a job to the dead-letter queue.
    ///
    /// The entry is timestamped with the current system time.
    pub fn push(&self, job: DeadLetterJob, error: String, attempt_count: u32) {
        let entry = DeadLetterEntry {
            queue_name: job.queue_name,
            job_id: job.job_id,
            case_id: job.case_id,
            job_data: job.job_data,
            error,
            attempt_count,
            timestamp: SystemTime::now(),
            resolution: None,
        };
        self.entries.lock().expect("dlq mutex poisoned").push(entry);
    }

    /// Drain all entries from the queue, returning them as a `Vec`.
    ///
    /// After this call the queue is empty.
    pub fn drain(&self) -> Vec<DeadLetterEntry> {
        let mut guard = self.entries.lock().expect("dlq mutex poisoned");
        std::mem::take(&mut *guard)
    }

    /// Return the number of entries currently in the queue.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("dlq mutex poisoned").len()
    }

    /// Return `true` if the queue contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone every entry currently in the queue without removing them, for
    /// read-only operator inspection (the DLQ HTTP endpoint).
    pub fn snapshot(&self) -> Vec<DeadLetterEntry> {
        self.entries.lock().expect("dlq mutex poisoned").clone()
    }
}

impl Default for DeadLetterQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeadLetterSink for DeadLetterQueue {
    async fn push(&self, job: DeadLetterJob, error: String, attempt_count: u32) {
        DeadLetterQueue::push(self, job, error, attempt_count);
    }

    async fn drain(&self) -> Vec<DeadLetterEntry> {
        DeadLetterQueue::drain(self)
    }

    async fn len(&self) -> usize {
        DeadLetterQueue::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_job() -> DeadLetterJob {
        DeadLetterJob {
            queue_name: "execution".into(),
            job_id: "exec-key-1".into(),
            case_id: Some(CaseId(1)),
            job_data: serde_json::json!({"action_type": "send_initial_request"}),
        }
    }

    #[test]
    fn new_queue_is_empty() {
        let dlq = DeadLetterQueue::new();
        assert!(dlq.is_empty());
        assert_eq!(dlq.len(), 0);
    }

    #[test]
    fn push_increments_len() {
        let dlq = DeadLetterQueue::new();
        dlq.push(test_job(), "err1".into(), 3);
        assert_eq!(dlq.len(), 1);
        dlq.push(test_job(), "err2".into(), 5);
        assert_eq!(dlq.len(), 2);
        assert!(!dlq.is_empty());
    }

    #[test]
    fn drain_returns_all_entries_and_empties_queue() {
        let dlq = DeadLetterQueue::new();
        dlq.push(test_job(), "e1".into(), 1);
        dlq.push(test_job(), "e2".into(), 2);
        dlq.push(test_job(), "e3".into(), 3);

        let entries = dlq.drain();
        assert_eq!(entries.len(), 3);
        assert!(dlq.is_empty());

        assert_eq!(entries[0].error, "e1");
        assert_eq!(entries[0].attempt_count, 1);
        assert_eq!(entries[1].error, "e2");
        assert_eq!(entries[2].error, "e3");
        assert_eq!(entries[2].attempt_count, 3);
        assert!(entries[0].resolution.is_none());
    }

    #[test]
    fn drain_on_empty_returns_empty_vec() {
        let dlq = DeadLetterQueue::new();
        let entries = dlq.drain();
        assert!(entries.is_empty());
    }

    #[test]
    fn entries_have_timestamps() {
        let before = SystemTime::now();
        let dlq = DeadLetterQueue::new();
        dlq.push(test_job(), "err".into(), 1);
        let after = SystemTime::now();

        let entries = dlq.drain();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].timestamp >= before);
        assert!(entries[0].timestamp <= after);
    }

    #[test]
    fn default_creates_empty_queue() {
        let dlq = DeadLetterQueue::default();
        assert!(dlq.is_empty());
    }

    #[allow(dead_code)]
    fn _assert_dyn_sink(_: &dyn DeadLetterSink) {}
}
