// Worker configuration knobs

/// Tuning knobs for the poll loop, leases and retention.
///
/// Must be in place before the poller starts; it is a constructor argument
/// of `UpdateService`, which enforces that ordering.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Poll period in milliseconds
    pub poll_ms: u64,
    /// Lease duration granted by each successful claim
    pub lease_seconds: i64,
    /// Hard ceiling on claim attempts per job
    pub max_attempts: i32,
    /// Jobs are deleted this many days after creation, regardless of status
    pub retention_days: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_ms: 1000,
            lease_seconds: 15,
            max_attempts: 5,
            retention_days: 7,
        }
    }
}

impl WorkerConfig {
    /// Faster polling and shorter leases for local development
    pub fn development() -> Self {
        Self {
            poll_ms: 250,
            lease_seconds: 5,
            ..Default::default()
        }
    }

    pub fn lease_ms(&self) -> i64 {
        self.lease_seconds * 1000
    }

    pub fn retention_ms(&self) -> i64 {
        self.retention_days * 24 * 60 * 60 * 1000
    }
}
