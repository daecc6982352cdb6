use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::Error;

/// Admission control for in-flight pipelines.
///
/// A counting semaphore with a fixed capacity. Each dispatched pipeline holds
/// one [`GatePermit`] for its whole lifetime and the slot is handed back when
/// the permit is dropped, on every exit path.
#[derive(Debug, Clone)]
pub struct Gate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl Gate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Builds a gate from a configured value, correcting anything below 1.
    pub fn with_requested(requested: i64) -> Self {
        if requested < 1 {
            tracing::warn!(
                requested,
                "max concurrent downloads must be at least 1, using 1"
            );
            return Self::new(1);
        }
        Self::new(usize::try_from(requested).unwrap_or(Semaphore::MAX_PERMITS))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Waits until a slot is free and takes it.
    pub async fn acquire(&self) -> Result<GatePermit, Error> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Internal("concurrency gate closed".into()))?;
        Ok(GatePermit { _permit: permit })
    }
}

/// A held gate slot.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}
