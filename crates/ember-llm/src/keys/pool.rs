use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ember_core::RequestContext;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{CredentialLease, KeyProvider};
use crate::error::LlmError;

/// Hands each member to at most one request at a time
///
/// Free members are kept in FIFO order; the semaphore holds one permit per
/// free member, so waiters are served in arrival order.
#[derive(Debug)]
pub struct PoolKeyProvider {
    members: Vec<Arc<KeyProvider>>,
    free: Arc<Mutex<VecDeque<usize>>>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

/// Keeps a pool member out of circulation until dropped
#[derive(Debug)]
pub(crate) struct PoolSlot {
    index: usize,
    free: Arc<Mutex<VecDeque<usize>>>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        // The index must be back in the free list before the permit is released
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(self.index);
    }
}

impl PoolKeyProvider {
    pub fn new(members: Vec<Arc<KeyProvider>>, timeout: Option<Duration>) -> Self {
        let free = (0..members.len()).collect();
        let permits = Arc::new(Semaphore::new(members.len()));

        Self {
            members,
            free: Arc::new(Mutex::new(free)),
            permits,
            timeout,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub(super) async fn acquire(&self, ctx: &RequestContext) -> Result<CredentialLease, LlmError> {
        if self.members.is_empty() {
            return Err(LlmError::NoCredential);
        }

        let permit = tokio::select! {
            () = ctx.cancellation.cancelled() => return Err(LlmError::Cancelled),
            permit = self.wait_for_permit() => permit?,
        };

        let index = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("key pool free list is out of sync with its permits"))?;

        let slot = PoolSlot {
            index,
            free: Arc::clone(&self.free),
            _permit: permit,
        };

        tracing::debug!(member = index, "leased key pool member");

        let mut lease = self.members[index].acquire(ctx).await?;
        lease.slots.push(slot);

        Ok(lease)
    }

    async fn wait_for_permit(&self) -> Result<OwnedSemaphorePermit, LlmError> {
        let acquire = Arc::clone(&self.permits).acquire_owned();

        let permit = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, acquire).await.map_err(|_| {
                tracing::warn!(timeout = ?limit, "timed out waiting for a free key pool member");
                LlmError::NoCredential
            })?,
            None => acquire.await,
        };

        permit.map_err(|_| LlmError::NoCredential)
    }
}
