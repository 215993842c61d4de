use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Serializes multi-step metadata sequences across services.
///
/// Downloads, self-heals, record creation and sweep deletions hold the
/// exclusive side for their whole sequence; read-only lookups hold the shared
/// side. Cloning shares the same gate.
#[derive(Clone, Default, Debug)]
pub struct MutationGate {
    inner: Arc<RwLock<()>>,
}

impl MutationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.inner.write().await
    }

    pub async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.inner.read().await
    }
}
