// src/common/locks.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

// Um lock assíncrono por envelope. Serializa o "conta e insere" dos signatários
// dentro deste processo; entre processos quem garante é a constraint única do banco.
#[derive(Clone, Default)]
pub struct EnvelopeLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl EnvelopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, envelope_id: Uuid) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Remove entradas que ninguém mais segura
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(envelope_id).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Trava dois envelopes sempre na mesma ordem (evita deadlock na troca de envelope).
    pub async fn lock_pair(&self, a: Uuid, b: Uuid) -> Vec<OwnedMutexGuard<()>> {
        if a == b {
            return vec![self.lock(a).await];
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let g1 = self.lock(first).await;
        let g2 = self.lock(second).await;
        vec![g1, g2]
    }
}
