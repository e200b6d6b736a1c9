//! Exposition de fond, bornée
//!
//! `ReadList` ne doit pas attendre qu'une grande playlist soit révélée :
//! l'exposition est confiée à des tâches tokio, au plus `workers` à la fois
//! et une seule par exposer. Chaque tâche passe par le
//! [`PlaylistMutator`](crate::PlaylistMutator), donc par le verrou de la
//! playlist.

use super::PlaylistExposer;
use crate::live::PlaylistMutator;
use pmoplaylist::{ChangeEvent, ChangeNotifier, FetchResult};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// File d'exposition partagée par tous les exposers
#[derive(Clone)]
pub struct ExposurePool {
    playlist: Arc<dyn PlaylistMutator>,
    changes: Arc<dyn ChangeNotifier>,
    permits: Arc<Semaphore>,
    batch_size: usize,
}

impl std::fmt::Debug for ExposurePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposurePool")
            .field("available", &self.permits.available_permits())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl ExposurePool {
    pub fn new(
        playlist: Arc<dyn PlaylistMutator>,
        changes: Arc<dyn ChangeNotifier>,
        workers: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            playlist,
            changes,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Planifie l'exposition d'un lot de pistes pour `exposer`
    ///
    /// Sans runtime tokio, le lot est exposé immédiatement dans l'appelant.
    /// Une demande pour un exposer déjà occupé est ignorée.
    pub fn schedule(&self, exposer: Arc<PlaylistExposer>) {
        if !exposer.try_begin() {
            debug!(exposer = %exposer.key(), "Exposure already in progress");
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let pool = self.clone();
                runtime.spawn(async move {
                    match pool.permits.clone().acquire_owned().await {
                        Ok(_permit) => {
                            pool.run(&exposer);
                        }
                        Err(e) => warn!("Exposure pool closed: {}", e),
                    }
                    exposer.end();
                });
            }
            Err(_) => {
                self.run(&exposer);
                exposer.end();
            }
        }
    }

    /// Expose un lot ; retourne l'issue du fetch
    pub fn run(&self, exposer: &PlaylistExposer) -> FetchResult {
        let result = self.playlist.expose_more(exposer, self.batch_size);
        match &result {
            FetchResult::Records(n) => {
                debug!(exposer = %exposer.key(), tracks = n, "Tracks exposed");
                self.changes.notify(ChangeEvent::PlaylistTracksExposed);
            }
            FetchResult::Error(e) => {
                warn!(exposer = %exposer.key(), "❌ Exposure failed: {}", e);
            }
            FetchResult::Done | FetchResult::NoRecords => {}
        }
        result
    }
}
