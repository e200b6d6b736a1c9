//! Exposers : ce que chaque control point abonné a déjà vu de la playlist
//!
//! Une grande playlist n'est pas révélée d'un coup. Chaque abonné au topic
//! "Playlist" possède un [`PlaylistExposer`] : l'ensemble des open_ids qui
//! lui ont été révélés et un [`Fetcher`] qui reprend l'exposition là où elle
//! s'est arrêtée. `IdArray` ne retourne que les pistes exposées.
//!
//! Le [`ExposerRegistry`] implémente [`ExposureNotifier`] : la playlist
//! courante y signale les insertions, suppressions et changements de
//! génération, qui sont répercutés sur tous les exposers.
//!
//! # Verrous
//!
//! L'état d'un exposer se prend toujours après celui de la playlist.

mod pool;

pub use pool::ExposurePool;

use parking_lot::{Mutex, MutexGuard, RwLock};
use pmoplaylist::{
    CurrentPlaylist, ExposureFilter, ExposureNotifier, FetchResult, Fetcher, OpenId,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// État d'exposition d'un abonné
#[derive(Debug)]
pub struct ExposerState {
    exposed: HashSet<OpenId>,
    fetcher: Fetcher,
    /// Génération de playlist (playlist_count_id) couverte par le fetcher
    generation: u32,
    /// content_change_id vu au dernier passage du fetcher
    change_id: u32,
}

impl Default for ExposerState {
    fn default() -> Self {
        Self {
            exposed: HashSet::new(),
            fetcher: Fetcher::new(false),
            generation: 0,
            change_id: 0,
        }
    }
}

impl ExposerState {
    fn set_exposed(&mut self, open_id: OpenId, exposed: bool) {
        if exposed {
            self.exposed.insert(open_id);
        } else {
            self.exposed.remove(&open_id);
        }
    }

    fn clear(&mut self) {
        self.exposed.clear();
        self.fetcher = Fetcher::new(false);
    }

    pub fn exposed(&self) -> &HashSet<OpenId> {
        &self.exposed
    }
}

impl ExposureFilter for ExposerState {
    fn is_exposed(&self, open_id: OpenId) -> bool {
        self.exposed.contains(&open_id)
    }
}

/// Pistes révélées à un abonné
#[derive(Debug)]
pub struct PlaylistExposer {
    key: String,
    state: Mutex<ExposerState>,
    busy: AtomicBool,
    /// SIDs des abonnements qui partagent cette clé
    sids: Mutex<HashSet<String>>,
}

impl PlaylistExposer {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: Mutex::new(ExposerState::default()),
            busy: AtomicBool::new(false),
            sids: Mutex::new(HashSet::new()),
        }
    }

    /// Clé de l'abonné (`"<adresse>:<user-agent>"`)
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn expose_track(&self, open_id: OpenId, exposed: bool) {
        self.state.lock().set_exposed(open_id, exposed);
    }

    /// Oublie tout ce qui a été révélé à l'abonné
    pub fn clear_exposed_bits(&self) {
        self.state.lock().clear();
        trace!(exposer = %self.key, "Exposed bits cleared");
    }

    pub fn is_exposed(&self, open_id: OpenId) -> bool {
        self.state.lock().is_exposed(open_id)
    }

    pub fn exposed_count(&self) -> usize {
        self.state.lock().exposed.len()
    }

    /// Nombre d'abonnements rattachés
    pub fn subscription_count(&self) -> usize {
        self.sids.lock().len()
    }

    /// Verrouille l'état ; à n'appeler qu'en tenant déjà la playlist
    pub fn lock_state(&self) -> MutexGuard<'_, ExposerState> {
        self.state.lock()
    }

    /// Révèle jusqu'à `count` nouvelles pistes de `playlist`
    ///
    /// Le fetcher repart de zéro quand la génération a changé et rejoue
    /// les pistes déjà produites quand le contenu a été modifié, les
    /// positions ayant pu glisser.
    pub fn expose_more(&self, playlist: &mut CurrentPlaylist, count: usize) -> FetchResult {
        let mut state = self.state.lock();

        if state.generation != playlist.playlist_count_id() {
            state.fetcher = Fetcher::new(false);
            state.generation = playlist.playlist_count_id();
            state.change_id = playlist.content_change_id();
        } else if state.change_id != playlist.content_change_id() {
            state.fetcher.invalidate();
            state.change_id = playlist.content_change_id();
        }

        let result = playlist.fetch_records(&mut state.fetcher, count);

        let ExposerState {
            exposed, fetcher, ..
        } = &mut *state;
        for record in fetcher.records() {
            exposed.extend(record.open_ids());
        }

        debug!(
            exposer = %self.key,
            exposed = exposed.len(),
            cursor = fetcher.cursor(),
            "Expose more: {:?}",
            result
        );
        result
    }

    /// Réserve l'exposer pour une tâche de fond ; `false` si une tâche est déjà en cours
    pub(crate) fn try_begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end(&self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Registre des exposers, indexé par clé d'abonné
#[derive(Debug, Default)]
pub struct ExposerRegistry {
    exposers: RwLock<HashMap<String, Arc<PlaylistExposer>>>,
}

impl ExposerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposer de l'abonné `key`, créé s'il n'existe pas
    ///
    /// Le booléen indique une création.
    pub fn get_or_create(&self, key: &str) -> (Arc<PlaylistExposer>, bool) {
        if let Some(exposer) = self.exposers.read().get(key) {
            return (exposer.clone(), false);
        }
        let mut exposers = self.exposers.write();
        match exposers.get(key) {
            Some(exposer) => (exposer.clone(), false),
            None => {
                let exposer = Arc::new(PlaylistExposer::new(key));
                exposers.insert(key.to_string(), exposer.clone());
                debug!(exposer = %key, "Exposer created");
                (exposer, true)
            }
        }
    }

    /// Rattache l'abonnement `sid` à l'exposer de `key`
    ///
    /// Un même control point peut tenir plusieurs abonnements : ils
    /// partagent l'exposer.
    pub fn attach(&self, key: &str, sid: &str) -> (Arc<PlaylistExposer>, bool) {
        let mut exposers = self.exposers.write();
        let mut created = false;
        let exposer = exposers
            .entry(key.to_string())
            .or_insert_with(|| {
                created = true;
                Arc::new(PlaylistExposer::new(key))
            })
            .clone();
        exposer.sids.lock().insert(sid.to_string());
        debug!(exposer = %key, sid, created, "Subscription attached");
        (exposer, created)
    }

    /// Détache l'abonnement `sid` ; l'exposer est retiré avec son dernier abonnement
    pub fn detach(&self, key: &str, sid: &str) -> Option<Arc<PlaylistExposer>> {
        let mut exposers = self.exposers.write();
        let remaining = {
            let exposer = exposers.get(key)?;
            let mut sids = exposer.sids.lock();
            sids.remove(sid);
            sids.len()
        };
        if remaining > 0 {
            debug!(exposer = %key, sid, remaining, "Subscription detached");
            return None;
        }
        let removed = exposers.remove(key);
        debug!(exposer = %key, sid, "Exposer removed");
        removed
    }

    pub fn get(&self, key: &str) -> Option<Arc<PlaylistExposer>> {
        self.exposers.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<Arc<PlaylistExposer>> {
        let removed = self.exposers.write().remove(key);
        if removed.is_some() {
            debug!(exposer = %key, "Exposer removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.exposers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.exposers.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.exposers.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ExposureNotifier for ExposerRegistry {
    fn expose_track(&self, open_id: OpenId, exposed: bool) {
        for exposer in self.exposers.read().values() {
            exposer.expose_track(open_id, exposed);
        }
    }

    fn clear_all_exposers(&self) {
        for exposer in self.exposers.read().values() {
            exposer.clear_exposed_bits();
        }
    }
}
