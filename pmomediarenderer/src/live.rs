//! Playlist vivante partagée entre les services et le renderer
//!
//! [`PlaylistMutator`] est la seule porte d'accès des services à la playlist
//! courante. [`LivePlaylist`] l'implémente en plaçant la [`CurrentPlaylist`]
//! derrière un `Mutex` : chaque opération prend le verrou de la playlist,
//! puis éventuellement celui d'un exposer, jamais dans l'ordre inverse.

use crate::error::MutationError;
use crate::exposer::PlaylistExposer;
use parking_lot::Mutex;
use pmoplaylist::{
    CurrentPlaylist, FetchResult, LocalPlaylistSource, OpenId, PlaylistEntry, Track,
};
use std::sync::Arc;
use tracing::info;

/// Résultat d'une insertion
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    pub entry: PlaylistEntry,
    /// L'index courant a bougé (ou la playlist était vide)
    pub index_changed: bool,
}

/// Opérations des services sur la playlist courante
pub trait PlaylistMutator: Send + Sync {
    fn num_tracks(&self) -> usize;

    fn track_index(&self) -> usize;

    /// Jeton de polling de `IdArray`
    fn token(&self) -> u32;

    fn current_entry(&self) -> Option<PlaylistEntry>;

    fn track_by_open_id(&self, open_id: OpenId) -> Option<PlaylistEntry>;

    /// Insère après `after_id` (0 : en tête) si la playlist compte moins de `tracks_max` pistes
    fn insert_after(
        &self,
        after_id: OpenId,
        track: Track,
        tracks_max: usize,
    ) -> Result<InsertOutcome, MutationError>;

    fn remove_by_open_id(&self, open_id: OpenId) -> Result<PlaylistEntry, MutationError>;

    /// Remplace la playlist associée par la playlist locale `name` (vide si inconnue)
    fn select_playlist(&self, name: &str);

    fn seek_by_open_id(&self, open_id: OpenId) -> Option<PlaylistEntry>;

    fn seek_by_index(&self, index: usize) -> Option<PlaylistEntry>;

    fn inc_get_track(&self, delta: i64) -> Result<PlaylistEntry, MutationError>;

    /// `IdArray` encodé, restreint aux pistes révélées à `exposer`
    fn id_array_string(&self, exposer: Option<&PlaylistExposer>) -> String;

    fn track_list_xml(&self, ids: &[OpenId]) -> String;

    /// Révèle au plus `count` pistes supplémentaires à `exposer`
    fn expose_more(&self, exposer: &PlaylistExposer, count: usize) -> FetchResult;
}

/// La playlist courante verrouillée et les playlists locales
pub struct LivePlaylist {
    current: Mutex<CurrentPlaylist>,
    sources: Arc<LocalPlaylistSource>,
}

impl std::fmt::Debug for LivePlaylist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LivePlaylist")
            .field("current", &*self.current.lock())
            .finish()
    }
}

impl LivePlaylist {
    pub fn new(current: CurrentPlaylist, sources: Arc<LocalPlaylistSource>) -> Self {
        Self {
            current: Mutex::new(current),
            sources,
        }
    }

    pub fn sources(&self) -> &Arc<LocalPlaylistSource> {
        &self.sources
    }

    /// Exécute `f` sur la playlist verrouillée
    pub fn with_current<R>(&self, f: impl FnOnce(&mut CurrentPlaylist) -> R) -> R {
        f(&mut self.current.lock())
    }
}

impl PlaylistMutator for LivePlaylist {
    fn num_tracks(&self) -> usize {
        self.current.lock().num_tracks()
    }

    fn track_index(&self) -> usize {
        self.current.lock().track_index()
    }

    fn token(&self) -> u32 {
        self.current.lock().token()
    }

    fn current_entry(&self) -> Option<PlaylistEntry> {
        self.current.lock().current_entry()
    }

    fn track_by_open_id(&self, open_id: OpenId) -> Option<PlaylistEntry> {
        self.current.lock().track_by_open_id(open_id)
    }

    fn insert_after(
        &self,
        after_id: OpenId,
        track: Track,
        tracks_max: usize,
    ) -> Result<InsertOutcome, MutationError> {
        let mut current = self.current.lock();
        if current.num_tracks() >= tracks_max {
            return Err(MutationError::PlaylistFull { max: tracks_max });
        }
        let before = current.track_index();
        let entry = current.insert_after(after_id, track)?;
        Ok(InsertOutcome {
            index_changed: current.track_index() != before,
            entry,
        })
    }

    fn remove_by_open_id(&self, open_id: OpenId) -> Result<PlaylistEntry, MutationError> {
        Ok(self.current.lock().remove_by_open_id(open_id)?)
    }

    fn select_playlist(&self, name: &str) {
        let playlist = self.sources.open(name);
        info!(playlist = %name, "♻️ Selecting local playlist");
        self.current
            .lock()
            .set_associated_playlist(Box::new(playlist));
    }

    fn seek_by_open_id(&self, open_id: OpenId) -> Option<PlaylistEntry> {
        self.current.lock().seek_by_open_id(open_id)
    }

    fn seek_by_index(&self, index: usize) -> Option<PlaylistEntry> {
        self.current.lock().seek_by_index(index)
    }

    fn inc_get_track(&self, delta: i64) -> Result<PlaylistEntry, MutationError> {
        Ok(self.current.lock().inc_get_track(delta)?)
    }

    fn id_array_string(&self, exposer: Option<&PlaylistExposer>) -> String {
        let mut current = self.current.lock();
        match exposer {
            Some(exposer) => {
                let state = exposer.lock_state();
                current.id_array_string(Some(&*state))
            }
            None => current.id_array_string(None),
        }
    }

    fn track_list_xml(&self, ids: &[OpenId]) -> String {
        self.current.lock().track_list_xml(ids)
    }

    fn expose_more(&self, exposer: &PlaylistExposer, count: usize) -> FetchResult {
        let mut current = self.current.lock();
        exposer.expose_more(&mut current, count)
    }
}
