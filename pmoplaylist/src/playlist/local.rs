use super::Playlist;
use crate::Track;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Playlist locale en mémoire
#[derive(Debug, Clone)]
pub struct LocalPlaylist {
    id: u32,
    name: String,
    tracks: Vec<Track>,
    index: usize,
    shuffle: bool,
    running: bool,
}

impl LocalPlaylist {
    pub fn new(id: u32, name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let index = if tracks.is_empty() { 0 } else { 1 };
        Self {
            id,
            name: name.into(),
            tracks,
            index,
            shuffle: false,
            running: false,
        }
    }

    /// Fixe la piste courante (1-based)
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index.min(self.tracks.len());
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Playlist for LocalPlaylist {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> u32 {
        self.id
    }

    fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    fn current_index(&self) -> usize {
        self.index
    }

    fn shuffle(&self) -> bool {
        self.shuffle
    }

    fn track(&mut self, index: usize) -> Option<Track> {
        index.checked_sub(1).and_then(|i| self.tracks.get(i)).cloned()
    }

    fn start(&mut self) {
        debug!(playlist = %self.name, "Local playlist started");
        self.running = true;
    }

    fn stop(&mut self) {
        debug!(playlist = %self.name, "Local playlist stopped");
        self.running = false;
    }
}

/// Registre des playlists locales nommées
///
/// Chaque ouverture produit une copie indépendante : les modifications de la
/// playlist courante ne sont pas réécrites dans le registre.
#[derive(Debug, Default)]
pub struct LocalPlaylistSource {
    playlists: RwLock<HashMap<String, Arc<Vec<Track>>>>,
    next_id: AtomicU32,
}

impl LocalPlaylistSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre (ou remplace) une playlist nommée
    pub fn save(&self, name: impl Into<String>, tracks: Vec<Track>) {
        let name = name.into();
        info!(playlist = %name, tracks = tracks.len(), "✅ Local playlist saved");
        self.playlists.write().insert(name, Arc::new(tracks));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.playlists.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.playlists.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Ouvre une playlist ; un nom vide ou inconnu donne une playlist vide
    pub fn open(&self, name: &str) -> LocalPlaylist {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let tracks = match self.playlists.read().get(name) {
            Some(tracks) => tracks.as_ref().clone(),
            None => {
                if !name.is_empty() {
                    debug!(playlist = %name, "Unknown local playlist, opening an empty one");
                }
                Vec::new()
            }
        };
        LocalPlaylist::new(id, name, tracks)
    }
}
