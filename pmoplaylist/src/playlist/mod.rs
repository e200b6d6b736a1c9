//! Playlists sources : la capacité commune et la playlist locale en mémoire

mod local;

pub use local::{LocalPlaylist, LocalPlaylistSource};

use crate::Track;

/// Capacité commune aux playlists que la playlist courante peut représenter
///
/// Les index sont 1-based ; 0 signifie « aucune piste courante ».
pub trait Playlist: Send {
    fn name(&self) -> &str;

    /// Identifiant numérique de la playlist
    fn id(&self) -> u32;

    fn num_tracks(&self) -> usize;

    fn current_index(&self) -> usize;

    fn shuffle(&self) -> bool {
        false
    }

    /// Requête d'origine pour une playlist générée dynamiquement
    fn query(&self) -> Option<&str> {
        None
    }

    fn is_dirty(&self) -> bool {
        false
    }

    /// Piste à l'index 1-based, `None` si la source ne peut pas la fournir
    fn track(&mut self, index: usize) -> Option<Track>;

    /// La playlist devient la source de la playlist courante
    fn start(&mut self) {}

    /// La playlist cesse d'être la source de la playlist courante
    fn stop(&mut self) {}
}
