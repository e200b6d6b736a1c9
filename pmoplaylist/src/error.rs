//! Types d'erreurs pour pmoplaylist

use crate::OpenId;

/// Erreurs de manipulation de la playlist courante
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaylistError {
    /// Un open_id (ou after_id) ne correspond à aucune piste
    #[error("item({0}) not found")]
    ItemNotFound(OpenId),

    #[error("position {position} out of range (1..={max})")]
    PositionOutOfRange { position: usize, max: usize },

    #[error("No playable tracks found")]
    NoPlayableTracks,

    /// La source associée n'a pas pu fournir la piste attendue
    #[error("missing track at position {0}")]
    MissingTrack(usize),
}

/// Type Result spécialisé pour pmoplaylist
pub type Result<T> = std::result::Result<T, PlaylistError>;
