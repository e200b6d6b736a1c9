//! Types d'erreurs pour pmomediarenderer

use pmoplaylist::PlaylistError;
use pmoupnp::actions::{ActionError, ActionFault};
use thiserror::Error;

/// Erreurs d'assemblage du renderer
#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Invalid action table for {service}: {source}")]
    Actions {
        service: &'static str,
        #[source]
        source: ActionError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RendererError>;

/// Échec d'une mutation de la playlist vivante
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Playlist full ({max} tracks)")]
    PlaylistFull { max: usize },

    #[error(transparent)]
    Playlist(#[from] PlaylistError),
}

impl From<MutationError> for ActionFault {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::PlaylistFull { .. } => ActionFault::playlist_full(),
            MutationError::Playlist(PlaylistError::ItemNotFound(id)) => {
                ActionFault::item_not_found(id)
            }
            MutationError::Playlist(e) => ActionFault::action_failed(e),
        }
    }
}

/// Fault 501 pour un échec du moteur de lecture
pub(crate) fn renderer_fault(err: anyhow::Error) -> ActionFault {
    tracing::warn!("❌ Renderer command failed: {:#}", err);
    ActionFault::action_failed(err)
}
