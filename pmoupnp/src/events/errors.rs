use thiserror::Error;

/// Erreurs de gestion des abonnements
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("No event handler for topic {0}")]
    UnknownTopic(String),

    #[error("Unknown subscription {0}")]
    UnknownSid(String),

    #[error("Invalid callback header: {0}")]
    BadCallback(String),
}
