use thiserror::Error;

/// Erreurs de construction d'une table d'actions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Missing handlers for actions: {}", .0.join(", "))]
    MissingHandlers(Vec<&'static str>),
}
