//! Faults UPnP retournés par les handlers d'actions

use crate::soap::error_codes;
use std::fmt::Display;
use thiserror::Error;

/// Fault protocolaire : code UPnP et description lisible
///
/// Un fault est une valeur de retour ordinaire ; la route de contrôle le
/// transforme en SOAP Fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("UPnP fault {code}: {description}")]
pub struct ActionFault {
    pub code: u16,
    pub description: String,
}

/// Résultat d'un handler d'action
pub type ActionResult = Result<super::ActionResponse, ActionFault>;

impl ActionFault {
    pub fn new(code: u16, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    /// 800 : identifiant, position ou point d'insertion inconnu
    pub fn item_not_found(item: impl Display) -> Self {
        Self::new(
            error_codes::ITEM_NOT_FOUND,
            format!("ERROR 800 - item({}) not found", item),
        )
    }

    /// 801 : la playlist a atteint sa capacité maximale
    pub fn playlist_full() -> Self {
        Self::new(error_codes::PLAYLIST_FULL, "ERROR 801 - Playlist Full")
    }

    /// 402 : argument absent ou mal formé
    pub fn invalid_args(detail: impl Display) -> Self {
        Self::new(error_codes::INVALID_ARGS, format!("Invalid Args: {}", detail))
    }

    /// 401 : action inconnue du service
    pub fn invalid_action() -> Self {
        Self::new(error_codes::INVALID_ACTION, "Invalid Action")
    }

    /// 501 : l'action n'a pas pu aboutir
    pub fn action_failed(detail: impl Display) -> Self {
        Self::new(error_codes::ACTION_FAILED, format!("Action Failed: {}", detail))
    }

    /// 710 : unité de seek non supportée
    pub fn seek_mode_not_supported(unit: impl Display) -> Self {
        Self::new(
            error_codes::SEEK_MODE_NOT_SUPPORTED,
            format!("Seek mode not supported: {}", unit),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_descriptions() {
        let fault = ActionFault::item_not_found(17);
        assert_eq!(fault.code, 800);
        assert_eq!(fault.description, "ERROR 800 - item(17) not found");

        let fault = ActionFault::playlist_full();
        assert_eq!(fault.code, 801);
        assert_eq!(fault.description, "ERROR 801 - Playlist Full");

        assert_eq!(ActionFault::invalid_args("Id").code, 402);
        assert_eq!(ActionFault::invalid_action().to_string(), "UPnP fault 401: Invalid Action");
    }
}
