//! # Module SOAP - Simple Object Access Protocol
//!
//! Ce module implémente le support SOAP pour UPnP : lecture des actions
//! reçues par les routes de contrôle et construction des réponses et des
//! faults.
//!
//! ## Fonctionnalités
//!
//! - ✅ Parsing d'enveloppes SOAP
//! - ✅ Extraction d'actions UPnP avec arguments
//! - ✅ Construction de réponses SOAP
//! - ✅ Gestion des SOAP Faults (`UPnPError`)
//!
//! ## Example
//!
//! ```
//! use pmoupnp::soap::{build_soap_response, parse_soap_action};
//!
//! let body = r#"<?xml version="1.0"?>
//! <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
//!   <s:Body>
//!     <u:SeekId xmlns:u="urn:av-openhome-org:service:Playlist:1">
//!       <Value>12</Value>
//!     </u:SeekId>
//!   </s:Body>
//! </s:Envelope>"#;
//!
//! let action = parse_soap_action(body.as_bytes()).unwrap();
//! assert_eq!(action.name, "SeekId");
//! assert_eq!(action.args.get("Value"), Some(&"12".to_string()));
//!
//! let response = build_soap_response(
//!     "urn:av-openhome-org:service:Playlist:1",
//!     "Id",
//!     vec![("Value".to_string(), "12".to_string())],
//! )
//! .unwrap();
//! assert!(response.contains("<u:IdResponse"));
//! ```

mod builder;
mod fault;
mod parser;

pub use builder::build_soap_response;
pub(crate) use builder::element_to_string;
pub use fault::{build_soap_fault, build_upnp_fault};
pub use parser::{SoapAction, SoapParseError, parse_soap_action};

/// Codes d'erreur SOAP UPnP
pub mod error_codes {
    /// Action invalide
    pub const INVALID_ACTION: u16 = 401;

    /// Arguments invalides
    pub const INVALID_ARGS: u16 = 402;

    /// Action échouée
    pub const ACTION_FAILED: u16 = 501;

    /// Argument invalide
    pub const ARGUMENT_VALUE_INVALID: u16 = 600;

    /// Argument hors limites
    pub const ARGUMENT_VALUE_OUT_OF_RANGE: u16 = 601;

    /// Mode de seek non supporté (AVTransport)
    pub const SEEK_MODE_NOT_SUPPORTED: u16 = 710;

    /// Identifiant de piste, de position ou d'insertion inconnu (OpenHome)
    pub const ITEM_NOT_FOUND: u16 = 800;

    /// Capacité maximale de la playlist atteinte (OpenHome)
    pub const PLAYLIST_FULL: u16 = 801;
}
