//! # pmoupnp - Couche protocolaire UPnP du renderer
//!
//! - [`soap`] : lecture des actions SOAP, réponses et faults `UPnPError`
//! - [`actions`] : dispatch statique action → handler, arguments typés
//! - [`events`] : compteurs par topic, abonnés GENA, envoi groupé
//! - [`services`] : capacité commune des services exposés
//! - [`server`] : routes axum de contrôle et d'abonnement

pub mod actions;
pub mod config_ext;
pub mod events;
pub mod server;
pub mod services;
pub mod soap;

pub use crate::actions::{
    ActionArgs, ActionFault, ActionResponse, ActionResult, ActionTable, CallerIdentity, UpnpAction,
};
pub use crate::config_ext::UpnpConfigExt;
pub use crate::events::{
    EventSink, GenaEventSink, MemoryEventSink, Subscriber, UpdateCounter, UpnpEventHandler,
    UpnpEventManager,
};
pub use crate::server::upnp_router;
pub use crate::services::UpnpService;
