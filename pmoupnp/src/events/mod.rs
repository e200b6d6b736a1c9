//! # Module Events - Évènements GENA groupés par topic
//!
//! Les sites de mutation ne font qu'incrémenter le compteur d'un topic
//! ("Playlist", "Info", "Time", "Volume", ...). L'envoi réel des
//! notifications a lieu plus tard, sur un déclencheur périodique externe
//! (le tick du renderer), via [`UpnpEventManager::send_events`] : seuls les
//! topics dont le compteur a bougé depuis le dernier envoi sont notifiés.
//!
//! Sans renderer actif pour appeler `send_events`, aucun évènement n'est
//! jamais envoyé, quel que soit le topic.
//!
//! ## Architecture
//!
//! - [`UpdateCounter`] : compteur de modifications d'un topic
//! - [`UpnpEventHandler`] : ce qu'un service fournit pour son topic
//! - [`Subscriber`] : un abonnement GENA (SID, callback, SEQ, expiration)
//! - [`EventSink`] : la livraison (HTTP `NOTIFY` avec [`GenaEventSink`],
//!   mémoire avec [`MemoryEventSink`])

mod counter;
mod errors;
mod manager;
mod propertyset;
mod sink;
mod subscriber;

pub use counter::UpdateCounter;
pub use errors::EventError;
pub use manager::{
    DEFAULT_DEFER_PERIOD, DEFAULT_SUBSCRIPTION_TIMEOUT, UpnpEventHandler, UpnpEventManager,
};
pub use propertyset::build_propertyset;
pub use sink::{EventNotification, EventSink, GenaEventSink, MemoryEventSink};
pub use subscriber::{Subscriber, parse_callback, parse_timeout};

/// Topics d'évènements connus du renderer
pub mod topics {
    pub const PLAYLIST: &str = "Playlist";
    pub const INFO: &str = "Info";
    pub const TIME: &str = "Time";
    pub const VOLUME: &str = "Volume";
    pub const AV_TRANSPORT: &str = "AVTransport";
}
