//! # Module Services - Services UPnP exposés par le serveur
//!
//! Un service a un nom court (segment de route et topic d'évènements), un
//! type URN et un point d'entrée unique pour ses actions. Les services
//! concrets délèguent à une [`ActionTable`](crate::actions::ActionTable).

use crate::actions::{ActionArgs, ActionResult, CallerIdentity};

/// Un service UPnP adressable par le serveur de contrôle
pub trait UpnpService: Send + Sync {
    /// Nom court du service ("Playlist", "AVTransport", ...)
    fn name(&self) -> &'static str;

    /// Type URN du service (ex: "urn:av-openhome-org:service:Playlist:1")
    fn service_type(&self) -> &'static str;

    /// Exécute une action ; `None` si le service ne la gère pas
    fn handle_action(
        &self,
        action: &str,
        args: &ActionArgs,
        caller: &CallerIdentity,
    ) -> Option<ActionResult>;
}
