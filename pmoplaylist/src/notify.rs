//! Interfaces de notification de la playlist courante
//!
//! La playlist ne connaît ni le protocole ni l'application : elle signale ses
//! changements à travers deux capacités.
//!
//! - [`ExposureNotifier`] : la couche d'exposition par abonné (exposers)
//! - [`ChangeNotifier`] : le routage des évènements (topics UPnP, interface)
//!
//! Les implémentations sont appelées alors que le verrou de la playlist est
//! tenu : elles ne doivent jamais tenter de le reprendre.

use crate::OpenId;

/// Évènements de changement émis par la playlist et le renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    /// La playlist associée a été remplacée
    PlaylistChanged,
    /// Insertion ou suppression de pistes
    PlaylistContentChanged,
    /// De nouvelles pistes ont été révélées à un abonné
    PlaylistTracksExposed,
    TrackChanged,
    StateChanged,
    PositionChanged,
    VolumeChanged,
    /// Tick périodique du renderer, déclenche l'envoi des évènements groupés
    Idle,
}

/// Réception des évènements de changement
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, event: ChangeEvent);
}

/// Couche d'exposition : pistes révélées à chaque abonné
pub trait ExposureNotifier: Send + Sync {
    /// Marque (ou démarque) une piste comme exposée pour tous les abonnés
    fn expose_track(&self, open_id: OpenId, exposed: bool);

    /// Oublie toute exposition, la génération de playlist change
    fn clear_all_exposers(&self);
}

/// Vue d'un abonné : une piste lui a-t-elle déjà été révélée ?
pub trait ExposureFilter {
    fn is_exposed(&self, open_id: OpenId) -> bool;
}

/// Implémentation vide des deux capacités
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn notify(&self, _event: ChangeEvent) {}
}

impl ExposureNotifier for NoopNotifier {
    fn expose_track(&self, _open_id: OpenId, _exposed: bool) {}

    fn clear_all_exposers(&self) {}
}

impl ExposureFilter for std::collections::HashSet<OpenId> {
    fn is_exposed(&self, open_id: OpenId) -> bool {
        self.contains(&open_id)
    }
}
