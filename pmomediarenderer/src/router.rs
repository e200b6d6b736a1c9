//! Routage des évènements de changement vers les topics UPnP
//!
//! La playlist et le renderer signalent leurs changements à un
//! [`ChangeNotifier`] ; [`UpnpEventRouter`] les classe par topic et déclenche
//! l'envoi groupé sur le tick du renderer.
//!
//! | Évènement | Topics |
//! |---|---|
//! | playlist remplacée, contenu, état, pistes exposées | Playlist |
//! | changement de piste | Playlist, Info |
//! | position | Time |
//! | volume | Volume |
//! | tick (`Idle`) | envoi des évènements |

use parking_lot::RwLock;
use pmoplaylist::{ChangeEvent, ChangeNotifier};
use pmoupnp::events::{topics, UpnpEventManager};
use std::sync::{Arc, Weak};
use tracing::trace;

/// Topics incrémentés par un évènement
pub fn topics_for(event: ChangeEvent) -> &'static [&'static str] {
    match event {
        ChangeEvent::PlaylistChanged
        | ChangeEvent::PlaylistContentChanged
        | ChangeEvent::PlaylistTracksExposed
        | ChangeEvent::StateChanged => &[topics::PLAYLIST],
        ChangeEvent::TrackChanged => &[topics::PLAYLIST, topics::INFO],
        ChangeEvent::PositionChanged => &[topics::TIME],
        ChangeEvent::VolumeChanged => &[topics::VOLUME],
        ChangeEvent::Idle => &[],
    }
}

/// Aiguilleur des évènements de changement
///
/// Le gestionnaire est tenu en référence faible : il détient lui-même, via
/// ses handlers, la playlist qui notifie ce routeur.
#[derive(Default)]
pub struct UpnpEventRouter {
    events: RwLock<Weak<UpnpEventManager>>,
    listener: RwLock<Option<Arc<dyn ChangeNotifier>>>,
}

impl UpnpEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Branche le gestionnaire d'évènements
    pub fn attach(&self, events: &Arc<UpnpEventManager>) {
        *self.events.write() = Arc::downgrade(events);
    }

    /// Relaie aussi chaque évènement à `listener` (interface, journal, ...)
    pub fn set_listener(&self, listener: Arc<dyn ChangeNotifier>) {
        *self.listener.write() = Some(listener);
    }
}

impl ChangeNotifier for UpnpEventRouter {
    fn notify(&self, event: ChangeEvent) {
        let listener = self.listener.read().clone();
        if let Some(listener) = listener {
            listener.notify(event);
        }

        let Some(events) = self.events.read().upgrade() else {
            trace!(?event, "No event manager attached");
            return;
        };

        if event == ChangeEvent::Idle {
            events.send_events();
            return;
        }
        for topic in topics_for(event) {
            events.inc_update_count(topic);
        }
    }
}
