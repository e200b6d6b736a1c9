//! Renderer logiciel simulé
//!
//! `SoftRenderer` ne produit aucun son : il tient l'état de transport et fait
//! avancer la position à chaque [`SoftRenderer::tick`]. En fin de piste il
//! passe à la suivante (ou s'arrête en fin de playlist sans repeat). Chaque
//! tick se termine par [`ChangeEvent::Idle`] : c'est lui qui déclenche
//! l'envoi des évènements UPnP groupés.
//!
//! Le verrou d'état du renderer n'est jamais tenu pendant un accès à la
//! playlist ni pendant une notification.

use crate::live::PlaylistMutator;
use crate::renderer::{Renderer, TransportState};
use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use pmoplaylist::{ChangeEvent, ChangeNotifier, PlaylistEntry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct SoftState {
    current: Option<PlaylistEntry>,
    state: TransportState,
    position_ms: u64,
    shuffle: bool,
    repeat: bool,
}

/// Ce qu'un tick a constaté, traité hors verrou
enum TickOutcome {
    Idle,
    Advanced,
    EndOfTrack { entry: PlaylistEntry, repeat: bool },
}

/// Renderer simulé piloté par un tick périodique
pub struct SoftRenderer {
    playlist: Arc<dyn PlaylistMutator>,
    changes: Arc<dyn ChangeNotifier>,
    state: Mutex<SoftState>,
}

impl std::fmt::Debug for SoftRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftRenderer")
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl SoftRenderer {
    pub fn new(playlist: Arc<dyn PlaylistMutator>, changes: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            playlist,
            changes,
            state: Mutex::new(SoftState::default()),
        }
    }

    /// Change l'état de transport ; notifie si l'état a changé
    fn set_state(&self, state: TransportState) {
        let changed = {
            let mut s = self.state.lock();
            let changed = s.state != state;
            s.state = state;
            if state == TransportState::Stopped {
                s.position_ms = 0;
            }
            changed
        };
        if changed {
            debug!(state = %state, "Transport state changed");
            self.changes.notify(ChangeEvent::StateChanged);
        }
    }

    /// Fait avancer la lecture de `elapsed`
    pub fn tick(&self, elapsed: Duration) {
        let outcome = {
            let mut s = self.state.lock();
            match (&s.current, s.state) {
                (Some(entry), TransportState::Playing) => {
                    let duration = entry.track.duration_ms();
                    let entry = entry.clone();
                    s.position_ms += elapsed.as_millis() as u64;
                    if duration > 0 && s.position_ms >= duration {
                        s.position_ms = duration;
                        TickOutcome::EndOfTrack {
                            entry,
                            repeat: s.repeat,
                        }
                    } else {
                        TickOutcome::Advanced
                    }
                }
                _ => TickOutcome::Idle,
            }
        };

        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Advanced => self.changes.notify(ChangeEvent::PositionChanged),
            TickOutcome::EndOfTrack { entry, repeat } => {
                self.changes.notify(ChangeEvent::PositionChanged);
                self.end_of_track(&entry, repeat);
            }
        }

        self.changes.notify(ChangeEvent::Idle);
    }

    fn end_of_track(&self, entry: &PlaylistEntry, repeat: bool) {
        let in_playlist = entry.open_id != 0;
        let last = entry.position >= self.playlist.num_tracks();

        if in_playlist && (repeat || !last) {
            if let Err(e) = self.inc_and_play(1) {
                info!("⏹️ End of playlist: {}", e);
                self.set_state(TransportState::Stopped);
            }
        } else {
            info!(uri = %entry.track.uri(), "⏹️ End of track, stopping");
            self.set_state(TransportState::Stopped);
        }
    }
}

impl Renderer for SoftRenderer {
    fn play(&self) -> Result<()> {
        let cached = self.state.lock().current.clone();
        // Une piste de playlist supprimée ou d'une génération précédente est rechargée
        let stale = match &cached {
            None => true,
            Some(entry) => {
                entry.open_id != 0 && self.playlist.track_by_open_id(entry.open_id).is_none()
            }
        };
        if stale {
            let entry = self.playlist.current_entry();
            {
                let mut s = self.state.lock();
                s.current = entry.clone();
                s.position_ms = 0;
            }
            if entry.is_none() {
                self.set_state(TransportState::Stopped);
                return Err(anyhow!("nothing to play"));
            }
        }
        self.set_state(TransportState::Playing);
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        let playing = self.state.lock().state == TransportState::Playing;
        if playing {
            self.set_state(TransportState::Paused);
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.set_state(TransportState::Stopped);
        Ok(())
    }

    fn seek_to(&self, position_ms: u64) -> Result<()> {
        {
            let mut s = self.state.lock();
            let duration = s
                .current
                .as_ref()
                .map(|e| e.track.duration_ms())
                .ok_or_else(|| anyhow!("no current track"))?;
            s.position_ms = if duration > 0 {
                position_ms.min(duration)
            } else {
                position_ms
            };
        }
        self.changes.notify(ChangeEvent::PositionChanged);
        Ok(())
    }

    fn set_track(&self, entry: PlaylistEntry) -> Result<()> {
        debug!(open_id = entry.open_id, uri = %entry.track.uri(), "Track loaded");
        let mut s = self.state.lock();
        s.current = Some(entry);
        s.position_ms = 0;
        Ok(())
    }

    fn clear_track(&self) -> Result<()> {
        {
            let mut s = self.state.lock();
            s.current = None;
            s.position_ms = 0;
        }
        debug!("Track unloaded");
        self.set_state(TransportState::Stopped);
        Ok(())
    }

    fn inc_and_play(&self, delta: i64) -> Result<()> {
        let entry = self.playlist.inc_get_track(delta)?;
        info!(open_id = entry.open_id, position = entry.position, "▶️ Now playing {}", entry.track.uri());
        self.set_track(entry)?;
        self.changes.notify(ChangeEvent::TrackChanged);
        self.set_state(TransportState::Playing);
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.state.lock().position_ms
    }

    fn current_track(&self) -> Option<PlaylistEntry> {
        self.state.lock().current.clone()
    }

    fn shuffle(&self) -> bool {
        self.state.lock().shuffle
    }

    fn set_shuffle(&self, shuffle: bool) -> Result<()> {
        self.state.lock().shuffle = shuffle;
        Ok(())
    }

    fn repeat(&self) -> bool {
        self.state.lock().repeat
    }

    fn set_repeat(&self, repeat: bool) -> Result<()> {
        self.state.lock().repeat = repeat;
        Ok(())
    }

    fn state(&self) -> TransportState {
        self.state.lock().state
    }
}
