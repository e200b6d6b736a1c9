//! Capacité de lecture consommée par les services du renderer
//!
//! Les services OpenHome et AVTransport ne connaissent pas le moteur audio :
//! ils pilotent un [`Renderer`] (lecture, pause, seek, piste courante, modes
//! shuffle/repeat) et lisent son état de transport.

use anyhow::Result;
use pmoplaylist::PlaylistEntry;
use std::fmt;

/// État de transport d'un renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
    Transitioning,
    NoMedia,
}

impl TransportState {
    /// Convertit un état UPnP AVTransport en [`TransportState`]
    pub fn from_upnp_state(state: &str) -> Self {
        match state.trim().to_ascii_uppercase().as_str() {
            "PLAYING" => TransportState::Playing,
            "PAUSED_PLAYBACK" | "PAUSED" => TransportState::Paused,
            "TRANSITIONING" => TransportState::Transitioning,
            "NO_MEDIA_PRESENT" => TransportState::NoMedia,
            _ => TransportState::Stopped,
        }
    }

    /// Valeur de `CurrentTransportState` (DLNA)
    pub fn as_upnp_str(&self) -> &'static str {
        match self {
            TransportState::Stopped => "STOPPED",
            TransportState::Playing => "PLAYING",
            TransportState::Paused => "PAUSED_PLAYBACK",
            TransportState::Transitioning => "TRANSITIONING",
            TransportState::NoMedia => "NO_MEDIA_PRESENT",
        }
    }

    /// Valeur de `TransportState` côté OpenHome
    pub fn as_openhome_str(&self) -> &'static str {
        match self {
            TransportState::Playing => "Playing",
            TransportState::Paused => "Paused",
            TransportState::Transitioning => "Buffering",
            TransportState::Stopped | TransportState::NoMedia => "Stopped",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_upnp_str())
    }
}

/// Mode de lecture AVTransport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    #[default]
    Normal,
    Shuffle,
    RepeatAll,
    RepeatOne,
}

impl PlayMode {
    pub fn from_upnp(mode: &str) -> Option<Self> {
        match mode.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Some(PlayMode::Normal),
            "SHUFFLE" | "RANDOM" => Some(PlayMode::Shuffle),
            "REPEAT_ALL" => Some(PlayMode::RepeatAll),
            "REPEAT_ONE" => Some(PlayMode::RepeatOne),
            _ => None,
        }
    }

    pub fn as_upnp_str(&self) -> &'static str {
        match self {
            PlayMode::Normal => "NORMAL",
            PlayMode::Shuffle => "SHUFFLE",
            PlayMode::RepeatAll => "REPEAT_ALL",
            PlayMode::RepeatOne => "REPEAT_ONE",
        }
    }

    /// Mode équivalent aux drapeaux OpenHome
    pub fn from_flags(shuffle: bool, repeat: bool) -> Self {
        match (shuffle, repeat) {
            (true, _) => PlayMode::Shuffle,
            (false, true) => PlayMode::RepeatAll,
            (false, false) => PlayMode::Normal,
        }
    }

    /// Drapeaux `(shuffle, repeat)` correspondant au mode
    pub fn flags(&self) -> (bool, bool) {
        match self {
            PlayMode::Normal => (false, false),
            PlayMode::Shuffle => (true, false),
            PlayMode::RepeatAll | PlayMode::RepeatOne => (false, true),
        }
    }
}

/// Moteur de lecture piloté par les services
///
/// Les méthodes ne doivent pas être appelées en tenant le verrou de la
/// playlist : une implémentation peut elle-même naviguer dans la playlist
/// (voir [`Renderer::inc_and_play`]).
pub trait Renderer: Send + Sync {
    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn stop(&self) -> Result<()>;

    /// Positionne la lecture à `position_ms` dans la piste courante
    fn seek_to(&self, position_ms: u64) -> Result<()>;

    /// Charge une piste ; `open_id` vaut 0 pour une piste hors playlist
    fn set_track(&self, entry: PlaylistEntry) -> Result<()>;

    /// Oublie la piste courante et arrête la lecture
    fn clear_track(&self) -> Result<()>;

    /// Avance (ou recule) de `delta` pistes dans la playlist et lance la lecture
    fn inc_and_play(&self, delta: i64) -> Result<()>;

    /// Position dans la piste courante, en millisecondes
    fn position_ms(&self) -> u64;

    fn current_track(&self) -> Option<PlaylistEntry>;

    fn shuffle(&self) -> bool;

    fn set_shuffle(&self, shuffle: bool) -> Result<()>;

    fn repeat(&self) -> bool;

    fn set_repeat(&self, repeat: bool) -> Result<()>;

    fn state(&self) -> TransportState;

    /// `CurrentTransportStatus` AVTransport
    fn transport_status(&self) -> &'static str {
        "OK"
    }

    /// `CurrentSpeed` AVTransport
    fn play_speed(&self) -> &'static str {
        "1"
    }

    fn play_mode(&self) -> PlayMode {
        PlayMode::from_flags(self.shuffle(), self.repeat())
    }

    /// Charge puis lance une piste
    fn play_entry(&self, entry: PlaylistEntry) -> Result<()> {
        self.set_track(entry)?;
        self.play()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openhome_state_mapping() {
        let cases = [
            ("STOPPED", "Stopped"),
            ("PLAYING", "Playing"),
            ("PAUSED_PLAYBACK", "Paused"),
            ("TRANSITIONING", "Buffering"),
            ("NO_MEDIA_PRESENT", "Stopped"),
            ("garbage", "Stopped"),
        ];
        for (upnp, openhome) in cases {
            assert_eq!(TransportState::from_upnp_state(upnp).as_openhome_str(), openhome);
        }
    }

    #[test]
    fn test_upnp_state_roundtrip() {
        for state in [
            TransportState::Stopped,
            TransportState::Playing,
            TransportState::Paused,
            TransportState::Transitioning,
            TransportState::NoMedia,
        ] {
            assert_eq!(TransportState::from_upnp_state(state.as_upnp_str()), state);
        }
    }

    #[test]
    fn test_play_mode_flags() {
        assert_eq!(PlayMode::from_upnp("repeat_one"), Some(PlayMode::RepeatOne));
        assert_eq!(PlayMode::from_upnp("DIRECT_1"), None);
        assert_eq!(PlayMode::RepeatOne.flags(), (false, true));
        assert_eq!(PlayMode::from_flags(false, true), PlayMode::RepeatAll);
        assert_eq!(PlayMode::from_flags(true, true), PlayMode::Shuffle);
    }
}
