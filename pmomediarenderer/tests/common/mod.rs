//! Collaborateurs de test : renderer enregistreur et assemblage du device

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use pmomediarenderer::{
    MediaRendererBuilder, MediaRendererDevice, PlaylistMutator, Renderer, SoftRenderer,
    TransportState,
};
use pmoplaylist::{ChangeNotifier, LocalPlaylistSource, PlaylistEntry, Track};
use pmoupnp::actions::{ActionArgs, ActionFault, ActionResponse, CallerIdentity};
use pmoupnp::services::UpnpService;
use pmoupnp::MemoryEventSink;
use std::sync::Arc;
use std::time::Duration;

/// Commandes reçues par le renderer
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Seek(u64),
    SetTrack(u32),
    ClearTrack,
    IncAndPlay(i64),
}

#[derive(Default)]
struct RecordingState {
    commands: Vec<Command>,
    current: Option<PlaylistEntry>,
    state: TransportState,
    position_ms: u64,
    shuffle: bool,
    repeat: bool,
}

/// Renderer qui enregistre ses commandes
pub struct RecordingRenderer {
    playlist: Arc<dyn PlaylistMutator>,
    state: Mutex<RecordingState>,
}

impl RecordingRenderer {
    pub fn new(playlist: Arc<dyn PlaylistMutator>) -> Self {
        Self {
            playlist,
            state: Mutex::new(RecordingState::default()),
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().commands.clone()
    }

    pub fn clear(&self) {
        self.state.lock().commands.clear();
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().position_ms = position_ms;
    }
}

impl Renderer for RecordingRenderer {
    fn play(&self) -> Result<()> {
        let mut s = self.state.lock();
        s.commands.push(Command::Play);
        s.state = TransportState::Playing;
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        let mut s = self.state.lock();
        s.commands.push(Command::Pause);
        s.state = TransportState::Paused;
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut s = self.state.lock();
        s.commands.push(Command::Stop);
        s.state = TransportState::Stopped;
        Ok(())
    }

    fn seek_to(&self, position_ms: u64) -> Result<()> {
        let mut s = self.state.lock();
        s.commands.push(Command::Seek(position_ms));
        s.position_ms = position_ms;
        Ok(())
    }

    fn set_track(&self, entry: PlaylistEntry) -> Result<()> {
        let mut s = self.state.lock();
        s.commands.push(Command::SetTrack(entry.open_id));
        s.current = Some(entry);
        Ok(())
    }

    fn clear_track(&self) -> Result<()> {
        let mut s = self.state.lock();
        s.commands.push(Command::ClearTrack);
        s.current = None;
        s.state = TransportState::Stopped;
        Ok(())
    }

    fn inc_and_play(&self, delta: i64) -> Result<()> {
        let entry = self
            .playlist
            .inc_get_track(delta)
            .map_err(|e| anyhow!("{}", e))?;
        let mut s = self.state.lock();
        s.commands.push(Command::IncAndPlay(delta));
        s.current = Some(entry);
        s.state = TransportState::Playing;
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

pub struct Harness<R: Renderer + 'static = RecordingRenderer> {
    pub device: MediaRendererDevice<R>,
    pub sink: Arc<MemoryEventSink>,
    pub sources: Arc<LocalPlaylistSource>,
}

pub fn track(name: &str) -> Track {
    Track::new(format!("http://media/{name}.flac"), didl(name))
}

pub fn didl(title: &str) -> String {
    format!(
        r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/"><item id="{title}" parentID=""><dc:title>{title}</dc:title><upnp:class>object.item.audioItem.musicTrack</upnp:class><res protocolInfo="http-get:*:audio/flac:*" duration="0:03:00">http://media/{title}.flac</res></item></DIDL-Lite>"#
    )
}

pub fn harness() -> Harness {
    harness_with(|builder| builder)
}

pub fn harness_with(configure: impl FnOnce(MediaRendererBuilder) -> MediaRendererBuilder) -> Harness {
    harness_on(configure, |playlist, _changes| RecordingRenderer::new(playlist))
}

/// Device piloté par le renderer simulé
pub fn soft_harness() -> Harness<SoftRenderer> {
    harness_on(|builder| builder, SoftRenderer::new)
}

fn harness_on<R: Renderer + 'static>(
    configure: impl FnOnce(MediaRendererBuilder) -> MediaRendererBuilder,
    make_renderer: impl FnOnce(Arc<dyn PlaylistMutator>, Arc<dyn ChangeNotifier>) -> R,
) -> Harness<R> {
    let sink = Arc::new(MemoryEventSink::new());
    let sources = Arc::new(LocalPlaylistSource::new());
    let builder = MediaRendererBuilder::new()
        .with_event_sink(sink.clone())
        .with_sources(sources.clone())
        .with_defer_period(Duration::ZERO)
        .with_exposure(1, 2);
    let device = configure(builder).build(make_renderer).unwrap();
    Harness {
        device,
        sink,
        sources,
    }
}

pub fn caller() -> CallerIdentity {
    CallerIdentity::new("10.0.0.5", "Kazoo/4.0")
}

impl<R: Renderer + 'static> Harness<R> {
    pub fn call(&self, action: &str, args: &[(&str, &str)]) -> Result<ActionResponse, ActionFault> {
        self.call_as(&caller(), action, args)
    }

    pub fn call_as(
        &self,
        caller: &CallerIdentity,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<ActionResponse, ActionFault> {
        let args = args
            .iter()
            .fold(ActionArgs::new(), |acc, (k, v)| acc.with(*k, *v));
        self.device
            .playlist_service()
            .handle_action(action, &args, caller)
            .unwrap_or_else(|| panic!("action {action} not handled"))
    }

    /// Insère après `after_id` et retourne le NewId
    pub fn insert(&self, after_id: u32, name: &str) -> u32 {
        let t = track(name);
        let after = after_id.to_string();
        self.call(
            "Insert",
            &[("AfterId", &after), ("Uri", t.uri()), ("Metadata", t.metadata())],
        )
        .unwrap()
        .get("NewId")
        .unwrap()
        .parse()
        .unwrap()
    }

    pub fn num_tracks(&self) -> usize {
        self.device.playlist().num_tracks()
    }
}
