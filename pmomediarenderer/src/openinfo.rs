//! Service Info OpenHome : description de la piste en cours
//!
//! Le topic "Info" est incrémenté à chaque changement de piste ; sa valeur
//! sert aussi de `TrackCount`.

use crate::error::RendererError;
use crate::renderer::Renderer;
use pmoplaylist::PlaylistEntry;
use pmoupnp::actions::{ActionArgs, ActionResponse, ActionResult, ActionTable, CallerIdentity};
use pmoupnp::events::{topics, Subscriber, UpdateCounter, UpnpEventHandler};
use pmoupnp::services::UpnpService;
use pmoupnp::upnp_actions;
use std::sync::Arc;

pub const INFO_SERVICE_TYPE: &str = "urn:av-openhome-org:service:Info:1";

upnp_actions! {
    /// Actions du service Info
    pub enum InfoAction {
        Counters,
        Track,
        Details,
    }
}

/// Nom de codec affiché pour un type MIME audio
pub fn codec_name(mime: Option<&str>) -> &'static str {
    match mime.map(|m| m.to_ascii_lowercase()).as_deref() {
        Some("audio/flac") | Some("audio/x-flac") => "FLAC",
        Some("audio/mpeg") | Some("audio/mp3") => "MP3",
        Some("audio/wav") | Some("audio/x-wav") => "WAV",
        Some("audio/aiff") | Some("audio/x-aiff") => "AIFF",
        Some("audio/mp4") | Some("audio/x-m4a") | Some("audio/aac") => "AAC",
        Some("audio/ogg") | Some("application/ogg") => "OGG",
        Some("audio/x-ms-wma") => "WMA",
        Some("audio/x-dsf") => "DSF",
        _ => "",
    }
}

fn is_lossless(codec: &str) -> bool {
    matches!(codec, "FLAC" | "WAV" | "AIFF" | "DSF")
}

/// Service Info OpenHome
pub struct OpenInfoService {
    renderer: Arc<dyn Renderer>,
    counter: UpdateCounter,
    table: ActionTable<Self, InfoAction>,
}

impl OpenInfoService {
    pub fn new(renderer: Arc<dyn Renderer>) -> Result<Self, RendererError> {
        let table = ActionTable::new()
            .with(InfoAction::Counters, Self::counters)
            .with(InfoAction::Track, Self::track)
            .with(InfoAction::Details, Self::details);
        table.validate().map_err(|source| RendererError::Actions {
            service: "Info",
            source,
        })?;

        Ok(Self {
            renderer,
            counter: UpdateCounter::new(),
            table,
        })
    }

    /// Nombre de changements de piste depuis le démarrage
    pub fn track_count(&self) -> u32 {
        self.counter.get()
    }

    fn current(&self) -> Option<PlaylistEntry> {
        self.renderer.current_track()
    }

    fn counters(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new()
            .with("TrackCount", self.track_count())
            .with("DetailsCount", self.track_count())
            .with("MetatextCount", 0))
    }

    fn track(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let entry = self.current();
        Ok(ActionResponse::new()
            .with("Uri", entry.as_ref().map(|e| e.track.uri()).unwrap_or_default())
            .with(
                "Metadata",
                entry.as_ref().map(|e| e.track.metadata()).unwrap_or_default(),
            ))
    }

    fn details(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let entry = self.current();
        let duration = entry.as_ref().map(|e| e.track.duration_ms() / 1000).unwrap_or(0);
        let codec = codec_name(
            entry
                .as_ref()
                .and_then(|e| e.track.media_type().mime_type()),
        );

        Ok(ActionResponse::new()
            .with("Duration", duration)
            .with("BitRate", 0)
            .with("BitDepth", 0)
            .with("SampleRate", 0)
            .with("Lossless", is_lossless(codec))
            .with("CodecName", codec))
    }
}

impl UpnpService for OpenInfoService {
    fn name(&self) -> &'static str {
        topics::INFO
    }

    fn service_type(&self) -> &'static str {
        INFO_SERVICE_TYPE
    }

    fn handle_action(
        &self,
        action: &str,
        args: &ActionArgs,
        caller: &CallerIdentity,
    ) -> Option<ActionResult> {
        self.table.dispatch(self, action, args, caller)
    }
}

impl UpnpEventHandler for OpenInfoService {
    fn topic(&self) -> &'static str {
        topics::INFO
    }

    fn update_count(&self) -> u32 {
        self.counter.get()
    }

    fn inc_update_count(&self) {
        self.counter.inc();
    }

    fn event_content(&self, _subscriber: &Subscriber) -> Vec<(String, String)> {
        let entry = self.current();
        let (uri, metadata, duration, mime) = match &entry {
            Some(e) => (
                e.track.uri().to_string(),
                e.track.metadata().to_string(),
                e.track.duration_ms() / 1000,
                e.track.media_type().mime_type(),
            ),
            None => (String::new(), String::new(), 0, None),
        };

        vec![
            ("TrackCount".to_string(), self.track_count().to_string()),
            ("Uri".to_string(), uri),
            ("Metadata".to_string(), metadata),
            ("Duration".to_string(), duration.to_string()),
            ("CodecName".to_string(), codec_name(mime).to_string()),
        ]
    }
}
