//! # AVTransport Service - Contrôle de transport UPnP AV
//!
//! Sous-ensemble pratique de `urn:schemas-upnp-org:service:AVTransport:1`
//! pour les control points DLNA qui ne parlent pas OpenHome :
//!
//! - **Contrôle de lecture** : Play, Pause, Stop, Next, Previous, Seek
//! - **Gestion des URIs** : SetAVTransportURI (piste hors playlist)
//! - **Information d'état** : GetTransportInfo, GetPositionInfo, GetMediaInfo,
//!   GetTransportSettings, GetCurrentTransportActions
//! - **Capacités et modes** : GetDeviceCapabilities, SetPlayMode
//!
//! Le topic "AVTransport" publie une unique variable `LastChange`.

use crate::error::{renderer_fault, RendererError};
use crate::live::PlaylistMutator;
use crate::renderer::{PlayMode, Renderer};
use pmodidl::{format_duration, parse_duration};
use pmoplaylist::{ChangeEvent, ChangeNotifier, PlaylistEntry, Track};
use pmoupnp::actions::{
    ActionArgs, ActionFault, ActionResponse, ActionResult, ActionTable, CallerIdentity,
};
use pmoupnp::events::{topics, Subscriber, UpdateCounter, UpnpEventHandler};
use pmoupnp::services::UpnpService;
use pmoupnp::upnp_actions;
use quick_xml::escape::escape;
use std::sync::Arc;
use tracing::{debug, info};

pub const AVTRANSPORT_SERVICE_TYPE: &str = "urn:schemas-upnp-org:service:AVTransport:1";

const LAST_CHANGE_NS: &str = "urn:schemas-upnp-org:metadata-1-0/AVT/";

/// Valeur UPnP d'un compteur non supporté
const NOT_SUPPORTED_COUNT: i32 = i32::MAX;

upnp_actions! {
    /// Actions du service AVTransport
    pub enum AvTransportAction {
        GetDeviceCapabilities,
        GetMediaInfo,
        GetTransportInfo,
        GetPositionInfo,
        GetTransportSettings,
        GetCurrentTransportActions,
        SetAVTransportURI,
        SetPlayMode,
        Play,
        Pause,
        Stop,
        Next,
        Previous,
        Seek,
    }
}

/// Service AVTransport
pub struct AvTransportService {
    playlist: Arc<dyn PlaylistMutator>,
    renderer: Arc<dyn Renderer>,
    changes: Arc<dyn ChangeNotifier>,
    counter: UpdateCounter,
    table: ActionTable<Self, AvTransportAction>,
}

impl AvTransportService {
    pub fn new(
        playlist: Arc<dyn PlaylistMutator>,
        renderer: Arc<dyn Renderer>,
        changes: Arc<dyn ChangeNotifier>,
    ) -> Result<Self, RendererError> {
        use AvTransportAction as A;

        let table = ActionTable::new()
            .with(A::GetDeviceCapabilities, Self::get_device_capabilities)
            .with(A::GetMediaInfo, Self::get_media_info)
            .with(A::GetTransportInfo, Self::get_transport_info)
            .with(A::GetPositionInfo, Self::get_position_info)
            .with(A::GetTransportSettings, Self::get_transport_settings)
            .with(A::GetCurrentTransportActions, Self::get_current_transport_actions)
            .with(A::SetAVTransportURI, Self::set_av_transport_uri)
            .with(A::SetPlayMode, Self::set_play_mode)
            .with(A::Play, Self::play)
            .with(A::Pause, Self::pause)
            .with(A::Stop, Self::stop)
            .with(A::Next, Self::next)
            .with(A::Previous, Self::previous)
            .with(A::Seek, Self::seek);
        table.validate().map_err(|source| RendererError::Actions {
            service: "AVTransport",
            source,
        })?;

        Ok(Self {
            playlist,
            renderer,
            changes,
            counter: UpdateCounter::new(),
            table,
        })
    }

    fn current(&self) -> Option<PlaylistEntry> {
        self.renderer.current_track()
    }

    /// Nombre de pistes du média courant : la playlist, ou la piste isolée
    fn number_of_tracks(&self, current: Option<&PlaylistEntry>) -> usize {
        match current {
            Some(entry) if entry.open_id == 0 => 1,
            _ => self.playlist.num_tracks(),
        }
    }

    fn get_device_capabilities(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new()
            .with("PlayMedia", "NETWORK")
            .with("RecMedia", "NOT_IMPLEMENTED")
            .with("RecQualityModes", "NOT_IMPLEMENTED"))
    }

    fn get_media_info(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let current = self.current();
        let (uri, metadata, duration) = match &current {
            Some(e) => (e.track.uri(), e.track.metadata(), e.track.duration_ms()),
            None => ("", "", 0),
        };

        Ok(ActionResponse::new()
            .with("NrTracks", self.number_of_tracks(current.as_ref()))
            .with("MediaDuration", format_duration(duration))
            .with("CurrentURI", uri)
            .with("CurrentURIMetaData", metadata)
            .with("NextURI", "")
            .with("NextURIMetaData", "")
            .with("PlayMedium", "NETWORK")
            .with("RecordMedium", "NOT_IMPLEMENTED")
            .with("WriteStatus", "NOT_IMPLEMENTED"))
    }

    fn get_transport_info(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new()
            .with("CurrentTransportState", self.renderer.state().as_upnp_str())
            .with("CurrentTransportStatus", self.renderer.transport_status())
            .with("CurrentSpeed", self.renderer.play_speed()))
    }

    fn get_position_info(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let current = self.current();
        let position = format_duration(self.renderer.position_ms());
        let (track, duration, metadata, uri) = match &current {
            Some(e) => (
                e.position.max(1),
                format_duration(e.track.duration_ms()),
                e.track.metadata(),
                e.track.uri(),
            ),
            None => (0, format_duration(0), "", ""),
        };

        Ok(ActionResponse::new()
            .with("Track", track)
            .with("TrackDuration", duration)
            .with("TrackMetaData", metadata)
            .with("TrackURI", uri)
            .with("RelTime", &position)
            .with("AbsTime", &position)
            .with("RelCount", NOT_SUPPORTED_COUNT)
            .with("AbsCount", NOT_SUPPORTED_COUNT))
    }

    fn get_transport_settings(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new()
            .with("PlayMode", self.renderer.play_mode().as_upnp_str())
            .with("RecQualityMode", "NOT_IMPLEMENTED"))
    }

    fn get_current_transport_actions(
        &self,
        _args: &ActionArgs,
        _caller: &CallerIdentity,
    ) -> ActionResult {
        Ok(ActionResponse::new().with("Actions", "Play,Stop,Pause,Seek,Next,Previous"))
    }

    fn set_av_transport_uri(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let uri = args.required_str("CurrentURI")?;
        let metadata = args.optional_str("CurrentURIMetaData");

        let entry = PlaylistEntry {
            open_id: 0,
            position: 0,
            track: Arc::new(Track::new(uri, metadata)),
        };
        info!(uri = %uri, "🎵 SetAVTransportURI");
        self.renderer.set_track(entry).map_err(renderer_fault)?;
        self.changes.notify(ChangeEvent::TrackChanged);
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn set_play_mode(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let raw = args.required_str("NewPlayMode")?;
        let mode = PlayMode::from_upnp(raw)
            .ok_or_else(|| ActionFault::invalid_args(format!("unsupported play mode {}", raw)))?;
        let (shuffle, repeat) = mode.flags();
        self.renderer.set_shuffle(shuffle).map_err(renderer_fault)?;
        self.renderer.set_repeat(repeat).map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn play(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.play().map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn pause(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.pause().map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn stop(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.stop().map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn next(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.inc_and_play(1).map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn previous(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.inc_and_play(-1).map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn seek(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let unit = args.required_str("Unit")?;
        let target = args.required_str("Target")?;

        match unit {
            "REL_TIME" | "ABS_TIME" => {
                let position = parse_duration(target).ok_or_else(|| {
                    ActionFault::invalid_args(format!("invalid seek target {}", target))
                })?;
                debug!(unit, position, "Seek");
                self.renderer.seek_to(position).map_err(renderer_fault)?;
                Ok(ActionResponse::new())
            }
            other => Err(ActionFault::seek_mode_not_supported(other)),
        }
    }

    /// Document `LastChange` décrivant l'instance 0
    fn last_change(&self) -> String {
        let current = self.current();
        let (uri, metadata, duration) = match &current {
            Some(e) => (e.track.uri(), e.track.metadata(), e.track.duration_ms()),
            None => ("", "", 0),
        };
        let variables = [
            ("TransportState", self.renderer.state().as_upnp_str().to_string()),
            ("TransportStatus", self.renderer.transport_status().to_string()),
            ("CurrentPlayMode", self.renderer.play_mode().as_upnp_str().to_string()),
            (
                "NumberOfTracks",
                self.number_of_tracks(current.as_ref()).to_string(),
            ),
            ("CurrentTrackDuration", format_duration(duration)),
            ("AVTransportURI", uri.to_string()),
            ("AVTransportURIMetaData", metadata.to_string()),
        ];

        let mut xml = format!(r#"<Event xmlns="{}"><InstanceID val="0">"#, LAST_CHANGE_NS);
        for (name, value) in &variables {
            xml.push_str(&format!(r#"<{} val="{}"/>"#, name, escape(value.as_str())));
        }
        xml.push_str("</InstanceID></Event>");
        xml
    }
}

impl UpnpService for AvTransportService {
    fn name(&self) -> &'static str {
        topics::AV_TRANSPORT
    }

    fn service_type(&self) -> &'static str {
        AVTRANSPORT_SERVICE_TYPE
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

impl UpnpEventHandler for AvTransportService {
    fn topic(&self) -> &'static str {
        topics::AV_TRANSPORT
    }

    fn update_count(&self) -> u32 {
        self.counter.get()
    }

    fn inc_update_count(&self) {
        self.counter.inc();
    }

    fn event_content(&self, _subscriber: &Subscriber) -> Vec<(String, String)> {
        vec![("LastChange".to_string(), self.last_change())]
    }
}
