//! # Service Playlist OpenHome
//!
//! Le service `urn:av-openhome-org:service:Playlist:1` expose la playlist
//! courante aux control points : lecture de l'`IdArray` et des pistes,
//! insertion, suppression, navigation et commandes de transport.
//!
//! Chaque action est associée à son handler dans une [`ActionTable`] validée
//! à la construction du service. Les mutations réussies incrémentent le
//! compteur du topic "Playlist" ; insertions et suppressions demandent en plus
//! un envoi différé des évènements, pour regrouper les éditions en rafale.
//!
//! ## Exposition par abonné
//!
//! Un control point abonné au topic reçoit un [`PlaylistExposer`] : l'`IdArray`
//! qu'il voit ne contient que les pistes qui lui ont été révélées. Chaque
//! `ReadList` planifie l'exposition d'un lot supplémentaire en tâche de fond.

use crate::error::{renderer_fault, RendererError};
use crate::exposer::{ExposerRegistry, ExposurePool, PlaylistExposer};
use crate::live::PlaylistMutator;
use crate::renderer::Renderer;
use pmoplaylist::{parse_id_list, ChangeEvent, ChangeNotifier, Track};
use pmoupnp::actions::{
    ActionArgs, ActionFault, ActionResponse, ActionResult, ActionTable, CallerIdentity,
};
use pmoupnp::events::{topics, Subscriber, UpdateCounter, UpnpEventHandler, UpnpEventManager};
use pmoupnp::services::UpnpService;
use pmoupnp::upnp_actions;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Type URN du service
pub const PLAYLIST_SERVICE_TYPE: &str = "urn:av-openhome-org:service:Playlist:1";

/// Types MIME annoncés par `ProtocolInfo`
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "audio/flac",
    "audio/mpeg",
    "audio/wav",
    "audio/x-wav",
    "audio/aiff",
    "audio/x-aiff",
    "audio/mp4",
    "audio/x-m4a",
    "audio/ogg",
    "audio/x-ms-wma",
];

/// Segment d'URI qui fait d'un `Insert` une sélection de playlist locale
const SELECT_PLAYLIST_MARKER: &str = "/select_playlist/";

upnp_actions! {
    /// Actions du service Playlist
    pub enum PlaylistAction {
        ProtocolInfo,
        TracksMax,
        TransportState,
        Repeat,
        Shuffle,
        Id,
        IdArray,
        IdArrayChanged,
        Read,
        ReadList,
        DeleteAll,
        DeleteId,
        Insert,
        SetRepeat,
        SetShuffle,
        SeekId,
        SeekIndex,
        SeekSecondAbsolute,
        SeekSecondRelative,
        Next,
        Previous,
        Pause,
        Play,
        Stop,
    }
}

/// Liste `ProtocolInfo` : une entrée `http-get:*:<mime>:*` par type supporté
pub fn protocol_info() -> String {
    SUPPORTED_MIME_TYPES
        .iter()
        .map(|mime| format!("http-get:*:{}:*", mime))
        .collect::<Vec<_>>()
        .join(",")
}

/// Nom de la playlist locale désignée par une URI `.../select_playlist/<nom>`
fn selected_playlist_name(uri: &str) -> Option<&str> {
    let (_, name) = uri.split_once(SELECT_PLAYLIST_MARKER)?;
    Some(name.strip_suffix(".mp3").unwrap_or(name))
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Service Playlist OpenHome
pub struct OpenPlaylistService {
    playlist: Arc<dyn PlaylistMutator>,
    renderer: Arc<dyn Renderer>,
    exposers: Arc<ExposerRegistry>,
    pool: ExposurePool,
    changes: Arc<dyn ChangeNotifier>,
    events: Weak<UpnpEventManager>,
    counter: UpdateCounter,
    tracks_max: usize,
    table: ActionTable<Self, PlaylistAction>,
}

impl std::fmt::Debug for OpenPlaylistService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenPlaylistService")
            .field("update_count", &self.counter.get())
            .field("tracks_max", &self.tracks_max)
            .field("exposers", &self.exposers.len())
            .finish()
    }
}

impl OpenPlaylistService {
    /// Construit le service et valide sa table d'actions
    pub fn new(
        playlist: Arc<dyn PlaylistMutator>,
        renderer: Arc<dyn Renderer>,
        exposers: Arc<ExposerRegistry>,
        pool: ExposurePool,
        changes: Arc<dyn ChangeNotifier>,
        events: Weak<UpnpEventManager>,
        tracks_max: usize,
    ) -> Result<Self, RendererError> {
        let table = Self::action_table();
        table.validate().map_err(|source| RendererError::Actions {
            service: "Playlist",
            source,
        })?;

        Ok(Self {
            playlist,
            renderer,
            exposers,
            pool,
            changes,
            events,
            counter: UpdateCounter::new(),
            tracks_max,
            table,
        })
    }

    fn action_table() -> ActionTable<Self, PlaylistAction> {
        use PlaylistAction as A;

        ActionTable::new()
            .with(A::ProtocolInfo, Self::protocol_info)
            .with(A::TracksMax, Self::tracks_max)
            .with(A::TransportState, Self::transport_state)
            .with(A::Repeat, Self::repeat)
            .with(A::Shuffle, Self::shuffle)
            .with(A::Id, Self::id)
            .with(A::IdArray, Self::id_array)
            .with(A::IdArrayChanged, Self::id_array_changed)
            .with(A::Read, Self::read)
            .with(A::ReadList, Self::read_list)
            .with(A::DeleteAll, Self::delete_all)
            .with(A::DeleteId, Self::delete_id)
            .with(A::Insert, Self::insert)
            .with(A::SetRepeat, Self::set_repeat)
            .with(A::SetShuffle, Self::set_shuffle)
            .with(A::SeekId, Self::seek_id)
            .with(A::SeekIndex, Self::seek_index)
            .with(A::SeekSecondAbsolute, Self::seek_second_absolute)
            .with(A::SeekSecondRelative, Self::seek_second_relative)
            .with(A::Next, Self::next)
            .with(A::Previous, Self::previous)
            .with(A::Pause, Self::pause)
            .with(A::Play, Self::play)
            .with(A::Stop, Self::stop)
    }

    pub fn exposers(&self) -> &Arc<ExposerRegistry> {
        &self.exposers
    }

    /// Nombre maximal de pistes (`TracksMax`)
    pub fn capacity(&self) -> usize {
        self.tracks_max
    }

    fn exposer_for(&self, caller: &CallerIdentity) -> Option<Arc<PlaylistExposer>> {
        self.exposers.get(&caller.key())
    }

    fn defer_events(&self) {
        if let Some(events) = self.events.upgrade() {
            events.defer_events();
        }
    }

    /// Mutation de contenu : compteur du topic et envoi différé
    fn content_changed(&self) {
        self.counter.inc();
        self.defer_events();
    }

    /// Recharge le renderer sur la piste courante de la playlist, ou le vide
    fn reload_renderer(&self) -> Result<(), ActionFault> {
        match self.playlist.current_entry() {
            Some(entry) => self.renderer.set_track(entry),
            None => self.renderer.clear_track(),
        }
        .map_err(renderer_fault)?;
        self.changes.notify(ChangeEvent::TrackChanged);
        Ok(())
    }

    fn current_id(&self) -> u32 {
        self.renderer
            .current_track()
            .map(|entry| entry.open_id)
            .unwrap_or(0)
    }

    fn protocol_info(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new().with("Value", protocol_info()))
    }

    fn tracks_max(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new().with("Value", self.tracks_max))
    }

    fn transport_state(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new().with("Value", self.renderer.state().as_openhome_str()))
    }

    fn repeat(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new().with("Value", flag(self.renderer.repeat())))
    }

    fn shuffle(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new().with("Value", flag(self.renderer.shuffle())))
    }

    fn id(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        Ok(ActionResponse::new().with("Value", self.current_id()))
    }

    fn id_array(&self, _args: &ActionArgs, caller: &CallerIdentity) -> ActionResult {
        let exposer = self.exposer_for(caller);
        let token = self.playlist.token();
        let array = self.playlist.id_array_string(exposer.as_deref());
        Ok(ActionResponse::new()
            .with("Token", token)
            .with("Array", array))
    }

    fn id_array_changed(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let token = args.get("Token").and_then(|t| t.trim().parse::<u32>().ok());
        let changed = token != Some(self.playlist.token());
        Ok(ActionResponse::new().with("Value", flag(changed)))
    }

    fn read(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let id = args.required_u32("Id")?;
        let entry = self
            .playlist
            .track_by_open_id(id)
            .ok_or_else(|| ActionFault::item_not_found(id))?;
        Ok(ActionResponse::new()
            .with("Uri", entry.track.uri())
            .with("Metadata", entry.track.metadata()))
    }

    fn read_list(&self, args: &ActionArgs, caller: &CallerIdentity) -> ActionResult {
        let ids = parse_id_list(args.optional_str("IdList"));
        let track_list = self.playlist.track_list_xml(&ids);

        if let Some(exposer) = self.exposer_for(caller) {
            self.pool.schedule(exposer);
        }

        Ok(ActionResponse::new().with("TrackList", track_list))
    }

    fn delete_all(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.stop().map_err(renderer_fault)?;
        self.playlist.select_playlist("");
        self.reload_renderer()?;
        self.content_changed();
        info!("🗑️ Playlist cleared");
        Ok(ActionResponse::new())
    }

    fn delete_id(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let id = args.required_u32("Value")?;
        let playing = self.current_id() == id;
        let entry = self.playlist.remove_by_open_id(id)?;
        if playing {
            self.reload_renderer()?;
        }
        self.content_changed();
        debug!(open_id = id, position = entry.position, "DeleteId");
        Ok(ActionResponse::new())
    }

    fn insert(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let after_id = args.required_u32("AfterId")?;
        let uri = args.required_str("Uri")?;
        let metadata = args.optional_str("Metadata");

        if let Some(name) = selected_playlist_name(uri) {
            self.playlist.select_playlist(name);
            self.reload_renderer()?;
            self.content_changed();
            return Ok(ActionResponse::new().with("NewId", 0));
        }

        let outcome = self
            .playlist
            .insert_after(after_id, Track::new(uri, metadata), self.tracks_max)?;
        if outcome.index_changed {
            self.changes.notify(ChangeEvent::TrackChanged);
        }
        self.content_changed();

        debug!(
            open_id = outcome.entry.open_id,
            after_id,
            position = outcome.entry.position,
            "Insert"
        );
        Ok(ActionResponse::new().with("NewId", outcome.entry.open_id))
    }

    fn set_repeat(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let repeat = args.required_bool("Value")?;
        self.renderer.set_repeat(repeat).map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn set_shuffle(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let shuffle = args.required_bool("Value")?;
        self.renderer.set_shuffle(shuffle).map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn seek_id(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let id = args.required_u32("Value")?;
        let entry = self
            .playlist
            .seek_by_open_id(id)
            .ok_or_else(|| ActionFault::item_not_found(id))?;
        self.changes.notify(ChangeEvent::TrackChanged);
        self.renderer.play_entry(entry).map_err(renderer_fault)?;
        Ok(ActionResponse::new())
    }

    fn seek_index(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let index = args.required_u32("Value")?;
        let entry = self
            .playlist
            .seek_by_index(index as usize)
            .ok_or_else(|| ActionFault::item_not_found(index))?;
        self.changes.notify(ChangeEvent::TrackChanged);
        self.renderer.play_entry(entry).map_err(renderer_fault)?;
        Ok(ActionResponse::new())
    }

    fn seek_second_absolute(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let seconds = args.required_u32("Value")?;
        self.renderer
            .seek_to(u64::from(seconds) * 1000)
            .map_err(renderer_fault)?;
        Ok(ActionResponse::new())
    }

    fn seek_second_relative(&self, args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let delta_ms = args.required_i64("Value")?.saturating_mul(1000);
        let position = self.renderer.position_ms() as i64;
        let target = position.saturating_add(delta_ms).max(0) as u64;
        self.renderer.seek_to(target).map_err(renderer_fault)?;
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

    fn pause(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.pause().map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn play(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.play().map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }

    fn stop(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        self.renderer.stop().map_err(renderer_fault)?;
        self.counter.inc();
        Ok(ActionResponse::new())
    }
}

impl UpnpService for OpenPlaylistService {
    fn name(&self) -> &'static str {
        topics::PLAYLIST
    }

    fn service_type(&self) -> &'static str {
        PLAYLIST_SERVICE_TYPE
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

impl UpnpEventHandler for OpenPlaylistService {
    fn topic(&self) -> &'static str {
        topics::PLAYLIST
    }

    fn update_count(&self) -> u32 {
        self.counter.get()
    }

    fn inc_update_count(&self) {
        self.counter.inc();
    }

    fn event_content(&self, subscriber: &Subscriber) -> Vec<(String, String)> {
        // État du renderer lu avant de prendre la playlist
        let state = self.renderer.state().as_openhome_str();
        let shuffle = flag(self.renderer.shuffle());
        let repeat = flag(self.renderer.repeat());
        let id = self.current_id();

        let exposer = self.exposers.get(&subscriber.identity.key());
        let id_array = self.playlist.id_array_string(exposer.as_deref());

        vec![
            ("TransportState".to_string(), state.to_string()),
            ("ProtocolInfo".to_string(), protocol_info()),
            ("TracksMax".to_string(), self.tracks_max.to_string()),
            ("Shuffle".to_string(), shuffle.to_string()),
            ("Repeat".to_string(), repeat.to_string()),
            ("IdArray".to_string(), id_array),
            ("Id".to_string(), id.to_string()),
        ]
    }

    fn notify_subscribed(&self, subscriber: &Subscriber, subscribed: bool) {
        let key = subscriber.identity.key();
        if subscribed {
            let (exposer, created) = self.exposers.attach(&key, &subscriber.sid);
            if let Some(entry) = self.playlist.current_entry() {
                exposer.expose_track(entry.open_id, true);
            }
            debug!(exposer = %key, created, "Playlist subscriber attached");
        } else if let Some(exposer) = self.exposers.detach(&key, &subscriber.sid) {
            exposer.clear_exposed_bits();
            debug!(exposer = %key, "Playlist subscriber detached");
        }
    }
}
