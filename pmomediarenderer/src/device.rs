//! Assemblage du renderer OpenHome
//!
//! [`MediaRendererBuilder`] câble les composants dans l'ordre où ils se
//! référencent :
//!
//! ```text
//! UpnpEventManager ← UpnpEventRouter (ChangeNotifier)
//!        ↑                  ↑
//!   handlers        CurrentPlaylist → ExposerRegistry (ExposureNotifier)
//!        ↑                  ↑
//!   services ──→ LivePlaylist (PlaylistMutator) ←── Renderer
//! ```
//!
//! # Exemple
//!
//! ```
//! use pmomediarenderer::{MediaRendererBuilder, SoftRenderer};
//! use pmoupnp::MemoryEventSink;
//! use std::sync::Arc;
//!
//! let device = MediaRendererBuilder::new()
//!     .with_event_sink(Arc::new(MemoryEventSink::new()))
//!     .build(SoftRenderer::new)
//!     .unwrap();
//!
//! assert_eq!(device.services().len(), 4);
//! assert_eq!(device.playlist_service().capacity(), 10_000);
//! ```

use crate::avtransport::AvTransportService;
use crate::config_ext::MediaRendererConfigExt;
use crate::error::{RendererError, Result};
use crate::exposer::{ExposerRegistry, ExposurePool};
use crate::live::{LivePlaylist, PlaylistMutator};
use crate::openinfo::OpenInfoService;
use crate::openplaylist::OpenPlaylistService;
use crate::opentime::OpenTimeService;
use crate::renderer::Renderer;
use crate::router::UpnpEventRouter;
use pmoconfig::Config;
use pmoplaylist::{ChangeNotifier, CurrentPlaylist, LocalPlaylistSource};
use pmoupnp::events::{
    EventSink, GenaEventSink, UpnpEventHandler, UpnpEventManager, DEFAULT_DEFER_PERIOD,
    DEFAULT_SUBSCRIPTION_TIMEOUT,
};
use pmoupnp::services::UpnpService;
use pmoupnp::UpnpConfigExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_FRIENDLY_NAME: &str = "PMO Renderer";
const DEFAULT_TRACKS_MAX: usize = 10_000;
const DEFAULT_EXPOSE_BATCH_SIZE: usize = 64;
const DEFAULT_EXPOSE_WORKERS: usize = 4;

/// Paramètres d'assemblage du renderer
pub struct MediaRendererBuilder {
    friendly_name: String,
    udn: String,
    tracks_max: usize,
    expose_batch_size: usize,
    expose_workers: usize,
    expose_on_start: bool,
    defer_period: Duration,
    subscription_timeout: Duration,
    sink: Arc<dyn EventSink>,
    sources: Arc<LocalPlaylistSource>,
    listener: Option<Arc<dyn ChangeNotifier>>,
}

impl Default for MediaRendererBuilder {
    fn default() -> Self {
        Self {
            friendly_name: DEFAULT_FRIENDLY_NAME.to_string(),
            udn: String::new(),
            tracks_max: DEFAULT_TRACKS_MAX,
            expose_batch_size: DEFAULT_EXPOSE_BATCH_SIZE,
            expose_workers: DEFAULT_EXPOSE_WORKERS,
            expose_on_start: true,
            defer_period: DEFAULT_DEFER_PERIOD,
            subscription_timeout: DEFAULT_SUBSCRIPTION_TIMEOUT,
            sink: Arc::new(GenaEventSink::new()),
            sources: Arc::new(LocalPlaylistSource::new()),
            listener: None,
        }
    }
}

impl MediaRendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paramètres lus dans la configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let udn = config
            .get_renderer_udn()
            .map_err(|e| RendererError::Config(e.to_string()))?;

        Ok(Self {
            friendly_name: config.get_renderer_friendly_name(),
            udn,
            tracks_max: config.get_tracks_max(),
            expose_batch_size: config.get_expose_batch_size(),
            expose_workers: config.get_expose_workers(),
            expose_on_start: config.get_expose_on_start(),
            defer_period: config.get_events_defer_period(),
            subscription_timeout: config.get_subscription_timeout(),
            ..Self::default()
        })
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = name.into();
        self
    }

    pub fn with_tracks_max(mut self, tracks_max: usize) -> Self {
        self.tracks_max = tracks_max;
        self
    }

    pub fn with_exposure(mut self, workers: usize, batch_size: usize) -> Self {
        self.expose_workers = workers;
        self.expose_batch_size = batch_size;
        self
    }

    /// Révéler la piste courante dès qu'une playlist est sélectionnée
    ///
    /// À désactiver quand le renderer est lui-même piloté comme device
    /// OpenHome Playlist distant.
    pub fn with_expose_on_start(mut self, expose: bool) -> Self {
        self.expose_on_start = expose;
        self
    }

    pub fn with_defer_period(mut self, period: Duration) -> Self {
        self.defer_period = period;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Playlists locales sélectionnables par `Insert` et `DeleteAll`
    pub fn with_sources(mut self, sources: Arc<LocalPlaylistSource>) -> Self {
        self.sources = sources;
        self
    }

    /// Reçoit une copie de chaque évènement de changement
    pub fn with_listener(mut self, listener: Arc<dyn ChangeNotifier>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Assemble le renderer autour du moteur créé par `make_renderer`
    pub fn build<R, F>(self, make_renderer: F) -> Result<MediaRendererDevice<R>>
    where
        R: Renderer + 'static,
        F: FnOnce(Arc<dyn PlaylistMutator>, Arc<dyn ChangeNotifier>) -> R,
    {
        if self.tracks_max == 0 {
            return Err(RendererError::Config("tracks_max must be positive".into()));
        }

        let events = Arc::new(
            UpnpEventManager::new(self.sink)
                .with_defer_period(self.defer_period)
                .with_subscription_timeout(self.subscription_timeout),
        );

        let router = Arc::new(UpnpEventRouter::new());
        router.attach(&events);
        if let Some(listener) = self.listener {
            router.set_listener(listener);
        }
        let changes: Arc<dyn ChangeNotifier> = router.clone();

        let exposers = Arc::new(ExposerRegistry::new());
        let current = CurrentPlaylist::new(exposers.clone(), changes.clone())
            .with_expose_on_start(self.expose_on_start);
        let live = Arc::new(LivePlaylist::new(current, self.sources));
        live.select_playlist("");
        let playlist: Arc<dyn PlaylistMutator> = live.clone();

        let pool = ExposurePool::new(
            playlist.clone(),
            changes.clone(),
            self.expose_workers,
            self.expose_batch_size,
        );

        let renderer = Arc::new(make_renderer(playlist.clone(), changes.clone()));
        let dyn_renderer: Arc<dyn Renderer> = renderer.clone();

        let playlist_service = Arc::new(OpenPlaylistService::new(
            playlist.clone(),
            dyn_renderer.clone(),
            exposers.clone(),
            pool,
            changes.clone(),
            Arc::downgrade(&events),
            self.tracks_max,
        )?);
        let info_service = Arc::new(OpenInfoService::new(dyn_renderer.clone())?);
        let time_service = Arc::new(OpenTimeService::new(
            dyn_renderer.clone(),
            info_service.clone(),
        )?);
        let avtransport = Arc::new(AvTransportService::new(
            playlist.clone(),
            dyn_renderer,
            changes,
        )?);

        let handlers: [Arc<dyn UpnpEventHandler>; 4] = [
            playlist_service.clone(),
            info_service.clone(),
            time_service.clone(),
            avtransport.clone(),
        ];
        for handler in handlers {
            events.register_handler(handler);
        }

        info!(
            name = %self.friendly_name,
            udn = %self.udn,
            tracks_max = self.tracks_max,
            "✅ OpenHome renderer assembled"
        );

        Ok(MediaRendererDevice {
            friendly_name: self.friendly_name,
            udn: self.udn,
            events,
            router,
            exposers,
            playlist: live,
            renderer,
            playlist_service,
            info_service,
            time_service,
            avtransport,
        })
    }
}

/// Renderer OpenHome assemblé
pub struct MediaRendererDevice<R: Renderer> {
    friendly_name: String,
    udn: String,
    events: Arc<UpnpEventManager>,
    router: Arc<UpnpEventRouter>,
    exposers: Arc<ExposerRegistry>,
    playlist: Arc<LivePlaylist>,
    renderer: Arc<R>,
    playlist_service: Arc<OpenPlaylistService>,
    info_service: Arc<OpenInfoService>,
    time_service: Arc<OpenTimeService>,
    avtransport: Arc<AvTransportService>,
}

impl<R: Renderer> MediaRendererDevice<R> {
    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn udn(&self) -> &str {
        &self.udn
    }

    pub fn events(&self) -> &Arc<UpnpEventManager> {
        &self.events
    }

    /// Notificateur de changements partagé par la playlist et le renderer
    pub fn changes(&self) -> Arc<dyn ChangeNotifier> {
        self.router.clone()
    }

    pub fn exposers(&self) -> &Arc<ExposerRegistry> {
        &self.exposers
    }

    pub fn playlist(&self) -> &Arc<LivePlaylist> {
        &self.playlist
    }

    pub fn renderer(&self) -> &Arc<R> {
        &self.renderer
    }

    pub fn playlist_service(&self) -> &Arc<OpenPlaylistService> {
        &self.playlist_service
    }

    pub fn info_service(&self) -> &Arc<OpenInfoService> {
        &self.info_service
    }

    pub fn time_service(&self) -> &Arc<OpenTimeService> {
        &self.time_service
    }

    pub fn avtransport(&self) -> &Arc<AvTransportService> {
        &self.avtransport
    }

    /// Services à exposer sur le serveur HTTP
    pub fn services(&self) -> Vec<Arc<dyn UpnpService>> {
        vec![
            self.playlist_service.clone(),
            self.info_service.clone(),
            self.time_service.clone(),
            self.avtransport.clone(),
        ]
    }
}
