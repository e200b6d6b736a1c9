//! Service Time OpenHome : position dans la piste en cours
//!
//! Le topic "Time" est incrémenté à chaque avancée de la position ; l'envoi
//! reste borné par le tick du renderer.

use crate::error::RendererError;
use crate::openinfo::OpenInfoService;
use crate::renderer::Renderer;
use pmoupnp::actions::{ActionArgs, ActionResponse, ActionResult, ActionTable, CallerIdentity};
use pmoupnp::events::{topics, Subscriber, UpdateCounter, UpnpEventHandler};
use pmoupnp::services::UpnpService;
use pmoupnp::upnp_actions;
use std::sync::Arc;

pub const TIME_SERVICE_TYPE: &str = "urn:av-openhome-org:service:Time:1";

upnp_actions! {
    /// Actions du service Time
    pub enum TimeAction {
        Time,
    }
}

/// Service Time OpenHome
pub struct OpenTimeService {
    renderer: Arc<dyn Renderer>,
    info: Arc<OpenInfoService>,
    counter: UpdateCounter,
    table: ActionTable<Self, TimeAction>,
}

impl OpenTimeService {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        info: Arc<OpenInfoService>,
    ) -> Result<Self, RendererError> {
        let table = ActionTable::new().with(TimeAction::Time, Self::time);
        table.validate().map_err(|source| RendererError::Actions {
            service: "Time",
            source,
        })?;

        Ok(Self {
            renderer,
            info,
            counter: UpdateCounter::new(),
            table,
        })
    }

    /// `(TrackCount, Duration, Seconds)`
    fn snapshot(&self) -> (u32, u64, u64) {
        let duration = self
            .renderer
            .current_track()
            .map(|e| e.track.duration_ms() / 1000)
            .unwrap_or(0);
        (
            self.info.track_count(),
            duration,
            self.renderer.position_ms() / 1000,
        )
    }

    fn time(&self, _args: &ActionArgs, _caller: &CallerIdentity) -> ActionResult {
        let (track_count, duration, seconds) = self.snapshot();
        Ok(ActionResponse::new()
            .with("TrackCount", track_count)
            .with("Duration", duration)
            .with("Seconds", seconds))
    }
}

impl UpnpService for OpenTimeService {
    fn name(&self) -> &'static str {
        topics::TIME
    }

    fn service_type(&self) -> &'static str {
        TIME_SERVICE_TYPE
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

impl UpnpEventHandler for OpenTimeService {
    fn topic(&self) -> &'static str {
        topics::TIME
    }

    fn update_count(&self) -> u32 {
        self.counter.get()
    }

    fn inc_update_count(&self) {
        self.counter.inc();
    }

    fn event_content(&self, _subscriber: &Subscriber) -> Vec<(String, String)> {
        let (track_count, duration, seconds) = self.snapshot();
        vec![
            ("TrackCount".to_string(), track_count.to_string()),
            ("Duration".to_string(), duration.to_string()),
            ("Seconds".to_string(), seconds.to_string()),
        ]
    }
}
