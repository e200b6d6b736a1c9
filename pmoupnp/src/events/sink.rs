//! Livraison des notifications d'évènements

use parking_lot::Mutex;
use reqwest::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, trace, warn};

/// Une notification prête à être livrée à un abonné
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventNotification {
    pub sid: String,
    pub topic: String,
    pub callback: String,
    pub seq: u32,
    /// Document `e:propertyset`
    pub body: String,
}

/// Capacité de livraison des notifications
pub trait EventSink: Send + Sync {
    fn deliver(&self, notification: EventNotification);

    /// L'abonnement `sid` est terminé
    fn forget(&self, _sid: &str) {}
}

type EventQueue = mpsc::UnboundedSender<EventNotification>;

/// Livraison GENA : requête HTTP `NOTIFY` vers l'URL de callback
///
/// Chaque abonnement a sa file, vidée par une tâche tokio qui envoie les
/// `NOTIFY` un par un : un abonné reçoit ses SEQ dans l'ordre. Hors d'un
/// runtime tokio la notification est abandonnée et journalisée.
#[derive(Debug, Clone, Default)]
pub struct GenaEventSink {
    client: reqwest::Client,
    queues: Arc<Mutex<HashMap<String, EventQueue>>>,
}

impl GenaEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nombre de files d'abonnés ouvertes
    pub fn queue_count(&self) -> usize {
        self.queues.lock().len()
    }

    fn open_queue(&self, runtime: &tokio::runtime::Handle, sid: &str) -> EventQueue {
        let (tx, mut rx) = mpsc::unbounded_channel::<EventNotification>();
        let client = self.client.clone();
        let sid = sid.to_string();
        runtime.spawn(async move {
            while let Some(notification) = rx.recv().await {
                send_notify(&client, notification).await;
            }
            trace!(sid = %sid, "Event queue closed");
        });
        tx
    }
}

impl EventSink for GenaEventSink {
    fn deliver(&self, notification: EventNotification) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(sid = %notification.sid, "No tokio runtime, dropping event");
            return;
        };

        let mut queues = self.queues.lock();
        // Une file dont la tâche a disparu (runtime arrêté) est remplacée
        let notification = match queues.get(&notification.sid) {
            Some(queue) => match queue.send(notification) {
                Ok(()) => return,
                Err(mpsc::error::SendError(notification)) => notification,
            },
            None => notification,
        };

        let sid = notification.sid.clone();
        let queue = self.open_queue(&runtime, &sid);
        if queue.send(notification).is_err() {
            warn!(sid = %sid, "Event queue closed before first event");
            return;
        }
        queues.insert(sid, queue);
    }

    fn forget(&self, sid: &str) {
        if self.queues.lock().remove(sid).is_some() {
            debug!(sid, "Event queue released");
        }
    }
}

async fn send_notify(client: &reqwest::Client, notification: EventNotification) {
    let method = match Method::from_bytes(b"NOTIFY") {
        Ok(method) => method,
        Err(e) => {
            error!("❌ Invalid NOTIFY method: {}", e);
            return;
        }
    };

    let EventNotification {
        sid,
        topic,
        callback,
        seq,
        body,
    } = notification;

    match client
        .request(method, &callback)
        .header("Content-Type", r#"text/xml; charset="utf-8""#)
        .header("NT", "upnp:event")
        .header("NTS", "upnp:propchange")
        .header("SID", &sid)
        .header("SEQ", seq.to_string())
        .body(body)
        .send()
        .await
    {
        Ok(resp) => {
            debug!(
                "📡 {} event #{} sent to {}, status={}",
                topic,
                seq,
                callback,
                resp.status()
            );
        }
        Err(e) => {
            error!("❌ Failed to notify subscriber {} ({}): {}", sid, callback, e);
        }
    }
}

/// Livraison en mémoire : les notifications sont conservées
///
/// Sert aux tests et aux intégrations qui relaient les évènements
/// autrement qu'en HTTP.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    delivered: Mutex<Vec<EventNotification>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retire et retourne les notifications livrées
    pub fn take(&self) -> Vec<EventNotification> {
        std::mem::take(&mut *self.delivered.lock())
    }

    pub fn len(&self) -> usize {
        self.delivered.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered.lock().is_empty()
    }
}

impl EventSink for MemoryEventSink {
    fn deliver(&self, notification: EventNotification) {
        self.delivered.lock().push(notification);
    }
}
