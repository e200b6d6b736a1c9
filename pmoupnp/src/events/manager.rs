//! Gestionnaire d'évènements : handlers par topic, abonnés et envoi groupé

use super::{EventError, EventNotification, EventSink, Subscriber, build_propertyset};
use crate::actions::CallerIdentity;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Délai de coalescence par défaut de [`UpnpEventManager::defer_events`]
pub const DEFAULT_DEFER_PERIOD: Duration = Duration::from_millis(1000);

/// Durée d'abonnement appliquée quand le client n'en demande pas
pub const DEFAULT_SUBSCRIPTION_TIMEOUT: Duration = Duration::from_secs(1800);

/// Ce qu'un service fournit pour son topic d'évènements
///
/// Les méthodes peuvent prendre les verrous du service (la playlist, par
/// exemple) : le gestionnaire ne les appelle jamais en tenant les siens.
pub trait UpnpEventHandler: Send + Sync {
    /// Nom du topic ("Playlist", "Info", ...)
    fn topic(&self) -> &'static str;

    fn update_count(&self) -> u32;

    fn inc_update_count(&self);

    /// Variables à notifier à cet abonné
    fn event_content(&self, subscriber: &Subscriber) -> Vec<(String, String)>;

    /// Appelé à l'arrivée (`true`) et au départ (`false`) d'un abonné
    fn notify_subscribed(&self, _subscriber: &Subscriber, _subscribed: bool) {}
}

/// Gestionnaire des évènements GENA du renderer
pub struct UpnpEventManager {
    handlers: RwLock<HashMap<String, Arc<dyn UpnpEventHandler>>>,
    /// Compteur de chaque topic au dernier envoi
    flushed: Mutex<HashMap<String, u32>>,
    subscribers: Mutex<HashMap<String, Subscriber>>,
    sink: Arc<dyn EventSink>,
    defer_period: Duration,
    defer_until: Mutex<Option<Instant>>,
    default_timeout: Duration,
}

impl std::fmt::Debug for UpnpEventManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpnpEventManager")
            .field("topics", &self.handlers.read().keys().collect::<Vec<_>>())
            .field("subscribers", &self.subscribers.lock().len())
            .field("defer_period", &self.defer_period)
            .finish()
    }
}

impl UpnpEventManager {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            flushed: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(HashMap::new()),
            sink,
            defer_period: DEFAULT_DEFER_PERIOD,
            defer_until: Mutex::new(None),
            default_timeout: DEFAULT_SUBSCRIPTION_TIMEOUT,
        }
    }

    pub fn with_defer_period(mut self, period: Duration) -> Self {
        self.defer_period = period;
        self
    }

    pub fn with_subscription_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn register_handler(&self, handler: Arc<dyn UpnpEventHandler>) {
        let topic = handler.topic().to_string();
        self.flushed
            .lock()
            .insert(topic.clone(), handler.update_count());
        if self.handlers.write().insert(topic.clone(), handler).is_some() {
            warn!(topic = %topic, "Event handler replaced");
        }
        debug!(topic = %topic, "Event handler registered");
    }

    /// Retire le handler d'un topic et ses abonnés
    pub fn unregister_handler(&self, topic: &str) -> Option<Arc<dyn UpnpEventHandler>> {
        let handler = self.handlers.write().remove(topic)?;
        self.flushed.lock().remove(topic);

        let removed: Vec<Subscriber> = {
            let mut subscribers = self.subscribers.lock();
            let sids: Vec<String> = subscribers
                .values()
                .filter(|s| s.topic == topic)
                .map(|s| s.sid.clone())
                .collect();
            sids.iter().filter_map(|sid| subscribers.remove(sid)).collect()
        };
        for subscriber in &removed {
            self.sink.forget(&subscriber.sid);
            handler.notify_subscribed(subscriber, false);
        }

        Some(handler)
    }

    pub fn handler(&self, topic: &str) -> Option<Arc<dyn UpnpEventHandler>> {
        self.handlers.read().get(topic).cloned()
    }

    pub fn topics(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Signale une modification du topic ; sans handler, ne fait rien
    pub fn inc_update_count(&self, topic: &str) {
        match self.handler(topic) {
            Some(handler) => handler.inc_update_count(),
            None => trace!(topic, "No handler for topic, update ignored"),
        }
    }

    pub fn update_count(&self, topic: &str) -> Option<u32> {
        self.handler(topic).map(|h| h.update_count())
    }

    /// Nouvel abonnement ; l'évènement initial (SEQ 0) est livré aussitôt
    pub fn subscribe(
        &self,
        topic: &str,
        identity: CallerIdentity,
        callback: &str,
        timeout: Option<Duration>,
    ) -> Result<Subscriber, EventError> {
        let handler = self
            .handler(topic)
            .ok_or_else(|| EventError::UnknownTopic(topic.to_string()))?;
        let callback = super::parse_callback(callback)?;

        let mut subscriber = Subscriber::new(
            topic,
            identity,
            callback,
            timeout.unwrap_or(self.default_timeout),
        );
        handler.notify_subscribed(&subscriber, true);

        let seq = subscriber.next_seq();
        self.subscribers
            .lock()
            .insert(subscriber.sid.clone(), subscriber.clone());

        info!(
            "🔒 New subscription: SID={}, topic={}, callback={}, timeout={:?}",
            subscriber.sid, topic, subscriber.callback, subscriber.timeout
        );

        self.deliver(handler.as_ref(), &subscriber, seq);
        Ok(subscriber)
    }

    pub fn renew(&self, sid: &str, timeout: Option<Duration>) -> Result<Subscriber, EventError> {
        let mut subscribers = self.subscribers.lock();
        let subscriber = subscribers
            .get_mut(sid)
            .ok_or_else(|| EventError::UnknownSid(sid.to_string()))?;
        subscriber.renew(timeout.unwrap_or(self.default_timeout));
        info!("♻️ Renewed SID {} for {:?}", sid, subscriber.timeout);
        Ok(subscriber.clone())
    }

    pub fn unsubscribe(&self, sid: &str) -> Result<(), EventError> {
        let subscriber = self
            .subscribers
            .lock()
            .remove(sid)
            .ok_or_else(|| EventError::UnknownSid(sid.to_string()))?;
        info!("❌ Unsubscribe SID={}", sid);
        self.sink.forget(sid);

        if let Some(handler) = self.handler(&subscriber.topic) {
            handler.notify_subscribed(&subscriber, false);
        }
        Ok(())
    }

    pub fn subscriber(&self, sid: &str) -> Option<Subscriber> {
        self.subscribers.lock().get(sid).cloned()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .lock()
            .values()
            .filter(|s| s.topic == topic)
            .count()
    }

    /// Repousse le prochain envoi d'au moins la période de coalescence
    pub fn defer_events(&self) {
        *self.defer_until.lock() = Some(Instant::now() + self.defer_period);
    }

    pub fn is_deferred(&self) -> bool {
        matches!(*self.defer_until.lock(), Some(until) if Instant::now() < until)
    }

    /// Envoie les évènements des topics modifiés depuis le dernier envoi
    ///
    /// Appelé sur le tick périodique du renderer. Les abonnements expirés
    /// sont retirés au passage. Retourne le nombre de notifications livrées.
    pub fn send_events(&self) -> usize {
        {
            let mut defer_until = self.defer_until.lock();
            match *defer_until {
                Some(until) if Instant::now() < until => {
                    trace!("Events deferred");
                    return 0;
                }
                Some(_) => *defer_until = None,
                None => {}
            }
        }

        self.expire_subscriptions();

        let handlers: Vec<Arc<dyn UpnpEventHandler>> =
            self.handlers.read().values().cloned().collect();

        let mut delivered = 0;
        for handler in handlers {
            let topic = handler.topic();
            let count = handler.update_count();
            {
                let mut flushed = self.flushed.lock();
                if flushed.get(topic) == Some(&count) {
                    continue;
                }
                flushed.insert(topic.to_string(), count);
            }

            let targets: Vec<(Subscriber, u32)> = {
                let mut subscribers = self.subscribers.lock();
                subscribers
                    .values_mut()
                    .filter(|s| s.topic == topic)
                    .map(|s| {
                        let seq = s.next_seq();
                        (s.clone(), seq)
                    })
                    .collect()
            };

            debug!(topic, count, subscribers = targets.len(), "Flushing events");
            for (subscriber, seq) in targets {
                if self.deliver(handler.as_ref(), &subscriber, seq) {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    fn expire_subscriptions(&self) {
        let now = Instant::now();
        let expired: Vec<Subscriber> = {
            let mut subscribers = self.subscribers.lock();
            let sids: Vec<String> = subscribers
                .values()
                .filter(|s| s.is_expired(now))
                .map(|s| s.sid.clone())
                .collect();
            sids.iter().filter_map(|sid| subscribers.remove(sid)).collect()
        };

        for subscriber in expired {
            info!("⌛ Subscription {} expired", subscriber.sid);
            self.sink.forget(&subscriber.sid);
            if let Some(handler) = self.handler(&subscriber.topic) {
                handler.notify_subscribed(&subscriber, false);
            }
        }
    }

    fn deliver(&self, handler: &dyn UpnpEventHandler, subscriber: &Subscriber, seq: u32) -> bool {
        let content = handler.event_content(subscriber);
        let body = match build_propertyset(&content) {
            Ok(body) => body,
            Err(e) => {
                error!("❌ Unable to build {} event body: {}", subscriber.topic, e);
                return false;
            }
        };

        self.sink.deliver(EventNotification {
            sid: subscriber.sid.clone(),
            topic: subscriber.topic.clone(),
            callback: subscriber.callback.clone(),
            seq,
            body,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MemoryEventSink, UpdateCounter};

    #[derive(Default)]
    struct TestTopic {
        counter: UpdateCounter,
        subscribed: Mutex<Vec<(String, bool)>>,
    }

    impl UpnpEventHandler for TestTopic {
        fn topic(&self) -> &'static str {
            "Test"
        }

        fn update_count(&self) -> u32 {
            self.counter.get()
        }

        fn inc_update_count(&self) {
            self.counter.inc();
        }

        fn event_content(&self, subscriber: &Subscriber) -> Vec<(String, String)> {
            vec![
                ("Count".to_string(), self.counter.get().to_string()),
                ("Caller".to_string(), subscriber.identity.key()),
            ]
        }

        fn notify_subscribed(&self, subscriber: &Subscriber, subscribed: bool) {
            self.subscribed
                .lock()
                .push((subscriber.sid.clone(), subscribed));
        }
    }

    fn manager() -> (UpnpEventManager, Arc<MemoryEventSink>, Arc<TestTopic>) {
        let sink = Arc::new(MemoryEventSink::new());
        let manager = UpnpEventManager::new(sink.clone()).with_defer_period(Duration::from_secs(60));
        let topic = Arc::new(TestTopic::default());
        manager.register_handler(topic.clone());
        (manager, sink, topic)
    }

    fn caller() -> CallerIdentity {
        CallerIdentity::new("10.0.0.2", "Kazoo")
    }

    #[test]
    fn test_subscribe_sends_initial_event() {
        let (manager, sink, topic) = manager();
        let sub = manager
            .subscribe("Test", caller(), "<http://10.0.0.2/cb>", None)
            .unwrap();

        let sent = sink.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].seq, 0);
        assert_eq!(sent[0].sid, sub.sid);
        assert_eq!(sent[0].callback, "http://10.0.0.2/cb");
        assert!(sent[0].body.contains("<Caller>10.0.0.2:Kazoo</Caller>"));
        assert_eq!(*topic.subscribed.lock(), vec![(sub.sid.clone(), true)]);
        assert_eq!(sub.timeout, DEFAULT_SUBSCRIPTION_TIMEOUT);
    }

    #[test]
    fn test_subscribe_errors() {
        let (manager, _, _) = manager();
        assert_eq!(
            manager
                .subscribe("Nope", caller(), "<http://h/cb>", None)
                .unwrap_err(),
            EventError::UnknownTopic("Nope".to_string())
        );
        assert!(matches!(
            manager.subscribe("Test", caller(), "", None),
            Err(EventError::BadCallback(_))
        ));
        assert_eq!(
            manager.unsubscribe("uuid:nope"),
            Err(EventError::UnknownSid("uuid:nope".to_string()))
        );
    }

    #[test]
    fn test_send_events_only_flushes_changed_topics() {
        let (manager, sink, _) = manager();
        let sub = manager
            .subscribe("Test", caller(), "<http://h/cb>", None)
            .unwrap();
        sink.take();

        assert_eq!(manager.send_events(), 0);

        // Plusieurs mutations, une seule notification
        manager.inc_update_count("Test");
        manager.inc_update_count("Test");
        manager.inc_update_count("Unknown");
        assert_eq!(manager.send_events(), 1);

        let sent = sink.take();
        assert_eq!(sent[0].seq, 1);
        assert_eq!(sent[0].sid, sub.sid);
        assert!(sent[0].body.contains("<Count>2</Count>"));

        assert_eq!(manager.send_events(), 0);
        manager.inc_update_count("Test");
        manager.send_events();
        assert_eq!(sink.take()[0].seq, 2);
    }

    #[test]
    fn test_defer_events() {
        let (manager, sink, _) = manager();
        manager
            .subscribe("Test", caller(), "<http://h/cb>", None)
            .unwrap();
        sink.take();

        manager.inc_update_count("Test");
        manager.defer_events();
        assert!(manager.is_deferred());
        assert_eq!(manager.send_events(), 0);
        assert!(sink.is_empty());
        assert_eq!(manager.update_count("Test"), Some(1));
    }

    #[test]
    fn test_deferral_expires() {
        let sink = Arc::new(MemoryEventSink::new());
        let manager = UpnpEventManager::new(sink.clone()).with_defer_period(Duration::ZERO);
        let topic = Arc::new(TestTopic::default());
        manager.register_handler(topic.clone());
        manager
            .subscribe("Test", caller(), "<http://h/cb>", None)
            .unwrap();

        topic.inc_update_count();
        manager.defer_events();
        assert_eq!(manager.send_events(), 1);
        assert!(!manager.is_deferred());
    }

    #[test]
    fn test_expired_subscriptions_are_dropped() {
        let (manager, sink, topic) = manager();
        let sub = manager
            .subscribe("Test", caller(), "<http://h/cb>", Some(Duration::ZERO))
            .unwrap();
        sink.take();

        manager.inc_update_count("Test");
        assert_eq!(manager.send_events(), 0);
        assert!(manager.subscriber(&sub.sid).is_none());
        assert_eq!(topic.subscribed.lock().last(), Some(&(sub.sid.clone(), false)));
    }

    #[test]
    fn test_renew_and_unsubscribe() {
        let (manager, _, topic) = manager();
        let sub = manager
            .subscribe("Test", caller(), "<http://h/cb>", Some(Duration::from_secs(10)))
            .unwrap();

        let renewed = manager.renew(&sub.sid, Some(Duration::from_secs(300))).unwrap();
        assert_eq!(renewed.timeout, Duration::from_secs(300));
        assert_eq!(manager.subscriber_count("Test"), 1);

        manager.unsubscribe(&sub.sid).unwrap();
        assert_eq!(manager.subscriber_count("Test"), 0);
        assert_eq!(topic.subscribed.lock().len(), 2);
    }

    #[test]
    fn test_unregister_handler() {
        let (manager, _, topic) = manager();
        manager
            .subscribe("Test", caller(), "<http://h/cb>", None)
            .unwrap();
        assert!(manager.unregister_handler("Test").is_some());
        assert_eq!(manager.subscriber_count("Test"), 0);
        assert!(manager.topics().is_empty());
        assert_eq!(topic.subscribed.lock().len(), 2);
        assert!(manager.unregister_handler("Test").is_none());
    }
}
