//! Abonnements GENA

use super::EventError;
use crate::actions::CallerIdentity;
use std::time::{Duration, Instant};

/// Un abonnement à un topic
#[derive(Debug, Clone)]
pub struct Subscriber {
    /// Identifiant `uuid:<v4>`
    pub sid: String,
    pub topic: String,
    pub identity: CallerIdentity,
    /// URL de livraison des `NOTIFY`
    pub callback: String,
    pub timeout: Duration,
    pub expires_at: Instant,
    seq: u32,
}

impl Subscriber {
    pub fn new(
        topic: impl Into<String>,
        identity: CallerIdentity,
        callback: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            sid: format!("uuid:{}", uuid::Uuid::new_v4()),
            topic: topic.into(),
            identity,
            callback: callback.into(),
            timeout,
            expires_at: Instant::now() + timeout,
            seq: 0,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn renew(&mut self, timeout: Duration) {
        self.timeout = timeout;
        self.expires_at = Instant::now() + timeout;
    }

    /// Numéro de séquence du prochain évènement
    ///
    /// Le premier évènement porte 0 ; après `u32::MAX` la séquence reprend à 1.
    pub fn next_seq(&mut self) -> u32 {
        let seq = self.seq;
        self.seq = self.seq.checked_add(1).unwrap_or(1);
        seq
    }

    /// Valeur de l'en-tête `TIMEOUT` de la réponse
    pub fn timeout_header(&self) -> String {
        format!("Second-{}", self.timeout.as_secs())
    }
}

/// Première URL HTTP de l'en-tête `CALLBACK` (`<http://...><http://...>`)
pub fn parse_callback(header: &str) -> Result<String, EventError> {
    header
        .split('<')
        .filter_map(|part| part.split_once('>').map(|(url, _)| url.trim()))
        .find(|url| url.starts_with("http://"))
        .map(str::to_string)
        .ok_or_else(|| EventError::BadCallback(header.to_string()))
}

/// Durée de l'en-tête `TIMEOUT` (`Second-1800`)
///
/// `None` pour `infinite`, une valeur absente ou mal formée : l'appelant
/// applique alors sa durée par défaut.
pub fn parse_timeout(header: &str) -> Option<Duration> {
    let (prefix, seconds) = header.trim().split_once('-')?;
    if !prefix.eq_ignore_ascii_case("Second") {
        return None;
    }
    seconds.trim().parse().ok().map(Duration::from_secs)
}
