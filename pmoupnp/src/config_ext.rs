//! Extension pour intégrer la configuration UPnP dans pmoconfig
//!
//! Ce module fournit le trait `UpnpConfigExt` qui ajoute à
//! `pmoconfig::Config` les réglages des évènements GENA.

use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::{Number, Value};
use std::time::Duration;

const DEFAULT_EVENTS_DEFER_MS: usize = 1000;
const DEFAULT_SUBSCRIPTION_TIMEOUT_SECS: usize = 1800;

const EVENTS_DEFER_PATH: &[&str] = &["upnp", "events", "defer_ms"];
const SUBSCRIPTION_TIMEOUT_PATH: &[&str] = &["upnp", "events", "subscription_timeout"];

/// Trait d'extension pour ajouter la configuration UPnP à pmoconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::get_config;
/// use pmoupnp::UpnpConfigExt;
///
/// let config = get_config();
/// let events = UpnpEventManager::new(sink)
///     .with_defer_period(config.get_events_defer_period());
/// ```
pub trait UpnpConfigExt {
    /// Délai de coalescence des évènements différés (défaut: 1000 ms)
    fn get_events_defer_period(&self) -> Duration;

    fn set_events_defer_ms(&self, ms: u64) -> Result<()>;

    /// Durée d'abonnement quand le client n'en demande pas (défaut: 1800 s)
    fn get_subscription_timeout(&self) -> Duration;

    fn set_subscription_timeout(&self, seconds: u64) -> Result<()>;
}

impl UpnpConfigExt for Config {
    fn get_events_defer_period(&self) -> Duration {
        let ms = self.get_usize_or(EVENTS_DEFER_PATH, DEFAULT_EVENTS_DEFER_MS);
        Duration::from_millis(ms as u64)
    }

    fn set_events_defer_ms(&self, ms: u64) -> Result<()> {
        self.set_value(EVENTS_DEFER_PATH, Value::Number(Number::from(ms)))
    }

    fn get_subscription_timeout(&self) -> Duration {
        let secs = self.get_usize_or(SUBSCRIPTION_TIMEOUT_PATH, DEFAULT_SUBSCRIPTION_TIMEOUT_SECS);
        Duration::from_secs(secs as u64)
    }

    fn set_subscription_timeout(&self, seconds: u64) -> Result<()> {
        self.set_value(SUBSCRIPTION_TIMEOUT_PATH, Value::Number(Number::from(seconds)))
    }
}
