//! Extension pour intégrer la configuration du renderer dans pmoconfig

use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::{Number, Value};
use std::time::Duration;

const DEFAULT_FRIENDLY_NAME: &str = "PMO Renderer";
const DEFAULT_IDLE_INTERVAL_MS: usize = 500;
const DEFAULT_TRACKS_MAX: usize = 10_000;
const DEFAULT_EXPOSE_BATCH_SIZE: usize = 64;
const DEFAULT_EXPOSE_WORKERS: usize = 4;

/// Trait d'extension pour ajouter la configuration du renderer à pmoconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use pmoconfig::get_config;
/// use pmomediarenderer::MediaRendererConfigExt;
///
/// let config = get_config();
/// let tracks_max = config.get_tracks_max();
/// ```
pub trait MediaRendererConfigExt {
    /// Nom présenté aux control points (défaut: "PMO Renderer")
    fn get_renderer_friendly_name(&self) -> String;

    /// UDN du renderer, généré et conservé à la première lecture
    fn get_renderer_udn(&self) -> Result<String>;

    /// Période du tick du renderer (défaut: 500 ms)
    fn get_idle_interval(&self) -> Duration;

    /// Capacité maximale de la playlist (défaut: 10000)
    fn get_tracks_max(&self) -> usize;

    fn set_tracks_max(&self, tracks_max: usize) -> Result<()>;

    /// Pistes révélées par tâche d'exposition (défaut: 64)
    fn get_expose_batch_size(&self) -> usize;

    /// Tâches d'exposition simultanées (défaut: 4)
    fn get_expose_workers(&self) -> usize;

    /// Révéler la piste courante à chaque changement de playlist (défaut: true)
    fn get_expose_on_start(&self) -> bool;
}

impl MediaRendererConfigExt for Config {
    fn get_renderer_friendly_name(&self) -> String {
        self.get_string_or(&["renderer", "friendly_name"], DEFAULT_FRIENDLY_NAME)
    }

    fn get_renderer_udn(&self) -> Result<String> {
        self.get_device_udn("renderer", "openhome")
    }

    fn get_idle_interval(&self) -> Duration {
        let ms = self.get_usize_or(&["renderer", "idle_interval_ms"], DEFAULT_IDLE_INTERVAL_MS);
        Duration::from_millis(ms.max(1) as u64)
    }

    fn get_tracks_max(&self) -> usize {
        self.get_usize_or(&["playlist", "tracks_max"], DEFAULT_TRACKS_MAX)
    }

    fn set_tracks_max(&self, tracks_max: usize) -> Result<()> {
        self.set_value(
            &["playlist", "tracks_max"],
            Value::Number(Number::from(tracks_max as u64)),
        )
    }

    fn get_expose_batch_size(&self) -> usize {
        self.get_usize_or(&["playlist", "expose_batch_size"], DEFAULT_EXPOSE_BATCH_SIZE)
            .max(1)
    }

    fn get_expose_workers(&self) -> usize {
        self.get_usize_or(&["playlist", "expose_workers"], DEFAULT_EXPOSE_WORKERS)
            .max(1)
    }

    fn get_expose_on_start(&self) -> bool {
        match self.get_value(&["playlist", "expose_on_start"]) {
            Ok(Value::Bool(b)) => b,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.get_renderer_friendly_name(), "PMO Renderer");
        assert_eq!(config.get_idle_interval(), Duration::from_millis(500));
        assert_eq!(config.get_tracks_max(), 10_000);
        assert_eq!(config.get_expose_batch_size(), 64);
        assert_eq!(config.get_expose_workers(), 4);
        assert!(config.get_expose_on_start());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_yaml(
            "Renderer:\n  Friendly_Name: Salon\nplaylist:\n  expose_workers: 0\n  expose_on_start: false\n",
        )
        .unwrap();
        assert_eq!(config.get_renderer_friendly_name(), "Salon");
        assert_eq!(config.get_expose_workers(), 1);
        assert!(!config.get_expose_on_start());

        config.set_tracks_max(3).unwrap();
        assert_eq!(config.get_tracks_max(), 3);

        let udn = config.get_renderer_udn().unwrap();
        assert_eq!(config.get_renderer_udn().unwrap(), udn);
    }
}
