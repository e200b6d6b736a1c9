use pmoconfig::{Config, get_config};
use pmomediarenderer::{
    MEDIA_RENDERER_DEVICE_TYPE, MediaRendererBuilder, MediaRendererConfigExt, SoftRenderer,
};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, layer::SubscriberExt, reload,
    util::SubscriberInitExt,
};

/// Niveau minimal lu dans la configuration (`host.logger.min_level`)
fn configured_level(config: &Config) -> LevelFilter {
    match config.get_log_min_level() {
        Ok(level) => level.parse().unwrap_or(LevelFilter::INFO),
        Err(_) => LevelFilter::INFO,
    }
}

/// Filtre `RUST_LOG`, s'il est défini et valide
fn env_filter(rust_log: Option<&str>) -> Option<EnvFilter> {
    let directives = rust_log.map(str::trim).filter(|d| !d.is_empty())?;
    match EnvFilter::try_new(directives) {
        Ok(filter) => Some(filter),
        Err(e) => {
            eprintln!("⚠️ Ignoring invalid RUST_LOG '{}': {}", directives, e);
            None
        }
    }
}

/// Niveau de base : `RUST_LOG` décide seul quand il est présent
fn base_level(env: Option<&EnvFilter>, configured: LevelFilter) -> LevelFilter {
    match env {
        Some(_) => LevelFilter::TRACE,
        None => configured,
    }
}

fn init_logging(config: &Config) -> reload::Handle<LevelFilter, Registry> {
    let env = env_filter(std::env::var("RUST_LOG").ok().as_deref());
    let (filter, reload_handle) =
        reload::Layer::new(base_level(env.as_ref(), configured_level(config)));

    let subscriber = Registry::default().with(filter).with(env);

    if config.get_log_enable_console().unwrap_or(true) {
        subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    } else {
        subscriber.init();
    }

    reload_handle
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();
    let _log_handle = init_logging(&config);

    // ========== PHASE 1 : Assemblage du renderer ==========

    info!("🎛️ Building {}...", MEDIA_RENDERER_DEVICE_TYPE);
    let device = MediaRendererBuilder::from_config(&config)?.build(SoftRenderer::new)?;
    info!(
        "✅ {} ready (udn: {}, {} tracks max)",
        device.friendly_name(),
        device.udn(),
        device.playlist_service().capacity()
    );

    // ========== PHASE 2 : Horloge du renderer ==========

    let renderer = device.renderer().clone();
    let period = config.get_idle_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last = tokio::time::Instant::now();
        loop {
            interval.tick().await;
            let now = tokio::time::Instant::now();
            renderer.tick(now - last);
            last = now;
        }
    });

    // ========== PHASE 3 : Démarrage du serveur ==========

    let addr = SocketAddr::from(([0, 0, 0, 0], config.get_http_port()));
    let router = pmoupnp::upnp_router(device.services(), device.events().clone());
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🌐 Serving UPnP control on {}", config.get_base_url());
    info!("Press Ctrl+C to stop...");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C reçu, arrêt gracieux");
    })
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_without_rust_log() {
        assert!(env_filter(None).is_none());
        assert!(env_filter(Some("  ")).is_none());
        assert_eq!(base_level(None, LevelFilter::WARN), LevelFilter::WARN);
    }

    #[test]
    fn test_rust_log_can_raise_the_level() {
        let env = env_filter(Some("debug"));
        assert!(env.is_some());
        assert_eq!(base_level(env.as_ref(), LevelFilter::WARN), LevelFilter::TRACE);
        assert_eq!(env.and_then(|f| f.max_level_hint()), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_invalid_rust_log_falls_back() {
        assert!(env_filter(Some("pmoupnp=notalevel")).is_none());
    }
}
