//! # pmomediarenderer - Renderer OpenHome et AVTransport
//!
//! Cette crate assemble le cœur d'un renderer réseau : la playlist courante
//! partagée, les services UPnP qui la pilotent et le routage des évènements.
//!
//! # Architecture
//!
//! - **Services** : Playlist, Info et Time OpenHome, AVTransport UPnP AV
//! - **PlaylistMutator** : accès verrouillé à la [`CurrentPlaylist`](pmoplaylist::CurrentPlaylist)
//! - **Exposers** : ce que chaque control point abonné a déjà vu de la playlist
//! - **UpnpEventRouter** : classement des changements par topic, envoi sur le tick
//! - **Renderer** : capacité de lecture ; [`SoftRenderer`] en fournit une simulée
//!
//! # Device UPnP
//!
//! - Type : `urn:schemas-upnp-org:device:MediaRenderer:1`
//! - Services : Playlist:1, Info:1, Time:1 (OpenHome), AVTransport:1
//!
//! # Utilisation
//!
//! ```ignore
//! use pmoconfig::get_config;
//! use pmomediarenderer::{MediaRendererBuilder, SoftRenderer};
//!
//! let device = MediaRendererBuilder::from_config(&get_config())?
//!     .build(SoftRenderer::new)?;
//! let router = pmoupnp::upnp_router(device.services(), device.events().clone());
//! ```

pub mod avtransport;
pub mod config_ext;
pub mod device;
pub mod error;
pub mod exposer;
pub mod live;
pub mod openinfo;
pub mod openplaylist;
pub mod opentime;
pub mod renderer;
pub mod router;
pub mod soft_renderer;

pub use avtransport::AvTransportService;
pub use config_ext::MediaRendererConfigExt;
pub use device::{MediaRendererBuilder, MediaRendererDevice};
pub use error::{MutationError, RendererError, Result};
pub use exposer::{ExposerRegistry, ExposurePool, PlaylistExposer};
pub use live::{InsertOutcome, LivePlaylist, PlaylistMutator};
pub use openinfo::OpenInfoService;
pub use openplaylist::{OpenPlaylistService, PlaylistAction};
pub use opentime::OpenTimeService;
pub use renderer::{PlayMode, Renderer, TransportState};
pub use router::UpnpEventRouter;
pub use soft_renderer::SoftRenderer;

/// Type de device annoncé
pub const MEDIA_RENDERER_DEVICE_TYPE: &str = "urn:schemas-upnp-org:device:MediaRenderer:1";
