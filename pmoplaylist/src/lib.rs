//! # pmoplaylist - Playlist courante d'un renderer OpenHome
//!
//! Cette crate fournit le moteur de playlist du renderer :
//! - une playlist vivante adressée par position et par identifiant stable (open_id)
//! - la représentation paresseuse d'une playlist source (locale, dossier, ...)
//! - une production paginée des pistes, avec regroupement optionnel par album
//! - l'encodage des `IdArray` et des `TrackList` OpenHome
//!
//! # Architecture
//!
//! - **CurrentPlaylist** : la playlist exposée, seule source de vérité
//! - **Playlist** : capacité commune des playlists sources ([`LocalPlaylist`], ...)
//! - **Fetcher** : curseur de production reprenable, utilisé par les exposers
//! - **ExposureNotifier / ChangeNotifier** : ce que la playlist signale au reste
//!   du renderer, sans en dépendre
//!
//! # Exemple d'utilisation
//!
//! ```
//! use pmoplaylist::{CurrentPlaylist, LocalPlaylistSource, NoopNotifier, Track};
//! use std::sync::Arc;
//!
//! let source = LocalPlaylistSource::new();
//! source.save("jazz", vec![Track::new("http://host/1.flac", "")]);
//!
//! let mut current = CurrentPlaylist::new(Arc::new(NoopNotifier), Arc::new(NoopNotifier));
//! current.set_associated_playlist(Box::new(source.open("jazz")));
//!
//! let entry = current.insert_after(0, Track::new("http://host/2.flac", "")).unwrap();
//! assert_eq!(entry.position, 1);
//! assert_eq!(current.num_tracks(), 2);
//! ```

mod current;
mod error;
mod fetcher;
mod id_array;
mod notify;
mod playlist;
mod track;

// Réexports publics
pub use current::CurrentPlaylist;
pub use error::{PlaylistError, Result};
pub use fetcher::{AlbumGroup, FetchRecord, FetchResult, Fetcher, FetcherSource, VARIOUS_ARTISTS};
pub use id_array::{decode_id_array, encode_id_array, parse_id_list};
pub use notify::{ChangeEvent, ChangeNotifier, ExposureFilter, ExposureNotifier, NoopNotifier};
pub use playlist::{LocalPlaylist, LocalPlaylistSource, Playlist};
pub use track::{MediaType, OpenId, PlaylistEntry, Track};
