//! Track : une piste (URI + métadonnées DIDL-Lite) et sa place dans la playlist courante

use pmodidl::TrackMetadata;
use std::sync::Arc;
use tracing::debug;

/// Identifiant stable d'une piste dans une [`CurrentPlaylist`](crate::CurrentPlaylist)
///
/// Attribué de façon monotone à la matérialisation ou à l'insertion, jamais
/// réutilisé pendant la durée de vie de la playlist courante.
pub type OpenId = u32;

/// Extensions de fichiers audio reconnues quand aucun type MIME n'est connu
const AUDIO_EXTENSIONS: &[(&str, &str)] = &[
    ("flac", "audio/flac"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("aif", "audio/aiff"),
    ("aiff", "audio/aiff"),
    ("m4a", "audio/x-m4a"),
    ("aac", "audio/aac"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/ogg"),
    ("wma", "audio/x-ms-wma"),
    ("dsf", "audio/x-dsf"),
];

/// Nature du média d'une piste
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    /// Flux audio, avec son type MIME
    Audio(String),
    /// Type connu mais non audio (vidéo, image, ...)
    Other(String),
    /// Aucune information : le renderer tentera la lecture
    Unknown,
}

impl MediaType {
    /// Détermine le type depuis le MIME annoncé, sinon depuis l'extension de l'URI
    pub fn detect(mime: Option<&str>, uri: &str) -> Self {
        if let Some(mime) = mime {
            let mime = mime.to_ascii_lowercase();
            return if mime.starts_with("audio/") || mime == "application/ogg" {
                MediaType::Audio(mime)
            } else {
                MediaType::Other(mime)
            };
        }

        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let extension = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.contains('/'));

        match extension {
            Some(ext) => AUDIO_EXTENSIONS
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, mime)| MediaType::Audio(mime.to_string()))
                .unwrap_or(MediaType::Unknown),
            None => MediaType::Unknown,
        }
    }

    /// Le renderer sait-il lire ce média ?
    pub fn is_supported(&self) -> bool {
        !matches!(self, MediaType::Other(_))
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            MediaType::Audio(m) | MediaType::Other(m) => Some(m),
            MediaType::Unknown => None,
        }
    }
}

/// Une piste : URI, fragment DIDL-Lite d'origine et champs extraits
///
/// La position et l'open_id ne sont pas portés par la piste : ils sont
/// maintenus par la playlist qui la contient (voir [`PlaylistEntry`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    uri: String,
    metadata: String,
    info: TrackMetadata,
    media_type: MediaType,
}

impl Track {
    /// Crée une piste à partir de son URI et de ses métadonnées DIDL-Lite
    ///
    /// Des métadonnées vides ou invalides ne sont pas une erreur : la piste
    /// reste lisible, seuls les champs descriptifs sont absents.
    pub fn new(uri: impl Into<String>, metadata: impl Into<String>) -> Self {
        let uri = uri.into();
        let metadata = metadata.into();

        let info = if metadata.trim().is_empty() {
            TrackMetadata::default()
        } else {
            TrackMetadata::from_didl(&metadata).unwrap_or_else(|err| {
                debug!(uri = %uri, "Unable to parse track metadata: {}", err);
                TrackMetadata::default()
            })
        };
        let media_type = MediaType::detect(info.mime_type.as_deref(), &uri);

        Self {
            uri,
            metadata,
            info,
            media_type,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Fragment DIDL-Lite tel que reçu
    pub fn metadata(&self) -> &str {
        &self.metadata
    }

    pub fn info(&self) -> &TrackMetadata {
        &self.info
    }

    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn album(&self) -> Option<&str> {
        self.info.album.as_deref()
    }

    /// Durée en millisecondes, 0 si inconnue
    pub fn duration_ms(&self) -> u64 {
        self.info.duration_ms.unwrap_or(0)
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    pub fn is_playable(&self) -> bool {
        self.media_type.is_supported()
    }
}

/// Une piste matérialisée dans la playlist courante
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistEntry {
    pub open_id: OpenId,
    /// Position 1-based au moment de la lecture
    pub position: usize,
    pub track: Arc<Track>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_from_mime() {
        assert_eq!(
            MediaType::detect(Some("audio/FLAC"), "http://x/1"),
            MediaType::Audio("audio/flac".into())
        );
        assert!(!MediaType::detect(Some("video/mp4"), "http://x/1.mp4").is_supported());
    }

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(
            MediaType::detect(None, "http://host/music/track.mp3?token=1"),
            MediaType::Audio("audio/mpeg".into())
        );
        assert_eq!(MediaType::detect(None, "http://radio.host/stream"), MediaType::Unknown);
        assert!(MediaType::Unknown.is_supported());
    }

    #[test]
    fn test_track_with_invalid_metadata() {
        let track = Track::new("http://host/a.flac", "<DIDL-Lite");
        assert_eq!(track.title(), "");
        assert_eq!(track.duration_ms(), 0);
        assert!(track.is_playable());
    }
}
