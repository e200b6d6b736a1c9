//! Extraction des champs d'une piste et résumé des regroupements par album

use crate::{parse_duration, DIDLLite, Item, MediaMetadataParser};
use tracing::debug;

/// Champs d'une piste utiles au renderer, extraits d'un fragment DIDL-Lite
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackMetadata {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub genres: Vec<String>,
    pub year: Option<String>,
    pub album_art: Option<String>,
    pub duration_ms: Option<u64>,
    pub mime_type: Option<String>,
    pub uri: Option<String>,
}

impl TrackMetadata {
    /// Parse un document DIDL-Lite et décrit son premier item
    ///
    /// Un document sans item donne des métadonnées vides.
    pub fn from_didl(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        let didl = DIDLLite::parse(xml)?;
        match didl.first_item() {
            Some(item) => Ok(Self::from_item(item)),
            None => {
                debug!("DIDL-Lite document without item");
                Ok(Self::default())
            }
        }
    }

    pub fn from_item(item: &Item) -> Self {
        let resource = item.primary_resource();
        Self {
            id: item.id.clone(),
            parent_id: item.parent_id.clone(),
            title: item.title.clone(),
            artist: item.artist().map(str::to_string),
            album: item.album.clone().filter(|a| !a.is_empty()),
            album_artist: item.album_artist().map(str::to_string),
            genres: item.genres.iter().filter(|g| !g.is_empty()).cloned().collect(),
            year: item
                .date
                .as_deref()
                .and_then(|d| d.get(..4))
                .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
                .map(str::to_string),
            album_art: item.album_art.clone().filter(|a| !a.is_empty()),
            duration_ms: resource
                .and_then(|r| r.duration.as_deref())
                .and_then(parse_duration),
            mime_type: resource.and_then(|r| r.mime_type()).map(str::to_string),
            uri: resource.map(|r| r.url.trim().to_string()).filter(|u| !u.is_empty()),
        }
    }

    /// Artiste représentatif pour un album : l'artiste de l'album, sinon celui de la piste
    pub fn display_artist(&self) -> Option<&str> {
        self.album_artist.as_deref().or(self.artist.as_deref())
    }
}

/// Résumé d'un groupe de pistes consécutives partageant le même album
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumSummary {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub album_art: Option<String>,
    pub year: Option<String>,
    pub num_tracks: usize,
    pub duration_ms: u64,
}
