//! # pmodidl - DIDL-Lite Parser
//!
//! Parser et utilitaires pour le format DIDL-Lite utilisé dans UPnP/DLNA.
//!
//! Le renderer reçoit les métadonnées des pistes sous forme de fragments
//! DIDL-Lite (argument `Metadata` de `Insert`, `CurrentURIMetaData` de
//! `SetAVTransportURI`). Ce crate fournit :
//!
//! - le modèle serde des documents ([`DIDLLite`], [`Item`], [`Container`]) ;
//! - l'extraction des champs utiles au renderer ([`TrackMetadata`]) ;
//! - la conversion des durées `H:MM:SS[.fff]` ([`parse_duration`], [`format_duration`]) ;
//! - le résumé d'un regroupement par album ([`AlbumSummary`]).

mod duration;
mod metadata;

pub use duration::{format_duration, parse_duration};
pub use metadata::{AlbumSummary, TrackMetadata};

use serde::{Deserialize, Serialize};

/// Trait pour tout parser de métadonnées média
pub trait MediaMetadataParser: Sized {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Parse une chaîne de métadonnées
    fn parse(input: &str) -> Result<Self, Self::Error>;

    /// Retourne le format du parser
    fn format_name() -> &'static str;
}

impl MediaMetadataParser for DIDLLite {
    type Error = quick_xml::de::DeError;

    fn parse(input: &str) -> Result<Self, Self::Error> {
        quick_xml::de::from_str(input)
    }

    fn format_name() -> &'static str {
        "DIDL-Lite"
    }
}

// ============= Structures DIDL-Lite =============

/// Racine d'un document DIDL-Lite
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DIDLLite {
    #[serde(rename = "@xmlns", default)]
    pub xmlns: String,

    #[serde(rename = "@xmlns:upnp", skip_serializing_if = "Option::is_none")]
    pub xmlns_upnp: Option<String>,

    #[serde(rename = "@xmlns:dc", skip_serializing_if = "Option::is_none")]
    pub xmlns_dc: Option<String>,

    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// Conteneur (album, dossier, playlist)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID")]
    pub parent_id: String,

    #[serde(rename = "@restricted", skip_serializing_if = "Option::is_none")]
    pub restricted: Option<String>,

    #[serde(rename = "@childCount", skip_serializing_if = "Option::is_none")]
    pub child_count: Option<String>,

    #[serde(rename = "dc:title", alias = "title")]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class")]
    pub class: String,

    #[serde(
        rename = "upnp:artist",
        alias = "artist",
        skip_serializing_if = "Option::is_none"
    )]
    pub artist: Option<String>,

    #[serde(
        rename = "upnp:genre",
        alias = "genre",
        skip_serializing_if = "Option::is_none"
    )]
    pub genre: Option<String>,

    #[serde(
        rename = "upnp:albumArtURI",
        alias = "albumArtURI",
        skip_serializing_if = "Option::is_none"
    )]
    pub album_art: Option<String>,

    #[serde(
        rename = "dc:date",
        alias = "date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,

    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// Item représentant un objet audio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "@id", default)]
    pub id: String,

    #[serde(rename = "@parentID", default)]
    pub parent_id: String,

    #[serde(rename = "@restricted", skip_serializing_if = "Option::is_none")]
    pub restricted: Option<String>,

    #[serde(rename = "dc:title", alias = "title", default)]
    pub title: String,

    #[serde(
        rename = "dc:creator",
        alias = "creator",
        skip_serializing_if = "Option::is_none"
    )]
    pub creator: Option<String>,

    #[serde(rename = "upnp:class", alias = "class", default)]
    pub class: String,

    /// Artistes, avec leur rôle éventuel (`AlbumArtist`, `Performer`, ...)
    #[serde(rename = "upnp:artist", alias = "artist", default)]
    pub artists: Vec<Artist>,

    #[serde(
        rename = "upnp:album",
        alias = "album",
        skip_serializing_if = "Option::is_none"
    )]
    pub album: Option<String>,

    #[serde(rename = "upnp:genre", alias = "genre", default)]
    pub genres: Vec<String>,

    #[serde(
        rename = "upnp:albumArtURI",
        alias = "albumArtURI",
        skip_serializing_if = "Option::is_none"
    )]
    pub album_art: Option<String>,

    #[serde(
        rename = "dc:date",
        alias = "date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,

    #[serde(
        rename = "upnp:originalTrackNumber",
        alias = "originalTrackNumber",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_track_number: Option<String>,

    #[serde(rename = "res", default)]
    pub resources: Vec<Resource>,
}

/// Artiste d'un item, `role` absent pour l'artiste principal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artist {
    #[serde(rename = "@role", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(rename = "$text", default)]
    pub name: String,
}

/// Ressource média (fichier audio)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "@protocolInfo", default)]
    pub protocol_info: String,

    #[serde(rename = "@bitsPerSample", skip_serializing_if = "Option::is_none")]
    pub bits_per_sample: Option<String>,

    #[serde(rename = "@sampleFrequency", skip_serializing_if = "Option::is_none")]
    pub sample_frequency: Option<String>,

    #[serde(rename = "@nrAudioChannels", skip_serializing_if = "Option::is_none")]
    pub nr_audio_channels: Option<String>,

    #[serde(rename = "@duration", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(rename = "$text", default)]
    pub url: String,
}

// ============= Implémentation des méthodes =============

impl DIDLLite {
    /// Itère sur tous les items, y compris ceux des conteneurs imbriqués
    pub fn all_items(&self) -> impl Iterator<Item = &Item> {
        AllItemsIter::new(&self.containers, &self.items)
    }

    /// Premier item du document, c'est celui qui décrit la piste
    pub fn first_item(&self) -> Option<&Item> {
        self.all_items().next()
    }
}

impl Item {
    /// Artiste principal : premier artiste sans rôle, sinon `dc:creator`
    pub fn artist(&self) -> Option<&str> {
        self.artists
            .iter()
            .find(|a| a.role.is_none() || a.role.as_deref() == Some("Performer"))
            .map(|a| a.name.as_str())
            .or(self.creator.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Artiste de l'album (`upnp:artist role="AlbumArtist"`)
    pub fn album_artist(&self) -> Option<&str> {
        self.artists
            .iter()
            .find(|a| a.role.as_deref() == Some("AlbumArtist"))
            .map(|a| a.name.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Itère sur les ressources audio uniquement
    pub fn audio_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(|r| r.protocol_info.contains("audio/"))
    }

    /// Retourne la ressource principale (première audio, sinon première disponible)
    pub fn primary_resource(&self) -> Option<&Resource> {
        self.audio_resources().next().or(self.resources.first())
    }
}

impl Resource {
    /// Type MIME extrait du `protocolInfo` (`http-get:*:audio/flac:*`)
    pub fn mime_type(&self) -> Option<&str> {
        self.protocol_info
            .split(':')
            .nth(2)
            .filter(|m| !m.is_empty() && *m != "*")
    }
}

// ============= Itérateurs personnalisés =============

struct AllItemsIter<'a> {
    containers: Vec<&'a Container>,
    current_items: std::slice::Iter<'a, Item>,
}

impl<'a> AllItemsIter<'a> {
    fn new(containers: &'a [Container], items: &'a [Item]) -> Self {
        Self {
            containers: containers.iter().rev().collect(),
            current_items: items.iter(),
        }
    }
}

impl<'a> Iterator for AllItemsIter<'a> {
    type Item = &'a Item;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current_items.next() {
                return Some(item);
            }

            let container = self.containers.pop()?;
            self.containers.extend(container.containers.iter().rev());
            self.current_items = container.items.iter();
        }
    }
}
