//! Production paginée et reprenable des enregistrements d'une playlist
//!
//! Un [`Fetcher`] conserve les enregistrements déjà produits et un curseur
//! sur la source. Chaque appel à [`Fetcher::fetch`] reprend là où le
//! précédent s'est arrêté. Seule [`Fetcher::invalidate`] fait repartir de
//! zéro : l'appel suivant reproduit alors les enregistrements déjà livrés en
//! plus de ceux demandés.
//!
//! En mode album, les pistes consécutives d'un même album sont regroupées en
//! un enregistrement [`AlbumGroup`]. Le groupe en cours reste ouvert hors des
//! enregistrements livrés : il n'est ajouté, et compté, qu'à l'arrivée d'un
//! autre album ou à l'épuisement de la source. La première piste d'un groupe
//! ne produit donc aucun enregistrement, mais fait avancer le curseur. Le
//! groupe ouvert survit entre les appels.

use crate::{OpenId, PlaylistEntry, PlaylistError};
use pmodidl::AlbumSummary;

/// Artiste d'un groupe dont les pistes ne s'accordent pas
pub const VARIOUS_ARTISTS: &str = "Various";

/// Enregistrement produit par un fetcher
#[derive(Debug, Clone, PartialEq)]
pub enum FetchRecord {
    Track(PlaylistEntry),
    Album(AlbumGroup),
}

impl FetchRecord {
    /// Open_ids des pistes couvertes par l'enregistrement
    pub fn open_ids(&self) -> Vec<OpenId> {
        match self {
            FetchRecord::Track(entry) => vec![entry.open_id],
            FetchRecord::Album(group) => group.open_ids.clone(),
        }
    }
}

/// Dossier virtuel résumant des pistes consécutives d'un même album
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumGroup {
    pub summary: AlbumSummary,
    pub open_ids: Vec<OpenId>,
}

impl AlbumGroup {
    fn start(entry: &PlaylistEntry) -> Self {
        let info = entry.track.info();
        let id = if info.parent_id.is_empty() {
            format!("album-{}", entry.open_id)
        } else {
            info.parent_id.clone()
        };

        Self {
            summary: AlbumSummary {
                id,
                title: info.album.clone().unwrap_or_default(),
                artist: info.display_artist().map(str::to_string),
                genre: (!info.genres.is_empty()).then(|| info.genres.join("|")),
                album_art: info.album_art.clone(),
                year: info.year.clone(),
                num_tracks: 1,
                duration_ms: entry.track.duration_ms(),
            },
            open_ids: vec![entry.open_id],
        }
    }

    fn accepts(&self, entry: &PlaylistEntry) -> bool {
        entry.track.album().unwrap_or_default() == self.summary.title
    }

    fn merge(&mut self, entry: &PlaylistEntry) {
        let info = entry.track.info();
        let summary = &mut self.summary;

        summary.num_tracks += 1;
        summary.duration_ms += entry.track.duration_ms();

        if summary.artist.as_deref() != Some(VARIOUS_ARTISTS)
            && summary.artist.as_deref() != info.display_artist()
        {
            summary.artist = Some(VARIOUS_ARTISTS.to_string());
        }
        if summary.album_art.is_none() {
            summary.album_art = info.album_art.clone();
        }
        if summary.year.is_none() {
            summary.year = info.year.clone();
        }
        for genre in &info.genres {
            match &mut summary.genre {
                Some(genres) => {
                    if !genres.split('|').any(|g| g == genre) {
                        genres.push('|');
                        genres.push_str(genre);
                    }
                }
                None => summary.genre = Some(genre.clone()),
            }
        }

        self.open_ids.push(entry.open_id);
    }
}

/// Issue d'un appel de production
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Plus rien à produire : la source est épuisée
    Done,
    /// Des enregistrements ont été ajoutés
    Records(usize),
    /// La source ne contient aucun enregistrement
    NoRecords,
    /// La source n'a pas pu fournir une piste
    Error(PlaylistError),
}

/// Source capable d'alimenter un [`Fetcher`]
pub trait FetcherSource {
    /// Produit au plus `count` enregistrements dans `fetcher` à partir de son curseur
    ///
    /// `initial_fetch` indique que le fetcher ne contient encore rien.
    fn fetch_records(&mut self, fetcher: &mut Fetcher, initial_fetch: bool, count: usize)
        -> FetchResult;
}

/// Producteur paginé d'enregistrements
#[derive(Debug, Default)]
pub struct Fetcher {
    records: Vec<FetchRecord>,
    open_group: Option<AlbumGroup>,
    album_mode: bool,
    valid: bool,
    cursor: usize,
}

impl Fetcher {
    pub fn new(album_mode: bool) -> Self {
        Self {
            records: Vec::new(),
            open_group: None,
            album_mode,
            valid: true,
            cursor: 0,
        }
    }

    pub fn records(&self) -> &[FetchRecord] {
        &self.records
    }

    pub fn album_mode(&self) -> bool {
        self.album_mode
    }

    /// Change de mode ; les enregistrements déjà produits sont invalidés
    pub fn set_album_mode(&mut self, album_mode: bool) {
        if self.album_mode != album_mode {
            self.album_mode = album_mode;
            self.invalidate();
        }
    }

    /// Nombre de pistes de la source déjà consommées
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Demande une reproduction complète au prochain appel
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Produit au plus `count` nouveaux enregistrements depuis `source`
    pub fn fetch(&mut self, source: &mut dyn FetcherSource, count: usize) -> FetchResult {
        let mut count = count;
        if !self.valid {
            count += self.records.len();
            self.records.clear();
            self.open_group = None;
            self.cursor = 0;
            self.valid = true;
        }
        let initial_fetch = self.cursor == 0;
        source.fetch_records(self, initial_fetch, count)
    }

    /// Consomme la piste suivante de la source
    ///
    /// Retourne `true` si un enregistrement a été ajouté : la piste elle-même
    /// en mode piste, le groupe album qu'elle vient de clore en mode album.
    pub fn accept(&mut self, entry: PlaylistEntry) -> bool {
        self.cursor += 1;

        if !self.album_mode {
            self.records.push(FetchRecord::Track(entry));
            return true;
        }

        if let Some(group) = self.open_group.as_mut() {
            if group.accepts(&entry) {
                group.merge(&entry);
                return false;
            }
        }
        match self.open_group.replace(AlbumGroup::start(&entry)) {
            Some(closed) => {
                self.records.push(FetchRecord::Album(closed));
                true
            }
            None => false,
        }
    }

    /// Clôt le groupe album ouvert, la source étant épuisée
    ///
    /// Retourne `true` si un enregistrement a été ajouté.
    pub fn finish(&mut self) -> bool {
        match self.open_group.take() {
            Some(group) => {
                self.records.push(FetchRecord::Album(group));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Track;
    use std::sync::Arc;

    fn entry(open_id: OpenId, album: &str, artist: &str, genre: &str) -> PlaylistEntry {
        let didl = format!(
            r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/"><item id="{open_id}" parentID=""><dc:title>t{open_id}</dc:title><upnp:artist>{artist}</upnp:artist><upnp:album>{album}</upnp:album><upnp:genre>{genre}</upnp:genre><upnp:class>object.item.audioItem.musicTrack</upnp:class><res protocolInfo="http-get:*:audio/flac:*" duration="0:01:00">http://m/{open_id}.flac</res></item></DIDL-Lite>"#
        );
        PlaylistEntry {
            open_id,
            position: open_id as usize,
            track: Arc::new(Track::new(format!("http://m/{open_id}.flac"), didl)),
        }
    }

    #[test]
    fn test_track_mode_appends_every_track() {
        let mut fetcher = Fetcher::new(false);
        assert!(fetcher.accept(entry(1, "A", "x", "Rock")));
        assert!(fetcher.accept(entry(2, "A", "x", "Rock")));
        assert_eq!(fetcher.records().len(), 2);
        assert_eq!(fetcher.cursor(), 2);
    }

    #[test]
    fn test_album_merge_rules() {
        let mut fetcher = Fetcher::new(true);
        assert!(!fetcher.accept(entry(1, "A", "x", "Rock")));
        assert!(!fetcher.accept(entry(2, "A", "y", "Pop")));
        assert!(!fetcher.accept(entry(3, "A", "x", "Rock")));
        // Le groupe reste ouvert tant qu'un autre album n'arrive pas
        assert!(fetcher.records().is_empty());
        assert_eq!(fetcher.cursor(), 3);

        assert!(fetcher.accept(entry(4, "B", "x", "Rock")));
        let FetchRecord::Album(group) = &fetcher.records()[0] else {
            panic!("album record expected");
        };
        assert_eq!(group.summary.num_tracks, 3);
        assert_eq!(group.summary.duration_ms, 180_000);
        assert_eq!(group.summary.artist.as_deref(), Some(VARIOUS_ARTISTS));
        assert_eq!(group.summary.genre.as_deref(), Some("Rock|Pop"));
        assert_eq!(group.open_ids, vec![1, 2, 3]);

        assert!(fetcher.finish());
        assert_eq!(fetcher.records().len(), 2);
        assert!(!fetcher.finish());
    }

    #[test]
    fn test_invalidate_resets_cursor_on_next_fetch() {
        struct Empty;
        impl FetcherSource for Empty {
            fn fetch_records(&mut self, fetcher: &mut Fetcher, initial: bool, count: usize) -> FetchResult {
                assert!(initial);
                assert_eq!(fetcher.cursor(), 0);
                assert_eq!(count, 4);
                FetchResult::NoRecords
            }
        }

        let mut fetcher = Fetcher::new(false);
        fetcher.accept(entry(1, "A", "x", "Rock"));
        fetcher.invalidate();
        assert!(!fetcher.is_valid());
        assert_eq!(fetcher.fetch(&mut Empty, 3), FetchResult::NoRecords);
        assert!(fetcher.records().is_empty());
        assert!(fetcher.is_valid());
    }
}
