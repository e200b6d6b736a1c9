//! CurrentPlaylist : la playlist vivante exposée aux control points
//!
//! La playlist courante représente une playlist associée (locale, dossier,
//! ...) et matérialise ses pistes paresseusement. Chaque piste matérialisée
//! ou insérée reçoit un open_id stable, indépendant de sa position.
//!
//! Les pistes sont indexées deux fois :
//! - par position, dans une séquence creuse (stockage 0-based, API 1-based) ;
//! - par open_id, indépendamment de la position.
//!
//! # Concurrence
//!
//! `CurrentPlaylist` n'a pas de verrou interne : elle est partagée derrière un
//! `Mutex` et toutes ses opérations, lectures comprises, passent par lui.
//! Les notificateurs sont appelés verrou tenu.

use crate::fetcher::{FetchResult, Fetcher, FetcherSource};
use crate::id_array::encode_id_array;
use crate::notify::{ChangeEvent, ChangeNotifier, ExposureFilter, ExposureNotifier};
use crate::playlist::Playlist;
use crate::{OpenId, PlaylistEntry, PlaylistError, Result, Track};
use quick_xml::escape::escape;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Emplacement de la séquence des positions
#[derive(Debug, Clone)]
enum Slot {
    /// Pas encore matérialisée : index 1-based dans la playlist associée
    Pending(usize),
    Ready { open_id: OpenId, track: Arc<Track> },
}

/// La playlist courante
pub struct CurrentPlaylist {
    associated: Option<Box<dyn Playlist>>,
    exposure: Arc<dyn ExposureNotifier>,
    changes: Arc<dyn ChangeNotifier>,
    expose_on_start: bool,

    name: String,
    playlist_num: u32,
    shuffle: bool,
    query: Option<String>,
    dirty: bool,

    playlist_count_id: u32,
    content_change_id: u32,
    next_open_id: OpenId,
    track_index: usize,

    tracks_by_position: Vec<Slot>,
    tracks_by_open_id: HashMap<OpenId, Arc<Track>>,
}

impl std::fmt::Debug for CurrentPlaylist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentPlaylist")
            .field("name", &self.name)
            .field("num_tracks", &self.num_tracks())
            .field("track_index", &self.track_index)
            .field("playlist_count_id", &self.playlist_count_id)
            .field("content_change_id", &self.content_change_id)
            .finish()
    }
}

impl CurrentPlaylist {
    pub fn new(exposure: Arc<dyn ExposureNotifier>, changes: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            associated: None,
            exposure,
            changes,
            expose_on_start: true,
            name: String::new(),
            playlist_num: 0,
            shuffle: false,
            query: None,
            dirty: false,
            playlist_count_id: 0,
            content_change_id: 0,
            next_open_id: 1,
            track_index: 0,
            tracks_by_position: Vec::new(),
            tracks_by_open_id: HashMap::new(),
        }
    }

    /// Exposer la piste courante dès qu'une playlist non vide est associée
    ///
    /// À désactiver quand le renderer joue lui-même le rôle de device
    /// OpenHome Playlist distant.
    pub fn with_expose_on_start(mut self, expose: bool) -> Self {
        self.expose_on_start = expose;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn playlist_num(&self) -> u32 {
        self.playlist_num
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks_by_position.len()
    }

    /// Position 1-based de la piste courante, 0 si aucune
    pub fn track_index(&self) -> usize {
        self.track_index
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Modifiée depuis l'association de la playlist source
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn content_change_id(&self) -> u32 {
        self.content_change_id
    }

    pub fn playlist_count_id(&self) -> u32 {
        self.playlist_count_id
    }

    /// Jeton de polling : change à chaque insertion, suppression ou remplacement
    pub fn token(&self) -> u32 {
        self.content_change_id.wrapping_add(self.playlist_count_id)
    }

    /// Remplace la playlist associée
    ///
    /// Tout l'état est réinitialisé et les expositions de tous les abonnés
    /// sont effacées avant le démarrage de la nouvelle source. Les open_ids
    /// de l'ancienne génération ne sont plus résolus.
    pub fn set_associated_playlist(&mut self, playlist: Box<dyn Playlist>) {
        self.playlist_count_id = self.playlist_count_id.wrapping_add(1);
        self.clean_init();
        self.exposure.clear_all_exposers();

        if let Some(mut old) = self.associated.take() {
            old.stop();
        }

        let mut playlist = playlist;
        playlist.start();

        let num_tracks = playlist.num_tracks();
        self.name = playlist.name().to_string();
        self.playlist_num = playlist.id();
        self.shuffle = playlist.shuffle();
        self.query = playlist.query().map(str::to_string);
        self.track_index = match playlist.current_index() {
            0 if num_tracks > 0 => 1,
            index => index.min(num_tracks),
        };
        self.tracks_by_position = (1..=num_tracks).map(Slot::Pending).collect();
        self.associated = Some(playlist);

        info!(
            playlist = %self.name,
            tracks = num_tracks,
            generation = self.playlist_count_id,
            "♻️ Current playlist switched"
        );

        if num_tracks > 0 && self.expose_on_start {
            if let Some(entry) = self.get_track(self.track_index) {
                self.exposure.expose_track(entry.open_id, true);
            }
        }

        self.changes.notify(ChangeEvent::PlaylistChanged);
    }

    fn clean_init(&mut self) {
        self.name.clear();
        self.playlist_num = 0;
        self.shuffle = false;
        self.query = None;
        self.dirty = false;
        self.track_index = 0;
        self.tracks_by_position.clear();
        self.tracks_by_open_id.clear();
    }

    fn allocate_open_id(&mut self) -> OpenId {
        let id = self.next_open_id;
        self.next_open_id = self.next_open_id.wrapping_add(1).max(1);
        id
    }

    /// Piste à la position 1-based, matérialisée depuis la source si besoin
    ///
    /// Retourne `None` hors de `[1, num_tracks]` ou si la source ne peut pas
    /// fournir la piste (journalisé).
    pub fn get_track(&mut self, index: usize) -> Option<PlaylistEntry> {
        if index == 0 || index > self.num_tracks() {
            return None;
        }

        let source_index = match &self.tracks_by_position[index - 1] {
            Slot::Ready { open_id, track } => {
                return Some(PlaylistEntry {
                    open_id: *open_id,
                    position: index,
                    track: track.clone(),
                })
            }
            Slot::Pending(source_index) => *source_index,
        };

        let Some(associated) = self.associated.as_mut() else {
            error!(index, "❌ Pending track without associated playlist");
            return None;
        };
        let Some(track) = associated.track(source_index) else {
            error!(index, source_index, "❌ Associated playlist cannot supply track");
            return None;
        };

        let open_id = self.allocate_open_id();
        let track = Arc::new(track);
        self.tracks_by_position[index - 1] = Slot::Ready {
            open_id,
            track: track.clone(),
        };
        self.tracks_by_open_id.insert(open_id, track.clone());

        Some(PlaylistEntry {
            open_id,
            position: index,
            track,
        })
    }

    /// Piste à la position 1-based si elle est déjà matérialisée
    pub fn materialized(&self, index: usize) -> Option<PlaylistEntry> {
        match self.tracks_by_position.get(index.checked_sub(1)?)? {
            Slot::Ready { open_id, track } => Some(PlaylistEntry {
                open_id: *open_id,
                position: index,
                track: track.clone(),
            }),
            Slot::Pending(_) => None,
        }
    }

    /// Position 1-based d'un open_id
    pub fn position_of(&self, open_id: OpenId) -> Option<usize> {
        if !self.tracks_by_open_id.contains_key(&open_id) {
            return None;
        }
        let found = self.tracks_by_position.iter().position(
            |slot| matches!(slot, Slot::Ready { open_id: id, .. } if *id == open_id),
        );
        if found.is_none() {
            error!(open_id, "❌ Open id indexed but absent from positions");
        }
        found.map(|i| i + 1)
    }

    /// Résout un open_id
    pub fn track_by_open_id(&self, open_id: OpenId) -> Option<PlaylistEntry> {
        let position = self.position_of(open_id)?;
        self.materialized(position)
    }

    /// Piste courante
    pub fn current_entry(&mut self) -> Option<PlaylistEntry> {
        self.get_track(self.track_index)
    }

    /// Insère une piste à la position 1-based `position`
    ///
    /// Les pistes à partir de `position` sont décalées. La piste courante
    /// reste la même ; dans une playlist vide, la nouvelle piste devient
    /// courante.
    pub fn insert_track(&mut self, position: usize, track: Track) -> Result<PlaylistEntry> {
        let max = self.num_tracks() + 1;
        if position == 0 || position > max {
            return Err(PlaylistError::PositionOutOfRange { position, max });
        }

        let open_id = self.allocate_open_id();
        let track = Arc::new(track);
        self.tracks_by_position.insert(
            position - 1,
            Slot::Ready {
                open_id,
                track: track.clone(),
            },
        );
        self.tracks_by_open_id.insert(open_id, track.clone());

        if self.track_index == 0 {
            self.track_index = 1;
        } else if self.track_index >= position {
            self.track_index += 1;
        }

        self.content_change_id = self.content_change_id.wrapping_add(1);
        self.dirty = true;

        debug!(open_id, position, uri = %track.uri(), "Track inserted");

        self.exposure.expose_track(open_id, true);
        self.changes.notify(ChangeEvent::PlaylistContentChanged);

        Ok(PlaylistEntry {
            open_id,
            position,
            track,
        })
    }

    /// Insertion OpenHome : après `after_id`, ou en tête si `after_id` vaut 0
    pub fn insert_after(&mut self, after_id: OpenId, track: Track) -> Result<PlaylistEntry> {
        let position = if after_id == 0 {
            1
        } else {
            self.position_of(after_id)
                .ok_or(PlaylistError::ItemNotFound(after_id))?
                + 1
        };
        self.insert_track(position, track)
    }

    /// Supprime la piste à la position 1-based `position`
    pub fn remove_track(&mut self, position: usize) -> Result<PlaylistEntry> {
        let max = self.num_tracks();
        if position == 0 || position > max {
            return Err(PlaylistError::PositionOutOfRange { position, max });
        }

        let entry = self
            .get_track(position)
            .ok_or(PlaylistError::MissingTrack(position))?;

        self.tracks_by_position.remove(position - 1);
        self.tracks_by_open_id.remove(&entry.open_id);

        let num_tracks = self.num_tracks();
        if position < self.track_index {
            self.track_index -= 1;
        } else if self.track_index > num_tracks {
            self.track_index = num_tracks;
        }

        self.content_change_id = self.content_change_id.wrapping_add(1);
        self.dirty = true;

        debug!(open_id = entry.open_id, position, "Track removed");

        self.exposure.expose_track(entry.open_id, false);
        self.changes.notify(ChangeEvent::PlaylistContentChanged);

        Ok(entry)
    }

    /// Supprime la piste identifiée par `open_id`
    pub fn remove_by_open_id(&mut self, open_id: OpenId) -> Result<PlaylistEntry> {
        let position = self
            .position_of(open_id)
            .ok_or(PlaylistError::ItemNotFound(open_id))?;
        self.remove_track(position)
    }

    fn move_index(&mut self, delta: i64) {
        let n = self.num_tracks() as i64;
        if n == 0 {
            self.track_index = 0;
            return;
        }
        let target = if delta == 0 && self.track_index == 0 {
            1
        } else {
            self.track_index as i64 + delta
        };
        self.track_index = ((target - 1).rem_euclid(n) + 1) as usize;
    }

    /// Avance (ou recule) de `delta` pistes en bouclant, en sautant les
    /// pistes que le renderer ne sait pas lire
    ///
    /// Après un tour complet sans piste lisible, l'index passe à 0 et
    /// [`PlaylistError::NoPlayableTracks`] est retourné.
    pub fn inc_get_track(&mut self, delta: i64) -> Result<PlaylistEntry> {
        let n = self.num_tracks();
        if n == 0 {
            self.track_index = 0;
            return Err(PlaylistError::NoPlayableTracks);
        }

        let step = if delta < 0 { -1 } else { 1 };
        self.move_index(delta);

        for _ in 0..n {
            match self.get_track(self.track_index) {
                Some(entry) if entry.track.is_playable() => return Ok(entry),
                Some(entry) => {
                    debug!(position = entry.position, uri = %entry.track.uri(), "Skipping unsupported track");
                }
                None => {
                    error!(position = self.track_index, "❌ Null track while moving in playlist");
                }
            }
            self.move_index(step);
        }

        warn!(playlist = %self.name, "No playable tracks found");
        self.track_index = 0;
        Err(PlaylistError::NoPlayableTracks)
    }

    /// Rend courante la piste à la position 1-based `index`
    pub fn seek_by_index(&mut self, index: usize) -> Option<PlaylistEntry> {
        let entry = self.get_track(index)?;
        self.track_index = index;
        Some(entry)
    }

    /// Rend courante la piste identifiée par `open_id`
    pub fn seek_by_open_id(&mut self, open_id: OpenId) -> Option<PlaylistEntry> {
        let position = self.position_of(open_id)?;
        self.seek_by_index(position)
    }

    /// Open_ids dans l'ordre des positions
    ///
    /// Avec un filtre, seules les pistes matérialisées et révélées à l'abonné
    /// sont retenues ; sans filtre, toutes les pistes sont matérialisées.
    pub fn id_array(&mut self, filter: Option<&dyn ExposureFilter>) -> Vec<OpenId> {
        match filter {
            Some(filter) => self
                .tracks_by_position
                .iter()
                .filter_map(|slot| match slot {
                    Slot::Ready { open_id, .. } if filter.is_exposed(*open_id) => Some(*open_id),
                    _ => None,
                })
                .collect(),
            None => (1..=self.num_tracks())
                .filter_map(|index| self.get_track(index).map(|e| e.open_id))
                .collect(),
        }
    }

    /// `IdArray` OpenHome encodé en base64
    pub fn id_array_string(&mut self, filter: Option<&dyn ExposureFilter>) -> String {
        encode_id_array(&self.id_array(filter))
    }

    /// Document `<TrackList>` pour `ReadList`
    ///
    /// Une entrée par identifiant ; la liste s'arrête au premier identifiant
    /// inconnu. L'URI et les métadonnées DIDL-Lite sont échappées dans leurs
    /// éléments, le document entier l'est à nouveau par l'enveloppe SOAP.
    pub fn track_list_xml(&self, ids: &[OpenId]) -> String {
        let mut xml = String::from("<TrackList>");
        for id in ids {
            let Some(track) = self.tracks_by_open_id.get(id) else {
                debug!(open_id = id, "ReadList: item not found, truncating track list");
                break;
            };
            let _ = write!(
                xml,
                "<Entry><Id>{}</Id><Uri>{}</Uri><Metadata>{}</Metadata></Entry>",
                id,
                escape(track.uri()),
                escape(track.metadata())
            );
        }
        xml.push_str("</TrackList>");
        xml
    }

    /// Production paginée : voir [`Fetcher`]
    pub fn fetch_records(&mut self, fetcher: &mut Fetcher, count: usize) -> FetchResult {
        fetcher.fetch(self, count)
    }
}

impl FetcherSource for CurrentPlaylist {
    fn fetch_records(
        &mut self,
        fetcher: &mut Fetcher,
        _initial_fetch: bool,
        count: usize,
    ) -> FetchResult {
        let num_tracks = self.num_tracks();
        if num_tracks == 0 {
            return FetchResult::NoRecords;
        }

        let mut added = 0;
        while added < count && fetcher.cursor() < num_tracks {
            let position = fetcher.cursor() + 1;
            let Some(entry) = self.get_track(position) else {
                return FetchResult::Error(PlaylistError::MissingTrack(position));
            };
            if fetcher.accept(entry) {
                added += 1;
            }
        }
        if added < count && fetcher.cursor() >= num_tracks && fetcher.finish() {
            added += 1;
        }

        if added > 0 {
            FetchResult::Records(added)
        } else {
            FetchResult::Done
        }
    }
}
