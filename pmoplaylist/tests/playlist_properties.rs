//! Propriétés de la playlist courante : identifiants, positions, jetons,
//! navigation, regroupement par album et remplacement de la playlist source

use parking_lot::Mutex;
use pmoplaylist::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Exposer minimal : ensemble d'open_ids partagé
#[derive(Default)]
struct SharedExposure {
    exposed: Mutex<HashSet<OpenId>>,
}

impl ExposureNotifier for SharedExposure {
    fn expose_track(&self, open_id: OpenId, exposed: bool) {
        let mut set = self.exposed.lock();
        if exposed {
            set.insert(open_id);
        } else {
            set.remove(&open_id);
        }
    }

    fn clear_all_exposers(&self) {
        self.exposed.lock().clear();
    }
}

fn didl(title: &str, album: &str, artist: &str, duration: &str, mime: &str) -> String {
    format!(
        r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/"><item id="{title}" parentID=""><dc:title>{title}</dc:title><upnp:artist>{artist}</upnp:artist><upnp:album>{album}</upnp:album><upnp:class>object.item.audioItem.musicTrack</upnp:class><res protocolInfo="http-get:*:{mime}:*" duration="{duration}">http://media/{title}</res></item></DIDL-Lite>"#
    )
}

fn audio(title: &str) -> Track {
    Track::new(format!("http://media/{title}.flac"), "")
}

fn current_with(tracks: Vec<Track>) -> (CurrentPlaylist, Arc<SharedExposure>) {
    let exposure = Arc::new(SharedExposure::default());
    let mut current = CurrentPlaylist::new(exposure.clone(), Arc::new(NoopNotifier));
    current.set_associated_playlist(Box::new(LocalPlaylist::new(1, "props", tracks)));
    (current, exposure)
}

fn positions_are_contiguous(current: &mut CurrentPlaylist) -> bool {
    (1..=current.num_tracks()).all(|i| current.get_track(i).map(|e| e.position) == Some(i))
}

#[test]
fn test_open_ids_are_unique() {
    let (mut current, _) = current_with((0..5).map(|i| audio(&i.to_string())).collect());
    let mut seen = HashSet::new();

    for i in 1..=5 {
        assert!(seen.insert(current.get_track(i).unwrap().open_id));
    }
    for i in 0..20 {
        let after = if i % 3 == 0 { 0 } else { *seen.iter().next().unwrap() };
        let entry = current.insert_after(after, audio(&format!("n{i}"))).unwrap();
        assert!(seen.insert(entry.open_id), "open_id reused: {}", entry.open_id);
    }
    // Les suppressions ne libèrent pas d'identifiants
    let victim = current.get_track(2).unwrap().open_id;
    current.remove_by_open_id(victim).unwrap();
    let entry = current.insert_track(1, audio("late")).unwrap();
    assert!(seen.insert(entry.open_id));
}

#[test]
fn test_positions_stay_contiguous() {
    let (mut current, _) = current_with((0..4).map(|i| audio(&i.to_string())).collect());
    current.insert_track(3, audio("x")).unwrap();
    assert!(positions_are_contiguous(&mut current));

    let second = current.get_track(2).unwrap();
    let third = current.get_track(3).unwrap();
    current.remove_by_open_id(second.open_id).unwrap();
    assert!(positions_are_contiguous(&mut current));
    // La piste suivante a reculé d'une position
    assert_eq!(current.track_by_open_id(third.open_id).unwrap().position, 2);
}

#[test]
fn test_content_change_id_counts_mutations() {
    let (mut current, _) = current_with(vec![audio("a"), audio("b")]);
    let start = current.content_change_id();

    current.insert_after(0, audio("c")).unwrap();
    current.insert_track(2, audio("d")).unwrap();
    current.remove_track(1).unwrap();
    // Les lectures et les échecs ne comptent pas
    current.get_track(2);
    assert!(current.remove_by_open_id(4242).is_err());

    assert_eq!(current.content_change_id(), start + 3);
}

#[test]
fn test_id_array_roundtrip_with_exposure() {
    let (mut current, exposure) = current_with(vec![audio("a"), audio("b"), audio("c")]);

    // Sans exposer : toutes les pistes, dans l'ordre des positions
    let all: Vec<OpenId> = (1..=3).map(|i| current.get_track(i).unwrap().open_id).collect();
    let encoded = current.id_array_string(None);
    assert_eq!(decode_id_array(&encoded).unwrap(), all);

    // Avec exposer : seules les pistes révélées
    let visible: HashSet<OpenId> = [all[0], all[2]].into_iter().collect();
    let encoded = current.id_array_string(Some(&visible));
    assert_eq!(decode_id_array(&encoded).unwrap(), vec![all[0], all[2]]);

    // Une insertion est révélée automatiquement
    let inserted = current.insert_after(all[0], audio("d")).unwrap();
    let snapshot = exposure.exposed.lock().clone();
    assert!(snapshot.contains(&inserted.open_id));
    let ids = decode_id_array(&current.id_array_string(Some(&snapshot))).unwrap();
    assert_eq!(ids[..2], [all[0], inserted.open_id]);
}

#[test]
fn test_insert_semantics() {
    let (mut current, _) = current_with(vec![audio("a")]);

    let front = current.insert_after(0, audio("front")).unwrap();
    assert_eq!(front.position, 1);
    assert_eq!(current.get_track(1).unwrap().open_id, front.open_id);

    let before = current.num_tracks();
    assert_eq!(
        current.insert_after(9999, audio("lost")),
        Err(PlaylistError::ItemNotFound(9999))
    );
    assert_eq!(current.num_tracks(), before);
}

#[test]
fn test_delete_semantics() {
    let (mut current, _) = current_with(vec![audio("a"), audio("b"), audio("c")]);
    let ids = current.id_array(None);

    assert_eq!(current.remove_by_open_id(777), Err(PlaylistError::ItemNotFound(777)));
    assert_eq!(current.id_array(None), ids);

    current.remove_by_open_id(ids[0]).unwrap();
    assert_eq!(current.num_tracks(), 2);
    assert_eq!(current.track_by_open_id(ids[1]).unwrap().position, 1);
    assert_eq!(current.track_by_open_id(ids[2]).unwrap().position, 2);
}

#[test]
fn test_wrap_around_navigation() {
    let (mut current, _) = current_with(vec![audio("a"), audio("b"), audio("c")]);
    current.seek_by_index(3).unwrap();
    let entry = current.inc_get_track(1).unwrap();
    assert_eq!(entry.position, 1);
    assert_eq!(current.track_index(), 1);
}

#[test]
fn test_no_playable_tracks() {
    let video = |t: &str| Track::new(format!("http://media/{t}"), didl(t, "v", "x", "0:00:10", "video/mp4"));
    let (mut current, _) = current_with(vec![video("a"), video("b"), video("c")]);
    current.seek_by_index(3).unwrap();

    assert_eq!(current.inc_get_track(1), Err(PlaylistError::NoPlayableTracks));
    assert_eq!(current.track_index(), 0);
}

#[test]
fn test_skips_unsupported_tracks() {
    let video = Track::new("http://media/v", didl("v", "v", "x", "0:00:10", "video/mp4"));
    let (mut current, _) = current_with(vec![audio("a"), video, audio("c")]);
    let entry = current.inc_get_track(1).unwrap();
    assert_eq!(entry.position, 3);
}

#[test]
fn test_album_grouping() {
    let tracks = vec![
        Track::new("http://media/A1", didl("A1", "Album1", "Artist", "0:03:00", "audio/flac")),
        Track::new("http://media/A2", didl("A2", "Album1", "Artist", "0:04:00", "audio/flac")),
        Track::new("http://media/B1", didl("B1", "Album2", "Other", "0:02:30", "audio/flac")),
    ];
    let (mut current, _) = current_with(tracks);
    let mut fetcher = Fetcher::new(true);

    assert_eq!(current.fetch_records(&mut fetcher, 3), FetchResult::Records(2));
    let summaries = |f: &Fetcher| -> Vec<(String, usize, u64)> {
        f.records()
            .iter()
            .map(|r| match r {
                FetchRecord::Album(g) => (g.summary.title.clone(), g.summary.num_tracks, g.summary.duration_ms),
                FetchRecord::Track(_) => panic!("album mode produced a track record"),
            })
            .collect()
    };
    let first = summaries(&fetcher);
    assert_eq!(
        first,
        vec![("Album1".to_string(), 2, 420_000), ("Album2".to_string(), 1, 150_000)]
    );
    assert_eq!(current.fetch_records(&mut fetcher, 3), FetchResult::Done);

    fetcher.invalidate();
    assert_eq!(current.fetch_records(&mut fetcher, 3), FetchResult::Records(2));
    assert_eq!(summaries(&fetcher), first);
}

#[test]
fn test_album_grouping_survives_page_boundaries() {
    let tracks = vec![
        Track::new("http://media/A1", didl("A1", "Album1", "Artist", "0:01:00", "audio/flac")),
        Track::new("http://media/A2", didl("A2", "Album1", "Artist", "0:01:00", "audio/flac")),
        Track::new("http://media/B1", didl("B1", "Album2", "Artist", "0:01:00", "audio/flac")),
    ];
    let (mut current, _) = current_with(tracks);
    let mut fetcher = Fetcher::new(true);
    let album = |record: &FetchRecord| match record {
        FetchRecord::Album(group) => (group.summary.title.clone(), group.summary.num_tracks),
        FetchRecord::Track(_) => panic!("album record expected"),
    };

    // Une page d'un enregistrement livre Album1 déjà complet
    assert_eq!(current.fetch_records(&mut fetcher, 1), FetchResult::Records(1));
    assert_eq!(fetcher.records().len(), 1);
    assert_eq!(album(&fetcher.records()[0]), ("Album1".to_string(), 2));
    assert_eq!(fetcher.cursor(), 3);

    // Album2 est clos par l'épuisement de la source
    assert_eq!(current.fetch_records(&mut fetcher, 1), FetchResult::Records(1));
    assert_eq!(album(&fetcher.records()[1]), ("Album2".to_string(), 1));
    assert_eq!(album(&fetcher.records()[0]), ("Album1".to_string(), 2));
    assert_eq!(current.fetch_records(&mut fetcher, 1), FetchResult::Done);
}

#[test]
fn test_swap_isolation() {
    let (mut current, exposure) = current_with(vec![audio("a"), audio("b")]);
    let old_ids = current.id_array(None);
    assert!(!exposure.exposed.lock().is_empty());

    let mut replacement = LocalPlaylist::new(2, "next", vec![audio("x"), audio("y"), audio("z")]);
    replacement = replacement.with_index(2);
    current.set_associated_playlist(Box::new(replacement));

    for id in &old_ids {
        assert!(current.track_by_open_id(*id).is_none());
        assert!(current.seek_by_open_id(*id).is_none());
    }
    // Seule la piste courante de la nouvelle génération est exposée
    let exposed = exposure.exposed.lock().clone();
    assert_eq!(exposed.len(), 1);
    assert!(!exposed.iter().any(|id| old_ids.contains(id)));
    assert_eq!(current.track_index(), 2);
}
