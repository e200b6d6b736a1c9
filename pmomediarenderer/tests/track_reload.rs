//! Piste du renderer après remplacement ou suppression dans la playlist

mod common;

use common::soft_harness;
use pmomediarenderer::{PlaylistMutator, Renderer, TransportState};
use pmoupnp::soap::error_codes;

#[test]
fn test_delete_all_unloads_the_renderer() {
    let h = soft_harness();
    let a = h.insert(0, "a");
    h.call("SeekId", &[("Value", &a.to_string())]).unwrap();
    assert_eq!(h.device.renderer().state(), TransportState::Playing);

    h.call("DeleteAll", &[]).unwrap();
    assert_eq!(h.num_tracks(), 0);
    assert_eq!(h.call("Id", &[]).unwrap().get("Value"), Some("0"));
    assert!(h.device.renderer().current_track().is_none());

    // Rien à reprendre dans la playlist vide
    let fault = h.call("Play", &[]).unwrap_err();
    assert_eq!(fault.code, error_codes::ACTION_FAILED);
    assert_eq!(h.device.renderer().state(), TransportState::Stopped);
}

#[test]
fn test_delete_current_track_moves_to_next() {
    let h = soft_harness();
    let a = h.insert(0, "a");
    let b = h.insert(a, "b");
    h.call("SeekId", &[("Value", &a.to_string())]).unwrap();

    h.call("DeleteId", &[("Value", &a.to_string())]).unwrap();
    let id = h.call("Id", &[]).unwrap();
    assert_eq!(id.get("Value"), Some(b.to_string().as_str()));

    h.call("Play", &[]).unwrap();
    let current = h.device.renderer().current_track().unwrap();
    assert_eq!(current.open_id, b);
    assert_eq!(current.track.uri(), "http://media/b.flac");
}

#[test]
fn test_delete_other_track_keeps_current() {
    let h = soft_harness();
    let a = h.insert(0, "a");
    let b = h.insert(a, "b");
    h.call("SeekId", &[("Value", &a.to_string())]).unwrap();

    h.call("DeleteId", &[("Value", &b.to_string())]).unwrap();
    assert_eq!(h.device.renderer().current_track().unwrap().open_id, a);
    assert_eq!(h.device.renderer().state(), TransportState::Playing);
}

#[test]
fn test_select_playlist_loads_its_current_track() {
    let h = soft_harness();
    h.sources
        .save("jazz", vec![common::track("j1"), common::track("j2")]);
    let a = h.insert(0, "a");
    h.call("SeekId", &[("Value", &a.to_string())]).unwrap();

    h.call(
        "Insert",
        &[("AfterId", "0"), ("Uri", "http://h/select_playlist/jazz"), ("Metadata", "")],
    )
    .unwrap();

    let current = h.device.renderer().current_track().unwrap();
    assert_ne!(current.open_id, a);
    assert!(h.device.playlist().track_by_open_id(a).is_none());
    assert!(h.device.playlist().track_by_open_id(current.open_id).is_some());
    assert_eq!(current.track.uri(), "http://media/j1.flac");
}
