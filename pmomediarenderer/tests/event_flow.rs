//! Abonnements, exposition par abonné et envoi groupé des évènements

mod common;

use common::{caller, harness, harness_with, track};
use pmomediarenderer::{MediaRendererBuilder, PlaylistMutator, Renderer, SoftRenderer};
use pmoplaylist::{decode_id_array, ChangeEvent, OpenId};
use pmoupnp::actions::CallerIdentity;
use pmoupnp::events::EventNotification;
use pmoupnp::MemoryEventSink;
use std::sync::Arc;
use std::time::Duration;

const CALLBACK: &str = "<http://10.0.0.5:9000/events>";

fn variable<'a>(notification: &'a EventNotification, name: &str) -> Option<&'a str> {
    let open = format!("<{name}>");
    let close = format!("</{name}>");
    let start = notification.body.find(&open)? + open.len();
    let end = notification.body[start..].find(&close)? + start;
    Some(&notification.body[start..end])
}

fn id_array(notification: &EventNotification) -> Vec<OpenId> {
    decode_id_array(variable(notification, "IdArray").unwrap_or_default()).unwrap()
}

#[test]
fn test_subscriber_sees_tracks_progressively() {
    let h = harness();
    h.sources.save(
        "big",
        (1..=5).map(|i| track(&format!("t{i}"))).collect(),
    );
    h.call(
        "Insert",
        &[("AfterId", "0"), ("Uri", "http://h/select_playlist/big"), ("Metadata", "")],
    )
    .unwrap();
    let all = decode_id_array(&h.device.playlist().id_array_string(None)).unwrap();
    assert_eq!(all.len(), 5);

    let subscriber = h
        .device
        .events()
        .subscribe("Playlist", caller(), CALLBACK, None)
        .unwrap();
    assert_eq!(h.device.exposers().keys(), vec![caller().key()]);

    // Évènement initial : seule la piste courante est révélée
    let initial = h.sink.take();
    assert_eq!(initial.len(), 1);
    assert_eq!(initial[0].seq, 0);
    assert_eq!(initial[0].sid, subscriber.sid);
    assert_eq!(id_array(&initial[0]), vec![all[0]]);
    assert_eq!(variable(&initial[0], "TracksMax"), Some("10000"));
    assert_eq!(variable(&initial[0], "TransportState"), Some("Stopped"));

    let visible = h.call("IdArray", &[]).unwrap();
    assert_eq!(decode_id_array(visible.get("Array").unwrap()).unwrap(), vec![all[0]]);

    // ReadList révèle un lot supplémentaire (2 pistes)
    h.call("ReadList", &[("IdList", &all[0].to_string())]).unwrap();
    let visible = h.call("IdArray", &[]).unwrap();
    assert_eq!(
        decode_id_array(visible.get("Array").unwrap()).unwrap(),
        all[..2].to_vec()
    );

    // Un autre control point non abonné voit toute la playlist
    let other = CallerIdentity::new("10.0.0.9", "BubbleUPnP");
    let full = h.call_as(&other, "IdArray", &[]).unwrap();
    assert_eq!(decode_id_array(full.get("Array").unwrap()).unwrap(), all);

    // Le tick envoie l'état courant à l'abonné
    h.device.changes().notify(ChangeEvent::Idle);
    let flushed = h.sink.take();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].seq, 1);
    assert_eq!(id_array(&flushed[0]), all[..2].to_vec());

    // Sans nouveau changement, rien n'est envoyé
    h.device.changes().notify(ChangeEvent::Idle);
    assert!(h.sink.is_empty());

    h.device.events().unsubscribe(&subscriber.sid).unwrap();
    assert!(h.device.exposers().is_empty());
}

#[test]
fn test_second_subscription_keeps_the_exposer() {
    let h = harness();
    h.sources.save(
        "big",
        (1..=5).map(|i| track(&format!("t{i}"))).collect(),
    );
    h.call(
        "Insert",
        &[("AfterId", "0"), ("Uri", "http://h/select_playlist/big"), ("Metadata", "")],
    )
    .unwrap();

    // Même adresse et même User-Agent : deux SIDs, un seul exposer
    let first = h
        .device
        .events()
        .subscribe("Playlist", caller(), CALLBACK, None)
        .unwrap();
    let second = h
        .device
        .events()
        .subscribe("Playlist", caller(), CALLBACK, None)
        .unwrap();
    assert_ne!(first.sid, second.sid);
    assert_eq!(h.device.exposers().len(), 1);

    h.device.events().unsubscribe(&first.sid).unwrap();
    assert_eq!(h.device.exposers().keys(), vec![caller().key()]);
    let visible = h.call("IdArray", &[]).unwrap();
    assert_eq!(decode_id_array(visible.get("Array").unwrap()).unwrap().len(), 1);

    h.device.events().unsubscribe(&second.sid).unwrap();
    assert!(h.device.exposers().is_empty());
    let visible = h.call("IdArray", &[]).unwrap();
    assert_eq!(decode_id_array(visible.get("Array").unwrap()).unwrap().len(), 5);
}

#[test]
fn test_playlist_swap_exposes_current_track_on_demand() {
    for (expose_on_start, expected) in [(true, 1), (false, 0)] {
        let h = harness_with(|b| b.with_expose_on_start(expose_on_start));
        h.sources.save("big", (1..=3).map(|i| track(&format!("t{i}"))).collect());
        h.device
            .events()
            .subscribe("Playlist", caller(), CALLBACK, None)
            .unwrap();

        h.call(
            "Insert",
            &[("AfterId", "0"), ("Uri", "http://h/select_playlist/big"), ("Metadata", "")],
        )
        .unwrap();

        let exposer = h.device.exposers().get(&caller().key()).unwrap();
        assert_eq!(exposer.exposed_count(), expected, "expose_on_start={expose_on_start}");
    }
}

#[test]
fn test_swap_clears_subscriber_exposure() {
    let h = harness();
    let a = h.insert(0, "a");
    h.insert(a, "b");

    h.device
        .events()
        .subscribe("Playlist", caller(), CALLBACK, None)
        .unwrap();
    h.call("ReadList", &[("IdList", &a.to_string())]).unwrap();
    let (exposer, _) = h.device.exposers().get_or_create(&caller().key());
    assert_eq!(exposer.exposed_count(), 2);

    h.call("DeleteAll", &[]).unwrap();
    assert_eq!(exposer.exposed_count(), 0);
    assert!(!exposer.is_exposed(a));
}

#[test]
fn test_mutations_are_coalesced_while_deferred() {
    let h = harness_with(|b| b.with_defer_period(Duration::from_secs(60)));
    h.device
        .events()
        .subscribe("Playlist", caller(), CALLBACK, None)
        .unwrap();
    h.sink.take();

    let a = h.insert(0, "a");
    h.insert(a, "b");
    h.call("DeleteId", &[("Value", &a.to_string())]).unwrap();

    assert!(h.device.events().is_deferred());
    h.device.changes().notify(ChangeEvent::Idle);
    assert!(h.sink.is_empty());
}

#[test]
fn test_track_change_bumps_info() {
    let h = harness();
    h.device
        .events()
        .subscribe("Info", caller(), CALLBACK, None)
        .unwrap();
    let initial = h.sink.take();
    assert_eq!(variable(&initial[0], "TrackCount"), Some("0"));

    // Insertion dans une playlist vide : la piste devient courante
    let a = h.insert(0, "a");
    h.call("SeekId", &[("Value", &a.to_string())]).unwrap();

    h.device.changes().notify(ChangeEvent::Idle);
    let flushed = h.sink.take();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].topic, "Info");
    assert_eq!(variable(&flushed[0], "TrackCount"), Some("2"));
    assert_eq!(variable(&flushed[0], "Uri"), Some("http://media/a.flac"));
    assert_eq!(variable(&flushed[0], "CodecName"), Some("FLAC"));
    assert_eq!(variable(&flushed[0], "Duration"), Some("180"));
}

#[test]
fn test_soft_renderer_tick_flushes_time_events() {
    let sink = Arc::new(MemoryEventSink::new());
    let device = MediaRendererBuilder::new()
        .with_event_sink(sink.clone())
        .with_defer_period(Duration::ZERO)
        .build(SoftRenderer::new)
        .unwrap();

    let t = track("a");
    device
        .playlist()
        .insert_after(0, t, 10)
        .unwrap();
    device
        .events()
        .subscribe("Time", caller(), CALLBACK, None)
        .unwrap();
    sink.take();

    device.renderer().play().unwrap();
    device.renderer().tick(Duration::from_millis(2500));

    let flushed = sink.take();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].topic, "Time");
    assert_eq!(variable(&flushed[0], "Seconds"), Some("2"));
    assert_eq!(variable(&flushed[0], "Duration"), Some("180"));
}
