mod common;

use ld2412::analysis::{Alert, Pattern};
use ld2412::framing::TargetState;
use ld2412::{Session, SessionConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};
use test_case::test_case;

use common::{bytes, telemetry_frame, TELEMETRY};

#[test]
fn test_decode_documented_frame() {
    let mut session = Session::default();
    assert_eq!(session.feed(&bytes(TELEMETRY)).unwrap(), 1);

    let rec = session.latest_record().expect("should have decoded a record");
    assert_eq!(rec.target_state, TargetState(0x03));
    assert!(rec.target_state.has_target());
    assert!(rec.target_state.is_moving());
    assert!(!rec.target_state.is_still());
    assert_eq!(rec.moving_distance_cm, 120);
    assert_eq!(rec.moving_energy, 85);
    assert_eq!(rec.still_distance_cm, 150);
    assert_eq!(rec.still_energy, 64);
    assert_eq!(rec.detection_distance_cm, 120);
    assert_eq!(rec.ambient_light, Some(16));
}

#[test]
fn test_frame_split_at_every_index() {
    let dat = bytes(TELEMETRY);
    for split in 1..dat.len() {
        let mut session = Session::default();
        assert_eq!(session.feed(&dat[..split]).unwrap(), 0, "split {split}");
        assert_eq!(session.feed(&dat[split..]).unwrap(), 1, "split {split}");

        let rec = session.latest_record().unwrap();
        assert_eq!(rec.detection_distance_cm, 120, "split {split}");
        assert_eq!(session.stream_counters().sync_misses, 0, "split {split}");
    }
}

#[test]
fn test_byte_at_a_time() {
    let mut dat = bytes(TELEMETRY);
    dat.extend(bytes(TELEMETRY));
    let mut session = Session::default();
    for b in &dat {
        session.feed(&[*b]).unwrap();
    }
    assert_eq!(session.history().len(), 2);
}

#[test]
fn test_resync_after_false_header() {
    let mut dat = vec![0xf4, 0xf3, 0xf2, 0xf1];
    dat.extend((0..100u8).map(|i| i % 0x70));
    dat.extend(bytes(TELEMETRY));

    let mut session = Session::default();
    session.feed(&dat).unwrap();

    assert_eq!(session.history().len(), 1);
    assert_eq!(session.latest_record().unwrap().moving_energy, 85);
    assert!(session.stream_counters().sync_misses >= 1);
}

#[test]
fn test_bounded_memory_under_garbage() {
    let mut rng = StdRng::seed_from_u64(0x2412);
    let mut session = Session::default();
    let high_water = session.config().high_water;

    for _ in 0..500 {
        let len = rng.gen_range(1..400);
        // no header magic start bytes, so nothing can ever match
        let chunk: Vec<u8> = (0..len)
            .map(|_| rng.gen::<u8>())
            .map(|b| if b == 0xf4 || b == 0xfd { 0x00 } else { b })
            .collect();
        session.feed(&chunk).unwrap();
        assert!(
            session.buffered() <= high_water,
            "buffered {} exceeds high water",
            session.buffered()
        );
    }
    assert!(session.history().is_empty());

    // stream still decodes after the noise
    session.feed(&bytes(TELEMETRY)).unwrap();
    assert_eq!(session.history().len(), 1);
}

#[test]
fn test_bounded_memory_with_header_only_noise() {
    let config = SessionConfig::default().with_water_marks(200, 100);
    let mut session = Session::new(config).unwrap();
    for _ in 0..1000 {
        session.feed(&[0xf4, 0xf3, 0xf2, 0xf1, 0x00, 0x00]).unwrap();
        assert!(session.buffered() <= 200);
    }
    assert!(session.stream_counters().sync_misses > 0);
}

#[test]
fn test_held_header_does_not_lose_frames() {
    let mut dat = vec![0xfd, 0xfc, 0xfb, 0xfa];
    for _ in 0..100 {
        dat.extend(bytes(TELEMETRY));
    }

    let mut session = Session::default();
    for chunk in dat.chunks(22) {
        session.feed(chunk).unwrap();
    }

    let counters = session.stream_counters();
    assert_eq!(counters.telemetry_frames, 100);
    assert_eq!(counters.sync_misses, 1);
    assert_eq!(counters.buffer_truncations, 0);
    assert_eq!(session.history().len(), 100);
}

#[test]
fn test_footer_window_must_fit_low_water() {
    let config = SessionConfig::default().with_footer_window(2000);
    assert!(Session::new(config).is_err());
}

#[test]
fn test_approach_trend() {
    let mut session = Session::default();
    for i in 0..10u16 {
        session
            .feed(&telemetry_frame(0x03, 200 - i * 100 / 9, 10, 10))
            .unwrap();
    }

    let behavior = session.behavior_snapshot();
    assert_eq!(behavior.approach_count, 1);
    assert_eq!(behavior.leave_count, 0);
    assert_eq!(behavior.stable_count, 0);
    assert_eq!(behavior.dominant(), Some(Pattern::Approach));
}

#[test]
fn test_leave_trend() {
    let mut session = Session::default();
    for i in 0..10u16 {
        session.feed(&telemetry_frame(0x03, 100 + i * 20, 10, 10)).unwrap();
    }
    assert_eq!(session.behavior_snapshot().leave_count, 1);
}

#[test]
fn test_alternating_state_is_noise() {
    let mut session = Session::default();
    for i in 0..10 {
        let state = if i % 2 == 0 { 0x00 } else { 0x01 };
        session.feed(&telemetry_frame(state, 0, 0, 0)).unwrap();
    }
    let behavior = session.behavior_snapshot();
    assert!(behavior.noise_count > 0);
    assert_eq!(behavior.dominant(), Some(Pattern::Noise));

    let stats = session.stats_snapshot();
    assert_eq!(stats.no_target_count, 5);
    assert_eq!(stats.min_detection_distance_cm, None);
}

#[test]
fn test_rapid_approach_alert() {
    let mut session = Session::default();
    for dist in [300, 250, 180] {
        session.feed(&telemetry_frame(0x03, dist, 10, 10)).unwrap();
    }
    let alerts = session.drain_alerts();
    assert_eq!(
        alerts,
        vec![Alert::RapidApproach {
            from_cm: 300,
            to_cm: 180
        }]
    );
}

fn feed_chunked(dat: &[u8], chunk_sizes: &[usize]) -> Session {
    let mut session = Session::default();
    let mut pos = 0;
    let mut sizes = chunk_sizes.iter().cycle();
    while pos < dat.len() {
        let n = (*sizes.next().unwrap()).min(dat.len() - pos);
        session.feed(&dat[pos..pos + n]).unwrap();
        pos += n;
    }
    session
}

fn mixed_stream() -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut dat = Vec::default();
    for i in 0..200u16 {
        if rng.gen_bool(0.2) {
            let garbage: Vec<u8> = (0..rng.gen_range(1..30)).map(|_| rng.gen::<u8>()).collect();
            dat.extend(garbage);
        }
        if rng.gen_bool(0.05) {
            dat.extend(bytes("fdfcfbfa0400ff01000004030201"));
        }
        let state = [0x00, 0x01, 0x03, 0x05, 0x07][usize::from(i % 5)];
        let dist = 50 + (i * 37) % 400;
        dat.extend(telemetry_frame(state, dist, rng.gen_range(0..100), rng.gen_range(0..100)));
    }
    dat
}

#[test_case(&[1]; "single bytes")]
#[test_case(&[7, 13, 64]; "uneven")]
#[test_case(&[22]; "frame sized")]
#[test_case(&[1000]; "large")]
fn test_deterministic_across_chunkings(chunk_sizes: &[usize]) {
    let dat = mixed_stream();
    let mut expected = Session::default();
    expected.feed(&dat).unwrap();
    let mut session = feed_chunked(&dat, chunk_sizes);

    assert_eq!(session.history(), expected.history());
    assert_eq!(session.stats_snapshot(), expected.stats_snapshot());
    assert_eq!(session.behavior_snapshot(), expected.behavior_snapshot());
    assert_eq!(session.drain_alerts(), expected.drain_alerts());
    assert_eq!(session.drain_commands(), expected.drain_commands());
    assert_eq!(
        session.stream_counters().telemetry_frames,
        expected.stream_counters().telemetry_frames
    );
}

#[test]
fn test_identical_streams_are_identical() {
    let dat = mixed_stream();
    let mut a = Session::default();
    let mut b = Session::default();
    a.feed(&dat).unwrap();
    b.feed(&dat).unwrap();

    assert_eq!(a.drain_records(), b.drain_records());
    assert_eq!(a.stream_counters(), b.stream_counters());
}
