use std::path::PathBuf;
use std::sync::Arc;

use livescope::capture::{CaptureConfig, CaptureData};
use livescope::domain::{ReplayError, Tid};
use livescope::replay::{CaptureFile, Replay, ReplayOptions};

const MAIN_LOOP: u64 = 0x1100;
const DRAW_WORLD: u64 = 0x1200;
const DRAW_HUD: u64 = 0x1300;
const UPDATE_PHYSICS: u64 = 0x1400;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/simple_capture.jsonl")
}

fn replayed(block_capacity: usize) -> Arc<CaptureData> {
    let capture = CaptureFile::from_file(fixture()).expect("Failed to load fixture");
    let data = Arc::new(CaptureData::new(capture.session, CaptureConfig { block_capacity }));
    let summary = Replay::start(capture.events, Arc::clone(&data), ReplayOptions::default())
        .join()
        .expect("Replay thread panicked");
    assert!(summary.fatal.is_none());
    data
}

#[test]
fn test_fixture_loads() {
    let capture = CaptureFile::from_file(fixture()).unwrap();
    assert_eq!(capture.session.process_id, 4242);
    assert_eq!(capture.session.functions.len(), 6);
    assert_eq!(capture.events.len(), 20);
    assert_eq!(capture.timer_count(), 12);
}

#[test]
fn test_replay_fills_statistics() {
    let data = replayed(2);

    assert_eq!(data.timers_ingested(), 11);
    assert_eq!(data.timers_rejected(), 1);
    assert!(!data.is_aborted());

    let world = data.function_stats().get(DRAW_WORLD);
    assert_eq!((world.count, world.total_ns, world.min_ns, world.max_ns), (3, 1000, 200, 500));
    assert_eq!(world.average_ns(), 333);

    // The malformed draw_hud call on thread 2 is not counted.
    let hud = data.function_stats().get(DRAW_HUD);
    assert_eq!((hud.count, hud.total_ns), (2, 110));

    assert_eq!(data.function_stats().get(MAIN_LOOP).count, 2);
    assert!(!data.function_stats().get(0xdead).has_data());
}

#[test]
fn test_replay_builds_one_chain_per_thread() {
    let data = replayed(2);

    let chains = data.timer_chains();
    let tids: Vec<Tid> = chains.iter().map(|c| c.tid()).collect();
    assert_eq!(tids, vec![Tid(1), Tid(2), Tid(3)]);

    let main = data.timer_chain(Tid(1)).unwrap();
    assert_eq!(main.len(), 7);
    assert_eq!(main.blocks().len(), 4);
    assert!(main.blocks()[..3].iter().all(|b| b.is_sealed()));

    let physics = data.timer_chain(Tid(2)).unwrap();
    assert_eq!(physics.len(), 3);
    let addresses: Vec<u64> =
        physics.blocks().iter().flat_map(|b| b.iter().map(|t| t.function_address)).collect();
    assert_eq!(addresses, vec![UPDATE_PHYSICS; 3]);
}

#[test]
fn test_replay_fills_lookup_tables() {
    let data = replayed(16);

    assert_eq!(data.string(1).as_deref(), Some("frame"));
    assert_eq!(data.thread_name(Tid(2)).as_deref(), Some("physics"));
    assert_eq!(data.callstack(77).unwrap().frames, vec![MAIN_LOOP, DRAW_WORLD]);
    assert!(data.callstack(99).is_none());
    assert_eq!(data.callstack_events().len(), 2);
    assert_eq!(data.address_info(4620).unwrap().function_name, "draw_world");
}

#[test]
fn test_call_queries_on_replayed_capture() {
    let data = replayed(2);

    let extremes = data.find_extreme_duration_records(DRAW_WORLD).unwrap();
    assert_eq!(extremes.min.timer.start_ns, 1100);
    assert_eq!(extremes.max.timer.start_ns, 2100);
    assert_eq!(data.timer_at(extremes.max.location), Some(extremes.max.timer));

    assert_eq!(data.find_next_function_call(DRAW_WORLD, None).unwrap().timer.start_ns, 100);
    assert_eq!(data.find_next_function_call(DRAW_WORLD, Some(100)).unwrap().timer.start_ns, 1100);
    assert_eq!(data.find_previous_function_call(DRAW_WORLD, None).unwrap().timer.end_ns, 2600);
    assert_eq!(data.find_previous_function_call(DRAW_WORLD, Some(1300)).unwrap().timer.end_ns, 400);
}

#[test]
fn test_truncated_capture_reports_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.jsonl");
    let text = std::fs::read_to_string(fixture()).unwrap();
    let mut lines: Vec<&str> = text.lines().take(6).collect();
    lines.push(r#"{"type":"timer","function_address":4352,"thread_"#);
    std::fs::write(&path, lines.join("\n")).unwrap();

    match CaptureFile::from_file(&path) {
        Err(ReplayError::Parse { line, .. }) => assert_eq!(line, 7),
        other => panic!("Expected parse error, got {other:?}"),
    }
}
