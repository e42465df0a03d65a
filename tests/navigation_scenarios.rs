use std::sync::Arc;
use std::time::{Duration, Instant};

use pageturner::navigation::address::position_to_pages;
use pageturner::test_utils::{RecordingHost, StripedPageSource};
use pageturner::{
    DocumentId, EngineSettings, Gesture, Interaction, MemoryStore, NavigationIntent, Orientation,
    PageAddress, ViewMode, ViewerSession,
};

const WIDTH: f32 = 1000.0;

fn open(pages: usize) -> (ViewerSession, RecordingHost) {
    let host = RecordingHost::new();
    let session = ViewerSession::new(
        DocumentId::from_location("/music/etude.pdf"),
        Arc::new(StripedPageSource::new(pages, 600, 800, 4)),
        Box::new(MemoryStore::new()),
        Box::new(host.clone()),
        &EngineSettings::default(),
    );
    (session, host)
}

fn tap_forward(session: &mut ViewerSession, at: Instant) {
    let _ = session.tap_at(WIDTH - 1.0, WIDTH, at);
}

#[test]
fn test_half_page_walkthrough_of_ten_pages() {
    let (mut session, _) = open(10);
    let _ = session.go_to_page(5);
    let _ = session.toggle_half_page();

    assert_eq!(session.mode(), ViewMode::HalfPage);
    assert_eq!(session.controller().half_position(), 8);
    assert_eq!(session.address(), PageAddress::Full(4));

    let t0 = Instant::now();
    for i in 0..6 {
        tap_forward(&mut session, t0 + Duration::from_secs(i));
    }

    // Even positions show one page in full: 14 is page index 7
    assert_eq!(session.controller().half_position(), 14);
    assert_eq!(session.address(), PageAddress::Full(7));
    assert_eq!(position_to_pages(13, 10), PageAddress::Split(6, 7));

    let _ = session.toggle_half_page();
    assert_eq!(session.mode(), ViewMode::Normal);
    assert_eq!(session.controller().page_number(), 8);
}

#[test]
fn test_last_position_absorbs_forward_taps() {
    let (mut session, _) = open(3);
    let _ = session.toggle_half_page();
    let t0 = Instant::now();
    for i in 0..10 {
        tap_forward(&mut session, t0 + Duration::from_secs(i));
    }
    assert_eq!(session.controller().half_position(), 4);
    assert_eq!(session.address(), PageAddress::Full(2));
}

#[test]
fn test_pedal_navigation_works_in_performance() {
    let (mut session, host) = open(6);
    let _ = session.enter_performance();
    assert!(host.is_awake());

    let _ = session.navigate(NavigationIntent::Forward);
    let _ = session.navigate(NavigationIntent::Forward);
    assert_eq!(session.controller().page_number(), 3);
    assert_eq!(session.mode(), ViewMode::Performance);
}

#[test]
fn test_performance_locks_out_zoom_and_crop() {
    let (mut session, _) = open(6);
    let _ = session.enter_performance();

    assert!(session.gesture(Gesture::Pinch { scale: 3.0 }).is_empty());
    assert!(session.gesture(Gesture::Pan { dx: 0.1, dy: 0.1 }).is_empty());
    assert!(session.zoom().is_identity());
    assert!(!session.begin_crop_edit());
    assert!(!session.permits(Interaction::SettingsAccess));
    assert_eq!(session.address(), PageAddress::Full(0));
}

#[test]
fn test_triple_tap_exit_restores_position() {
    let (mut session, host) = open(10);
    let _ = session.toggle_half_page();
    let _ = session.enter_performance();

    let t0 = Instant::now();
    tap_forward(&mut session, t0);
    tap_forward(&mut session, t0 + Duration::from_secs(2));
    assert_eq!(session.controller().half_position(), 2);

    let burst = t0 + Duration::from_secs(10);
    tap_forward(&mut session, burst);
    tap_forward(&mut session, burst + Duration::from_millis(150));
    tap_forward(&mut session, burst + Duration::from_millis(300));

    assert_eq!(session.mode(), ViewMode::HalfPage);
    assert_eq!(session.controller().half_position(), 2);
    assert!(!host.is_awake());
}

#[test]
fn test_two_taps_then_pause_stay_in_performance() {
    let (mut session, _) = open(10);
    let _ = session.enter_performance();

    let t0 = Instant::now();
    tap_forward(&mut session, t0);
    tap_forward(&mut session, t0 + Duration::from_millis(100));
    tap_forward(&mut session, t0 + Duration::from_millis(900));

    assert_eq!(session.mode(), ViewMode::Performance);
    assert_eq!(session.controller().page_number(), 4);
}

#[test]
fn test_rotation_leaves_half_page() {
    let (mut session, _) = open(4);
    let _ = session.toggle_half_page();
    let _ = session.navigate(NavigationIntent::Forward);
    assert_eq!(session.address(), PageAddress::Split(0, 1));

    let _ = session.set_orientation(Orientation::Landscape);
    assert_eq!(session.mode(), ViewMode::Normal);
    assert_eq!(session.controller().page_number(), 1);
    assert!(session.toggle_half_page().is_empty());

    let _ = session.set_orientation(Orientation::Portrait);
    let _ = session.toggle_half_page();
    assert_eq!(session.mode(), ViewMode::HalfPage);
}

#[test]
fn test_host_orientation_is_read_at_open() {
    let host = RecordingHost::new();
    host.set_orientation(Orientation::Landscape);
    let mut session = ViewerSession::new(
        DocumentId::new("landscape"),
        Arc::new(StripedPageSource::new(4, 600, 800, 4)),
        Box::new(MemoryStore::new()),
        Box::new(host.clone()),
        &EngineSettings::default(),
    );

    assert!(session.toggle_half_page().is_empty());
    host.set_orientation(Orientation::Portrait);
    let _ = session.sync_orientation();
    let _ = session.toggle_half_page();
    assert_eq!(session.mode(), ViewMode::HalfPage);
}

#[test]
fn test_zoom_gestures_in_normal_mode() {
    let (mut session, _) = open(2);
    let _ = session.gesture(Gesture::Pinch { scale: 2.0 });
    let _ = session.gesture(Gesture::Pan { dx: 0.2, dy: 0.1 });

    assert_eq!(session.zoom().factor(), 2.0);
    assert!((session.zoom().pan_x - 0.2).abs() < 1e-6);

    let _ = session.enter_performance();
    assert!(session.zoom().is_identity());
}
