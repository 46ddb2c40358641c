// This is free and unencumbered software released into the public domain.

use camsession::shared::backends::sim::SimPlatform;
use camsession::shared::{
    CameraError, Capability, Facing, KEY_LEN, RecordingState, Rotation, SessionConfig,
    SessionManager, SessionPhase,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn manager_with(platform: SimPlatform, dir: &std::path::Path) -> SessionManager {
    SessionManager::new(
        Box::new(platform),
        SessionConfig::new(Facing::Back).with_media_dir(dir.to_path_buf()),
    )
}

#[test]
fn photo_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let saved = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
    let saved2 = Arc::clone(&saved);

    let mut mgr = manager_with(SimPlatform::new(), dir.path())
        .with_observer(Arc::new(move |p| saved2.lock().unwrap().push(p.to_path_buf())));

    mgr.open().unwrap();
    assert_eq!(mgr.phase(), SessionPhase::Previewing);

    let path = mgr.begin_still_capture(Rotation::Deg0).unwrap();
    assert_eq!(mgr.phase(), SessionPhase::Previewing);

    assert_eq!(path.parent().unwrap(), dir.path());
    assert_eq!(path.extension().unwrap(), "jpg");
    let stem = path.file_stem().unwrap().to_str().unwrap();
    assert_eq!(stem.len(), KEY_LEN);
    assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));

    let data = std::fs::read(&path).unwrap();
    assert_eq!(&data[..2], b"\xff\xd8"); // JPEG SOI

    // Observer fired exactly once, with the persisted path.
    assert_eq!(saved.lock().unwrap().as_slice(), &[path]);
}

#[test]
fn video_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let saved = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
    let saved2 = Arc::clone(&saved);

    let mut mgr = manager_with(SimPlatform::new(), dir.path())
        .with_observer(Arc::new(move |p| saved2.lock().unwrap().push(p.to_path_buf())));

    mgr.open().unwrap();
    let clip = dir.path().join("video.mp4");
    mgr.begin_recording(&clip).unwrap();
    assert_eq!(mgr.phase(), SessionPhase::Recording);
    assert_eq!(mgr.recording_state(), RecordingState::Recording(clip.clone()));

    let finalized = mgr.end_recording().unwrap().unwrap();
    assert_eq!(finalized, clip);
    assert!(clip.is_file());
    assert_eq!(mgr.recording_state(), RecordingState::Idle);
    assert_eq!(mgr.phase(), SessionPhase::Previewing);

    assert_eq!(saved.lock().unwrap().as_slice(), &[clip]);
}

#[test]
fn open_with_revoked_permission_stays_closed() {
    let dir = tempfile::tempdir().unwrap();
    let platform = SimPlatform::new();
    platform.set_authorized(Capability::Camera, false);

    let mut mgr = manager_with(platform, dir.path());
    let err = mgr.open().unwrap_err();
    assert!(matches!(
        err,
        CameraError::PermissionDenied(Capability::Camera)
    ));
    assert_eq!(mgr.phase(), SessionPhase::Closed);
}

#[test]
fn open_close_open_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let platform = SimPlatform::new();
    let probe = platform.clone();

    let mut mgr = manager_with(platform, dir.path());

    mgr.open().unwrap();
    assert_eq!(mgr.phase(), SessionPhase::Previewing);
    assert_eq!(probe.open_handles(), 1);

    mgr.close();
    assert_eq!(mgr.phase(), SessionPhase::Closed);
    assert_eq!(probe.open_handles(), 0);
    mgr.close(); // idempotent
    assert_eq!(probe.open_handles(), 0);

    mgr.open().unwrap();
    assert_eq!(mgr.phase(), SessionPhase::Previewing);
    assert_eq!(probe.open_handles(), 1);

    // The reopened session behaves like the first one.
    mgr.begin_still_capture(Rotation::Deg90).unwrap();
    assert_eq!(mgr.phase(), SessionPhase::Previewing);
}

#[test]
fn switch_facing_never_holds_two_devices() {
    let dir = tempfile::tempdir().unwrap();
    let platform = SimPlatform::new();
    let probe = platform.clone();

    let mut mgr = manager_with(platform, dir.path());
    assert_eq!(mgr.facing(), Facing::Back);

    mgr.open().unwrap();
    assert_eq!(probe.open_handles(), 1);

    mgr.switch_facing().unwrap();
    assert_eq!(mgr.facing(), Facing::Front);
    assert_eq!(mgr.phase(), SessionPhase::Previewing);
    assert_eq!(probe.open_handles(), 1);

    mgr.switch_facing().unwrap();
    assert_eq!(mgr.facing(), Facing::Back);
    assert_eq!(probe.open_handles(), 1);

    mgr.close();
    assert_eq!(probe.open_handles(), 0);
}

#[test]
fn switch_facing_while_closed_only_flips_direction() {
    let dir = tempfile::tempdir().unwrap();
    let platform = SimPlatform::new();
    let probe = platform.clone();

    let mut mgr = manager_with(platform, dir.path());
    mgr.switch_facing().unwrap();
    assert_eq!(mgr.facing(), Facing::Front);
    assert_eq!(mgr.phase(), SessionPhase::Closed);
    assert_eq!(probe.open_handles(), 0);
}

#[test]
fn rapid_captures_produce_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut mgr = manager_with(SimPlatform::new(), dir.path());
    mgr.open().unwrap();

    let first = mgr.begin_still_capture(Rotation::Deg0).unwrap();
    let second = mgr.begin_still_capture(Rotation::Deg0).unwrap();
    assert_ne!(first, second);
    assert!(first.is_file());
    assert!(second.is_file());
}

#[test]
fn close_while_recording_finalizes_the_clip() {
    let dir = tempfile::tempdir().unwrap();
    let saved = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
    let saved2 = Arc::clone(&saved);
    let platform = SimPlatform::new();
    let probe = platform.clone();

    let mut mgr = manager_with(platform, dir.path())
        .with_observer(Arc::new(move |p| saved2.lock().unwrap().push(p.to_path_buf())));

    mgr.open().unwrap();
    let clip = dir.path().join("interrupted.mp4");
    mgr.begin_recording(&clip).unwrap();

    mgr.close();
    assert_eq!(mgr.phase(), SessionPhase::Closed);
    assert_eq!(probe.open_handles(), 0);
    assert!(clip.is_file());
    assert_eq!(saved.lock().unwrap().as_slice(), &[clip]);
}
