//! Unit tests for pass_state.rs

use super::*;

// ============================================================================
// Tests: transitions
// ============================================================================

#[test]
fn test_default_is_uninitialized() {
    assert_eq!(PassState::default(), PassState::Uninitialized);
    assert!(!PassState::default().is_recorded());
}

#[test]
fn test_recording_requires_framebuffer() {
    let state = PassState::Uninitialized;
    assert!(matches!(state.begin_recording("shadow[0]"), Err(Error::NotReady(_))));
}

#[test]
fn test_full_lifecycle() {
    let mut state = PassState::default();
    state.framebuffer_built();
    assert!(state.begin_recording("geometry").is_ok());
    state.recorded();
    assert!(state.is_recorded());

    // Re-recording is allowed from Recorded
    assert!(state.begin_recording("geometry").is_ok());
    state.recorded();
    assert!(state.is_recorded());
}

#[test]
fn test_framebuffer_rebuild_invalidates_recording() {
    let mut state = PassState::Recorded;
    state.framebuffer_built();
    assert_eq!(state, PassState::FramebufferBuilt);
    assert!(!state.is_recorded());
}
