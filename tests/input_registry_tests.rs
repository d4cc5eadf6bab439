// Tests for input enumeration and selection

mod common;

use std::sync::Arc;

use common::MockCapture;
use dictaphone::audio::{Input, InputRegistry, Location};
use dictaphone::error::{BackendError, SelectionError};

#[test]
fn test_lists_current_inputs() {
    let backend = MockCapture::new();
    let registry = InputRegistry::new(Arc::new(backend.clone()));

    let inputs = registry.available_inputs();

    assert_eq!(inputs.len(), 2);
    assert_eq!(inputs[0].name, "Built-In Microphone");
    assert_eq!(inputs[0].location, Location::Bottom);
}

#[test]
fn test_inputs_are_not_cached() {
    let backend = MockCapture::new();
    let registry = InputRegistry::new(Arc::new(backend.clone()));
    assert_eq!(registry.available_inputs().len(), 2);

    backend.with_state(|s| s.inputs.retain(|i| i.name != "Headset Microphone"));

    assert_eq!(registry.available_inputs().len(), 1);
}

#[test]
fn test_enumeration_failure_yields_empty_list() {
    let backend = MockCapture::new();
    backend.with_state(|s| s.inputs_error = Some(BackendError::NoInput));
    let registry = InputRegistry::new(Arc::new(backend));

    assert!(registry.available_inputs().is_empty());
}

#[test]
fn test_select_available_input() {
    let backend = MockCapture::new();
    let mut registry = InputRegistry::new(Arc::new(backend.clone()));

    registry
        .select_input(&Input::new("Headset Microphone", Location::Unknown))
        .unwrap();

    assert_eq!(registry.preferred_name(), Some("Headset Microphone"));
    assert_eq!(backend.with_state(|s| s.selected.clone()).as_deref(), Some("Headset Microphone"));
}

#[test]
fn test_select_missing_input_fails() {
    let backend = MockCapture::new();
    let mut registry = InputRegistry::new(Arc::new(backend));

    let err = registry
        .select_input(&Input::new("USB Interface", Location::Unknown))
        .unwrap_err();

    assert_eq!(err, SelectionError::NoSuchPort("USB Interface".to_string()));
    assert_eq!(registry.preferred_name(), None);
}

#[test]
fn test_backend_rejection_is_reported() {
    let backend = MockCapture::new();
    backend.with_state(|s| s.reject_selection = true);
    let mut registry = InputRegistry::new(Arc::new(backend));

    let err = registry
        .select_input(&Input::new("Built-In Microphone", Location::Bottom))
        .unwrap_err();

    assert!(matches!(err, SelectionError::BackendRejected { ref name, .. } if name == "Built-In Microphone"));
    assert_eq!(registry.preferred_name(), None);
}

#[test]
fn test_preferred_input_revalidated() {
    let backend = MockCapture::new();
    let mut registry = InputRegistry::new(Arc::new(backend.clone()));
    registry
        .select_input(&Input::new("Headset Microphone", Location::Unknown))
        .unwrap();
    assert!(registry.preferred_input().is_some());

    // Headset unplugged
    backend.with_state(|s| s.inputs.retain(|i| i.name != "Headset Microphone"));

    assert_eq!(registry.preferred_input(), None);
    assert_eq!(registry.preferred_name(), Some("Headset Microphone"));
}

#[test]
fn test_unselected_sentinel_clears_preference() {
    let backend = MockCapture::new();
    let mut registry = InputRegistry::new(Arc::new(backend));
    registry
        .select_input(&Input::new("Built-In Microphone", Location::Bottom))
        .unwrap();

    registry.select_input(&Input::unselected()).unwrap();

    assert_eq!(registry.preferred_name(), None);
}

#[test]
fn test_input_equality_uses_name_only() {
    let a = Input::new("Mic", Location::Top);
    let b = Input::new("Mic", Location::Back);

    assert_eq!(a, b);
    assert!(Input::unselected().is_unselected());
}
