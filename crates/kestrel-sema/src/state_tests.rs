use crate::state::{CheckState, DeclState, Entry};

#[test]
fn enter_is_three_valued() {
    let mut state = CheckState::default();

    assert_eq!(state.enter(), Entry::Fresh);
    assert!(state.is_checking());
    assert_eq!(state.enter(), Entry::Reentrant);

    state.finish();
    assert!(state.is_checked());
    assert_eq!(state.enter(), Entry::Done);
}

#[test]
fn decl_state_starts_unchecked() {
    let state = DeclState::default();

    assert_eq!(state.validation, CheckState::Unchecked);
    assert_eq!(state.inheritance, CheckState::Unchecked);
    assert!(!state.first_pass && !state.second_pass);
}
