use super::*;
use std::sync::{Arc, Mutex};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
enum JourneyStep {
    One,
    Two,
    Three,
    Four,
}

#[derive(Clone, Debug)]
struct Session {
    user: User,
}

#[derive(Clone, Debug)]
struct User {
    user_id: String,
}

fn session(user_id: &str) -> Session {
    Session {
        user: User {
            user_id: user_id.to_string(),
        },
    }
}

fn guarded(from: JourneyStep, to: JourneyStep) -> Transition<JourneyStep, Session> {
    Transition::new(from, to, |session: &Session| session.user.user_id == "test")
}

fn journey_views() -> Vec<(JourneyStep, &'static str)> {
    vec![
        (JourneyStep::One, "one"),
        (JourneyStep::Two, "two"),
        (JourneyStep::Three, "three"),
        (JourneyStep::Four, "four"),
    ]
}

fn journey_engine() -> StepEngine<JourneyStep, Session, &'static str> {
    StepEngine::new(
        JourneyStep::One,
        vec![
            guarded(JourneyStep::One, JourneyStep::Two),
            guarded(JourneyStep::Two, JourneyStep::Three),
            guarded(JourneyStep::Three, JourneyStep::Four),
            guarded(JourneyStep::Four, JourneyStep::One),
        ],
        journey_views(),
    )
    .expect("construct engine")
}

#[test]
fn guarded_cycle_returns_to_the_initial_step() {
    let engine = journey_engine();
    let session = session("test");

    for step in [
        JourneyStep::Two,
        JourneyStep::Three,
        JourneyStep::Four,
        JourneyStep::One,
    ] {
        assert!(engine.transition_to(step, &session).expect("transition"));
    }
    assert_eq!(engine.current_step().expect("current"), JourneyStep::One);
}

#[test]
fn failing_guard_leaves_the_current_step_unchanged() {
    let engine = journey_engine();
    let denied = engine
        .transition_to(JourneyStep::Two, &session("someone-else"))
        .expect("transition");

    assert!(!denied);
    assert_eq!(engine.current_step().expect("current"), JourneyStep::One);
    assert_eq!(engine.current_view().expect("view"), &"one");
}

#[test]
fn undeclared_transition_is_denied() {
    let engine = journey_engine();
    let denied = engine
        .transition_to(JourneyStep::Three, &session("test"))
        .expect("transition");

    assert!(!denied);
    assert_eq!(engine.current_step().expect("current"), JourneyStep::One);
}

#[test]
fn duplicate_entries_permit_when_any_guard_passes() {
    let engine = StepEngine::new(
        JourneyStep::One,
        vec![
            Transition::new(JourneyStep::One, JourneyStep::Two, |_session: &Session| {
                false
            }),
            guarded(JourneyStep::One, JourneyStep::Two),
        ],
        journey_views(),
    )
    .expect("construct engine");

    assert!(
        engine
            .transition_to(JourneyStep::Two, &session("test"))
            .expect("transition")
    );
    assert_eq!(engine.current_step().expect("current"), JourneyStep::Two);
}

#[test]
fn current_view_tracks_the_committed_step() {
    let engine = journey_engine();
    assert_eq!(engine.current_view().expect("view"), &"one");

    engine
        .transition_to(JourneyStep::Two, &session("test"))
        .expect("transition");
    assert_eq!(engine.current_view().expect("view"), &"two");
}

#[test]
fn subscribers_observe_committed_transitions_only() {
    let engine = journey_engine();
    let observed = Arc::new(Mutex::new(Vec::new()));
    let id = {
        let observed = observed.clone();
        engine
            .subscribe(move |step: &JourneyStep| {
                observed.lock().expect("observer lock").push(*step);
            })
            .expect("subscribe")
    };

    engine
        .transition_to(JourneyStep::Two, &session("someone-else"))
        .expect("denied transition");
    engine
        .transition_to(JourneyStep::Two, &session("test"))
        .expect("transition");
    assert_eq!(
        *observed.lock().expect("observer lock"),
        vec![JourneyStep::Two]
    );

    engine.unsubscribe(id).expect("unsubscribe");
    engine
        .transition_to(JourneyStep::Three, &session("test"))
        .expect("transition");
    assert_eq!(observed.lock().expect("observer lock").len(), 1);
}

#[test]
fn construction_validates_the_declared_step_set() {
    let empty: StepResult<StepEngine<JourneyStep, Session, &'static str>> =
        StepEngine::new(JourneyStep::One, Vec::new(), Vec::new());
    assert_eq!(empty.err(), Some(StepError::NoSteps));

    let missing_initial = StepEngine::new(
        JourneyStep::Four,
        Vec::<Transition<JourneyStep, Session>>::new(),
        vec![(JourneyStep::One, "one")],
    );
    assert!(matches!(missing_initial, Err(StepError::UnknownStep(_))));

    let duplicate = StepEngine::new(
        JourneyStep::One,
        Vec::<Transition<JourneyStep, Session>>::new(),
        vec![(JourneyStep::One, "one"), (JourneyStep::One, "again")],
    );
    assert!(matches!(duplicate, Err(StepError::DuplicateStep(_))));

    let dangling = StepEngine::new(
        JourneyStep::One,
        vec![guarded(JourneyStep::One, JourneyStep::Two)],
        vec![(JourneyStep::One, "one")],
    );
    assert!(matches!(dangling, Err(StepError::UnknownStep(_))));
}

#[test]
#[should_panic(expected = "guard blew up")]
fn panicking_guard_propagates_to_the_caller() {
    let engine = StepEngine::new(
        JourneyStep::One,
        vec![Transition::new(
            JourneyStep::One,
            JourneyStep::Two,
            |_session: &Session| panic!("guard blew up"),
        )],
        journey_views(),
    )
    .expect("construct engine");

    let _ = engine.transition_to(JourneyStep::Two, &session("test"));
}
