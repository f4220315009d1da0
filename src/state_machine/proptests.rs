//! Property-based tests for the state machine
//!
//! Drives the pure transition function with a minimal effect interpreter and
//! checks the transcript invariants across arbitrary fragment sequences.

use super::state::{RequestOrigin, ResponseStage};
use super::*;
use crate::transcript::{Speaker, Transcript, Turn};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Applies the transcript-facing effects; I/O effects are ignored
fn apply(transcript: &mut Transcript, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::AppendTurn { turn } => {
                transcript.append(turn);
            }
            Effect::OpenNarration => {
                transcript.open_narration();
            }
            Effect::ReplaceLast { text } => {
                transcript
                    .replace_last(text)
                    .expect("controller only replaces open narration");
            }
            Effect::CloseNarration => transcript.close_narration(),
            Effect::CreateSession
            | Effect::SendPrompt { .. }
            | Effect::ShowError { .. }
            | Effect::ClearError
            | Effect::NotifyState => {}
        }
    }
}

fn step(
    state: &mut GameState,
    transcript: &mut Transcript,
    event: Event,
) -> Result<(), TransitionError> {
    let result = transition(state, transcript, event)?;
    *state = result.new_state;
    apply(transcript, result.effects);
    Ok(())
}

/// A started game that has already played out `history`
fn idle_game(history: &[(String, String)]) -> (GameState, Transcript) {
    let mut state = GameState::Idle;
    let mut transcript = Transcript::new();
    for (input, reply) in history {
        step(&mut state, &mut transcript, Event::player_input(input.clone())).unwrap();
        step(&mut state, &mut transcript, Event::StreamOpened).unwrap();
        step(&mut state, &mut transcript, Event::fragment(reply.clone())).unwrap();
        step(&mut state, &mut transcript, Event::StreamComplete).unwrap();
    }
    (state, transcript)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_fragment() -> impl Strategy<Value = String> {
    "[a-zA-Z ,.']{1,16}"
}

fn arb_fragments() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(arb_fragment(), 0..12)
}

fn arb_history() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec(("[a-z]{1,8}( [a-z]{1,8})?", "[A-Za-z .]{1,20}"), 0..4)
}

fn arb_blank() -> impl Strategy<Value = String> {
    "[ \t\n]{0,6}"
}

fn arb_busy_state() -> impl Strategy<Value = GameState> {
    let origin = prop_oneof![Just(RequestOrigin::OpeningScene), Just(RequestOrigin::PlayerTurn)];
    let stage = prop_oneof![
        Just(ResponseStage::Connecting),
        Just(ResponseStage::Sending),
        Just(ResponseStage::Streaming),
    ];
    (origin, stage, "[a-z ]{0,10}").prop_map(|(origin, stage, received)| {
        GameState::AwaitingResponse {
            origin,
            stage,
            received,
        }
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_fragments_concatenate_in_order(history in arb_history(), fragments in arb_fragments()) {
        let (mut state, mut transcript) = idle_game(&history);
        let before = transcript.turns().to_vec();

        step(&mut state, &mut transcript, Event::player_input("look around")).unwrap();
        step(&mut state, &mut transcript, Event::StreamOpened).unwrap();
        for fragment in &fragments {
            step(&mut state, &mut transcript, Event::fragment(fragment.clone())).unwrap();
        }
        step(&mut state, &mut transcript, Event::StreamComplete).unwrap();

        prop_assert_eq!(state, GameState::Idle);
        prop_assert_eq!(transcript.len(), before.len() + 2);
        prop_assert_eq!(&transcript.turns()[..before.len()], before.as_slice());
        prop_assert_eq!(&transcript.turns()[before.len()], &Turn::user("look around"));
        prop_assert_eq!(transcript.last().unwrap(), &Turn::narrator(fragments.concat()));
        prop_assert!(!transcript.has_open_narration());
    }

    #[test]
    fn prop_opening_scene_is_single_narrator_turn(
        fragments in proptest::collection::vec(arb_fragment(), 1..12),
    ) {
        let mut state = GameState::NotStarted;
        let mut transcript = Transcript::new();
        step(&mut state, &mut transcript, Event::StartGame).unwrap();
        step(&mut state, &mut transcript, Event::SessionReady).unwrap();
        prop_assert!(transcript.is_empty());
        step(&mut state, &mut transcript, Event::StreamOpened).unwrap();
        for fragment in &fragments {
            step(&mut state, &mut transcript, Event::fragment(fragment.clone())).unwrap();
        }
        step(&mut state, &mut transcript, Event::StreamComplete).unwrap();

        prop_assert_eq!(transcript.turns(), &[Turn::narrator(fragments.concat())][..]);
    }

    #[test]
    fn prop_blank_input_is_ignored(history in arb_history(), blank in arb_blank()) {
        let (state, transcript) = idle_game(&history);
        let result = transition(&state, &transcript, Event::player_input(blank));
        prop_assert_eq!(result.err(), Some(TransitionError::BlankInput));
    }

    #[test]
    fn prop_input_while_busy_is_rejected(busy in arb_busy_state(), input in "[a-z ]{0,12}") {
        let transcript = Transcript::new();
        let result = transition(&busy, &transcript, Event::player_input(input));
        prop_assert_eq!(result.err(), Some(TransitionError::Busy));
        let result = transition(&busy, &transcript, Event::StartGame);
        prop_assert_eq!(result.err(), Some(TransitionError::Busy));
    }

    #[test]
    fn prop_failure_without_fragments_keeps_length(
        history in arb_history(),
        pre_open in any::<bool>(),
    ) {
        let (mut state, mut transcript) = idle_game(&history);
        step(&mut state, &mut transcript, Event::player_input("climb the palm")).unwrap();
        let len_before_failure = transcript.len();

        let failure = if pre_open {
            Event::SendFailed { message: "Connection failed".to_string() }
        } else {
            step(&mut state, &mut transcript, Event::StreamOpened).unwrap();
            Event::StreamFailed { message: "Stream interrupted".to_string() }
        };
        step(&mut state, &mut transcript, failure).unwrap();

        prop_assert_eq!(state, GameState::Idle);
        prop_assert_eq!(transcript.len(), len_before_failure);
        prop_assert_eq!(
            transcript.last().unwrap(),
            &Turn::narrator(error_annotation(CONNECTION_LOST_MESSAGE))
        );
    }

    #[test]
    fn prop_failure_after_fragments_preserves_narration(
        history in arb_history(),
        fragments in proptest::collection::vec(arb_fragment(), 1..8),
    ) {
        let (mut state, mut transcript) = idle_game(&history);
        step(&mut state, &mut transcript, Event::player_input("dig")).unwrap();
        step(&mut state, &mut transcript, Event::StreamOpened).unwrap();
        for fragment in &fragments {
            step(&mut state, &mut transcript, Event::fragment(fragment.clone())).unwrap();
        }
        let len_before_failure = transcript.len();
        step(
            &mut state,
            &mut transcript,
            Event::StreamFailed { message: "Stream interrupted".to_string() },
        )
        .unwrap();

        prop_assert_eq!(transcript.len(), len_before_failure + 1);
        prop_assert_eq!(
            &transcript.turns()[len_before_failure - 1],
            &Turn::narrator(fragments.concat())
        );
        let last = transcript.last().unwrap();
        prop_assert_eq!(last.speaker, Speaker::Narrator);
        prop_assert_eq!(&last.text, &error_annotation(CONNECTION_LOST_MESSAGE));

        // The game accepts input again and the next reply lands after the annotation
        step(&mut state, &mut transcript, Event::player_input("dig again")).unwrap();
        prop_assert_eq!(transcript.len(), len_before_failure + 3);
    }
}

#[test]
fn test_failed_start_can_be_retried() {
    let mut state = GameState::NotStarted;
    let mut transcript = Transcript::new();

    step(&mut state, &mut transcript, Event::StartGame).unwrap();
    step(
        &mut state,
        &mut transcript,
        Event::SetupFailed {
            message: "API_KEY environment variable not set".to_string(),
        },
    )
    .unwrap();
    assert_eq!(state, GameState::NotStarted);
    assert!(transcript.is_empty());

    step(&mut state, &mut transcript, Event::StartGame).unwrap();
    step(&mut state, &mut transcript, Event::SessionReady).unwrap();
    step(&mut state, &mut transcript, Event::StreamOpened).unwrap();
    step(&mut state, &mut transcript, Event::fragment("The waves ")).unwrap();
    step(&mut state, &mut transcript, Event::fragment("crash onshore.")).unwrap();
    step(&mut state, &mut transcript, Event::StreamComplete).unwrap();

    assert_eq!(state, GameState::Idle);
    assert_eq!(transcript.turns(), &[Turn::narrator("The waves crash onshore.")]);
}
