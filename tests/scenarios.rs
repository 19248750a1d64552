//! End-to-end session scenarios driven through the dispatcher.

use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use rps_session::dispatcher::{Dispatch, Dispatcher, UserAction};
use rps_session::presentation::BannerKind;
use rps_session::protocol::{OutboundMessage, TransportEvent};
use rps_session::state::{Move, Phase, TimerKind, TimerTicket, AVATARS};
use rps_session::{ActionError, ClientConfig};

fn dispatcher() -> Dispatcher {
    Dispatcher::new(&ClientConfig {
        avatar_seed: Some(7),
        ..ClientConfig::default()
    })
}

fn identified(name: &str) -> Dispatcher {
    let mut d = dispatcher();
    d.handle_user_action(UserAction::SubmitIdentity { name: name.into() })
        .unwrap();
    d
}

fn matched() -> Dispatcher {
    let mut d = identified("Al");
    d.handle_user_action(UserAction::FindMatch).unwrap();
    d.handle_inbound(
        "match_found",
        json!({ "room_id": "R1", "opponent_name": "Bo", "opponent_avatar": "🐱" }),
    );
    d
}

fn resolved() -> (Dispatcher, Dispatch) {
    let mut d = matched();
    d.handle_user_action(UserAction::SubmitMove(Move::Rock))
        .unwrap();
    let dispatch = d.handle_inbound("game_result", json!({ "result": "WIN" }));
    (d, dispatch)
}

fn only_ticket(dispatch: &Dispatch, kind: TimerKind) -> TimerTicket {
    assert_eq!(dispatch.timers.len(), 1);
    let ticket = dispatch.timers[0].ticket.clone();
    assert_eq!(ticket.kind, kind);
    ticket
}

#[test]
fn test_identity_round_trip() {
    let mut d = dispatcher();
    let dispatch = d
        .handle_user_action(UserAction::SubmitIdentity { name: "Al".into() })
        .unwrap();

    let player = d.session().local_player().unwrap();
    assert_eq!(player.name(), "Al");
    assert!(AVATARS.contains(&player.avatar().as_str()));
    assert_eq!(
        dispatch.outbound,
        vec![OutboundMessage::SetPlayerInfo {
            name: "Al".into(),
            avatar: player.avatar().as_str().into(),
        }]
    );

    let mut d = dispatcher();
    let err = d
        .handle_user_action(UserAction::SubmitIdentity { name: "A".into() })
        .unwrap_err();
    assert_eq!(err, ActionError::NameTooShort { min: 2 });
    assert!(d.session().local_player().is_none());
}

#[test]
fn test_full_round_and_rematch() {
    let mut d = identified("Al");
    let dispatch = d.handle_user_action(UserAction::FindMatch).unwrap();
    assert_eq!(dispatch.outbound, vec![OutboundMessage::FindMatch]);

    d.handle_inbound(
        "match_found",
        json!({ "room_id": "R1", "opponent_name": "Bo", "opponent_avatar": "🐱" }),
    );
    assert_eq!(
        *d.session().phase(),
        Phase::Matched {
            room_id: "R1".into()
        }
    );
    assert_eq!(d.render().status.text, "Found! Opponent: Bo 🐱");

    let dispatch = d
        .handle_user_action(UserAction::submit_move("ROCK").unwrap())
        .unwrap();
    assert_eq!(
        dispatch.outbound,
        vec![OutboundMessage::SendMove { mv: Move::Rock }]
    );
    assert_eq!(d.session().pending_move(), Some(Move::Rock));

    let dispatch = d.handle_inbound("game_result", json!({ "result": "WIN" }));
    assert_eq!(d.session().phase().name(), "RoundResolved");
    let state = d.render();
    assert_eq!(state.banner.unwrap().kind, BannerKind::Win);
    assert!(!state.controls.rematch.visible);

    let grace = only_ticket(&dispatch, TimerKind::RematchOffer);
    d.handle_timer(grace);
    assert_eq!(
        *d.session().phase(),
        Phase::RoundResolved {
            room_id: "R1".into(),
            rematch_open: true
        }
    );
    assert!(d.render().controls.rematch.enabled);

    let dispatch = d.handle_user_action(UserAction::RequestRematch).unwrap();
    assert_eq!(
        dispatch.outbound,
        vec![OutboundMessage::RequestRematch {
            room_id: "R1".into()
        }]
    );
    assert!(d.session().rematch_flag());

    d.handle_inbound("rematch_accepted", json!({ "room_id": "R1" }));
    assert_eq!(
        *d.session().phase(),
        Phase::Matched {
            room_id: "R1".into()
        }
    );
    assert_eq!(d.session().pending_move(), None);
    assert_eq!(d.render().status.text, "Rematch! Choose your move");
}

#[test]
fn test_second_move_never_sent() {
    let mut d = matched();
    d.handle_user_action(UserAction::SubmitMove(Move::Paper))
        .unwrap();
    for mv in Move::ALL {
        assert_eq!(
            d.handle_user_action(UserAction::SubmitMove(mv)),
            Err(ActionError::MoveAlreadySubmitted)
        );
    }
    assert_eq!(d.session().pending_move(), Some(Move::Paper));
}

#[test]
fn test_result_for_other_room_discarded() {
    let mut d = matched();
    d.handle_user_action(UserAction::SubmitMove(Move::Rock))
        .unwrap();
    let before = d.session().clone();

    let dispatch = d.handle_inbound("game_result", json!({ "result": "LOSE", "room_id": "R0" }));
    assert!(!dispatch.changed);
    assert_eq!(d.session(), &before);
}

#[test]
fn test_decline_resets_after_delay() {
    let (mut d, dispatch) = resolved();
    d.handle_timer(only_ticket(&dispatch, TimerKind::RematchOffer));
    d.handle_user_action(UserAction::RequestRematch).unwrap();

    let dispatch = d.handle_inbound(
        "rematch_declined",
        json!({ "room_id": "R1", "message": "Opponent wants a new match" }),
    );
    assert_eq!(d.session().room_id(), None);
    assert!(d.session().remote_player().is_none());
    assert_eq!(d.render().status.text, "Opponent wants a new match");

    d.handle_timer(only_ticket(&dispatch, TimerKind::DeclineReset));
    assert_eq!(*d.session().phase(), Phase::Idle);
    assert!(d.session().notice().is_none());
    assert_eq!(d.render().status.text, "Ready! Click Find match");
}

#[test]
fn test_opponent_left_during_rematch_cannot_revive_room() {
    let (mut d, dispatch) = resolved();
    d.handle_timer(only_ticket(&dispatch, TimerKind::RematchOffer));
    d.handle_user_action(UserAction::RequestRematch).unwrap();

    let dispatch = d.handle_inbound("opponent_disconnected", json!({ "room_id": "R1" }));
    let reset = only_ticket(&dispatch, TimerKind::OpponentLeftReset);
    assert_eq!(*d.session().phase(), Phase::Idle);
    assert_eq!(d.render().banner.unwrap().kind, BannerKind::OpponentLeft);

    for (event, payload) in [
        ("rematch_accepted", json!({ "room_id": "R1" })),
        ("rematch_declined", json!({ "room_id": "R1" })),
        ("game_result", json!({ "result": "DRAW", "room_id": "R1" })),
    ] {
        assert!(!d.handle_inbound(event, payload).changed, "{event} revived room");
        assert_eq!(d.session().room_id(), None);
    }

    d.handle_timer(reset);
    assert_eq!(*d.session().phase(), Phase::Idle);
    assert!(d.session().remote_player().is_none());
    assert_eq!(d.render().banner, None);
}

#[test]
fn test_find_new_match_from_resolved() {
    let (mut d, dispatch) = resolved();
    d.handle_timer(only_ticket(&dispatch, TimerKind::RematchOffer));

    let dispatch = d.handle_user_action(UserAction::FindNewMatch).unwrap();
    assert_eq!(
        dispatch.outbound,
        vec![
            OutboundMessage::FindNewMatch {
                room_id: "R1".into()
            },
            OutboundMessage::FindMatch,
        ]
    );
    assert_eq!(d.session().phase().name(), "Matchmaking");

    // Old room traffic is ignored while searching
    let late = d.handle_inbound("rematch_declined", json!({ "room_id": "R1" }));
    assert!(!late.changed);

    d.handle_inbound("match_found", json!({ "room_id": "R2" }));
    assert_eq!(d.session().room_id(), Some("R2"));
    assert_eq!(d.render().status.text, "Opponent found! Choose your move");
}

#[test]
fn test_disconnect_voids_pending_grace_timer() {
    let (mut d, dispatch) = resolved();
    let grace = only_ticket(&dispatch, TimerKind::RematchOffer);

    let dispatch = d.handle_transport(TransportEvent::Disconnected { reason: None });
    assert!(dispatch.timers_invalidated);
    assert_eq!(*d.session().phase(), Phase::Idle);

    assert!(!d.handle_timer(grace).changed);
    assert!(!d.render().controls.rematch.visible);
}

#[test]
fn test_disconnect_with_rematch_open_reports_loss() {
    let (mut d, dispatch) = resolved();
    d.handle_timer(only_ticket(&dispatch, TimerKind::RematchOffer));
    assert!(d.render().controls.rematch.enabled);

    d.handle_transport(TransportEvent::Disconnected { reason: None });
    assert_eq!(*d.session().phase(), Phase::Terminated);
    let state = d.render();
    assert_eq!(state.status.text, "Lost connection to server");
    assert!(!state.controls.rematch.visible);

    d.handle_transport(TransportEvent::Connected);
    assert_eq!(d.render().status.text, "Ready! Click Find match");
}

#[test]
fn test_disconnect_during_opponent_left_delay_clears_banner() {
    let mut d = matched();
    let dispatch = d.handle_inbound("opponent_disconnected", Value::Null);
    let reset = only_ticket(&dispatch, TimerKind::OpponentLeftReset);
    assert_eq!(d.render().banner.unwrap().kind, BannerKind::OpponentLeft);

    d.handle_transport(TransportEvent::Disconnected { reason: None });
    d.handle_transport(TransportEvent::Connected);
    assert!(!d.handle_timer(reset).changed);

    let state = d.render();
    assert_eq!(state.banner, None);
    assert_eq!(state.status.text, "Ready! Click Find match");
    assert!(d.session().notice().is_none());
}

#[test]
fn test_room_id_tracks_phase_under_random_input() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut d = identified("Al");

    let inbound: [(&str, Value); 8] = [
        ("waiting", Value::Null),
        ("match_found", json!({ "room_id": "R1", "opponent_name": "Bo" })),
        ("game_result", json!({ "result": "DRAW" })),
        ("rematch_accepted", json!({ "room_id": "R1" })),
        ("rematch_declined", Value::Null),
        ("opponent_disconnected", Value::Null),
        ("error", json!({ "message": "nope" })),
        ("disconnect", Value::Null),
    ];
    let actions = [
        UserAction::FindMatch,
        UserAction::SubmitMove(Move::Scissors),
        UserAction::RequestRematch,
        UserAction::FindNewMatch,
    ];
    let mut pending: Vec<TimerTicket> = Vec::new();

    for _ in 0..2000 {
        let dispatch = match rng.random_range(0..3) {
            0 => {
                let (event, payload) = &inbound[rng.random_range(0..inbound.len())];
                d.handle_inbound(event, payload.clone())
            }
            1 => {
                let action = actions[rng.random_range(0..actions.len())].clone();
                d.handle_user_action(action).unwrap_or_default()
            }
            _ if !pending.is_empty() => {
                let ticket = pending.remove(rng.random_range(0..pending.len()));
                d.handle_timer(ticket)
            }
            _ => d.handle_inbound("connect", Value::Null),
        };
        pending.extend(dispatch.timers.into_iter().map(|t| t.ticket));

        let session = d.session();
        let in_room = matches!(
            session.phase(),
            Phase::Matched { .. }
                | Phase::MoveSubmitted { .. }
                | Phase::RoundResolved { .. }
                | Phase::RematchPending { .. }
        );
        assert_eq!(session.room_id().is_some(), in_room);
        assert_eq!(session.room_id().is_some(), session.remote_player().is_some());
        assert_eq!(
            session.pending_move().is_some(),
            matches!(session.phase(), Phase::MoveSubmitted { .. })
        );
        if session.phase().is_idle() {
            assert!(session.remote_player().is_none());
        }
    }
}
