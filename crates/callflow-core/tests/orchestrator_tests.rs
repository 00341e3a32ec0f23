//! Call scenarios driven through the orchestrator against recording fakes.

use callflow_core::{
    CallId, Continuation, FlowId, FlowState, GatewayError, NodeKind, Operation,
    OrchestratorError, Service, VoiceSettings, VoiceTier,
};
use callflow_test_utils::{init_test_tracing, settle, OrchestratorHarness};
use serde_json::json;
use std::time::Duration;

fn call(id: &str) -> CallId {
    CallId::from(id)
}

#[tokio::test(start_paused = true)]
async fn test_say_then_collect_scenario() {
    init_test_tracing();
    let h = OrchestratorHarness::new();
    h.fakes.flow_state.script_advance(FlowState::collect());

    let advance = h
        .start_with("call-1", FlowState::say("Hello").continuing())
        .await
        .unwrap();

    assert_eq!(advance.report.node_kind, NodeKind::Say);
    assert_eq!(
        advance.report.continuation,
        Continuation::Advance {
            after: Duration::from_secs(2)
        }
    );
    assert_eq!(h.fakes.synthesis.spoken(), vec!["Hello".to_string()]);

    let begin = &h.fakes.flow_state.begin_requests()[0];
    assert_eq!(begin.flow_id, FlowId::from("flow-42"));
    assert_eq!(begin.context.caller_address, "+15551234567");

    // Nothing happens before the grace delay.
    h.advance_time(Duration::from_millis(1900)).await;
    assert!(h.fakes.flow_state.advance_requests().is_empty());

    h.advance_time(Duration::from_millis(200)).await;
    let requests = h.fakes.flow_state.advance_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].call_id, call("call-1"));
    assert_eq!(requests[0].external_input, None);

    let armed = h.fakes.recognition.requests();
    assert_eq!(armed.len(), 1);
    assert_eq!(armed[0].language, "en-US");
    assert!(armed[0].interim_results);

    let snapshot = h.orchestrator.session(&call("call-1")).await.unwrap();
    assert_eq!(snapshot.current_node_kind, Some(NodeKind::Collect));
    assert!(snapshot.pending_continuation.is_none());

    // The transcript comes back through continue.
    h.fakes.flow_state.script_advance(FlowState::say("Thanks"));
    h.orchestrator
        .continue_flow(&call("call-1"), Some("yes".to_string()))
        .await
        .unwrap();

    let requests = h.fakes.flow_state.advance_requests();
    assert_eq!(requests[1].external_input.as_deref(), Some("yes"));
    assert_eq!(h.fakes.synthesis.spoken(), vec!["Hello", "Thanks"]);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_start_fails_without_side_effects() {
    let h = OrchestratorHarness::new();
    h.start_with("call-1", FlowState::collect()).await.unwrap();

    let err = h
        .start_with("call-1", FlowState::say("again"))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::DuplicateSession { .. }));
    assert!(!err.is_retryable());
    assert_eq!(h.fakes.flow_state.begin_requests().len(), 1);
    assert!(h.fakes.synthesis.requests().is_empty());
    assert_eq!(h.orchestrator.active_session_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_continue_without_session_fails() {
    let h = OrchestratorHarness::new();

    let err = h
        .orchestrator
        .continue_flow(&call("ghost"), Some("hello".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::SessionNotFound { .. }));
    assert!(!err.is_retryable());
    assert!(h.fakes.flow_state.advance_requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_end_session_is_idempotent() {
    let h = OrchestratorHarness::new();
    h.start_with("call-1", FlowState::collect()).await.unwrap();

    assert!(h.orchestrator.end_session(&call("call-1")).await);
    assert!(!h.orchestrator.end_session(&call("call-1")).await);
    assert!(!h.orchestrator.end_session(&call("never-started")).await);

    assert!(!h.has_session("call-1"));
    assert_eq!(h.fakes.flow_state.discarded(), vec![call("call-1")]);
    assert!(h.fakes.telephony.ended().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_end_session_survives_discard_failure() {
    let h = OrchestratorHarness::new();
    h.fakes
        .flow_state
        .fail_discard(GatewayError::Transport("connection reset".to_string()));
    h.start_with("call-1", FlowState::collect()).await.unwrap();

    assert!(h.orchestrator.end_session(&call("call-1")).await);
    assert!(!h.has_session("call-1"));
    assert_eq!(h.metrics.snapshot().non_fatal_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_ending_session_cancels_pending_continuation() {
    let h = OrchestratorHarness::new();
    h.start_with("call-1", FlowState::say("Hello").continuing())
        .await
        .unwrap();
    assert_eq!(h.metrics.snapshot().continuations_scheduled, 1);

    h.advance_time(Duration::from_secs(1)).await;
    h.orchestrator.end_session(&call("call-1")).await;
    h.advance_time(Duration::from_secs(5)).await;

    assert!(h.fakes.flow_state.advance_requests().is_empty());
    let metrics = h.metrics.snapshot();
    assert_eq!(metrics.continuations_cancelled, 1);
    assert_eq!(metrics.continuations_fired, 0);
    assert_eq!(h.fakes.synthesis.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_collect_waits_indefinitely() {
    let h = OrchestratorHarness::new();
    let advance = h.start_with("call-1", FlowState::collect()).await.unwrap();
    assert_eq!(advance.report.continuation, Continuation::Wait);

    h.advance_time(Duration::from_secs(3600)).await;

    assert!(h.fakes.flow_state.advance_requests().is_empty());
    assert!(h.has_session("call-1"));
    assert_eq!(h.metrics.snapshot().continuations_scheduled, 0);
}

#[tokio::test(start_paused = true)]
async fn test_recognition_failure_is_non_fatal() {
    let h = OrchestratorHarness::new();
    h.fakes
        .recognition
        .fail_with(GatewayError::Status {
            status: 503,
            body: "overloaded".to_string(),
        });

    let advance = h.start_with("call-1", FlowState::collect()).await.unwrap();

    assert_eq!(advance.report.non_fatal.len(), 1);
    assert_eq!(advance.report.non_fatal[0].operation, Operation::ArmRecognition);
    assert!(h.has_session("call-1"));
}

#[tokio::test(start_paused = true)]
async fn test_synthesis_timeout_still_schedules_continuation() {
    let h = OrchestratorHarness::builder()
        .gateway_timeout(Duration::from_secs(1))
        .build();
    h.fakes.synthesis.stall(Duration::from_secs(30));
    h.fakes.flow_state.script_advance(FlowState::collect());

    let advance = h
        .start_with("call-1", FlowState::say("Hello").continuing())
        .await
        .unwrap();

    assert_eq!(advance.report.non_fatal.len(), 1);
    assert!(advance.report.non_fatal[0].error.is_timeout());
    assert!(matches!(
        advance.report.continuation,
        Continuation::Advance { .. }
    ));

    h.advance_time(Duration::from_secs(2)).await;
    assert_eq!(h.fakes.flow_state.advance_requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_say_with_wait_does_not_schedule() {
    let h = OrchestratorHarness::new();
    let advance = h.start_with("call-1", FlowState::say("Hold on")).await.unwrap();

    assert_eq!(advance.report.continuation, Continuation::Wait);
    h.advance_time(Duration::from_secs(10)).await;
    assert!(h.fakes.flow_state.advance_requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_say_without_text_skips_synthesis() {
    let h = OrchestratorHarness::new();
    let mut state = FlowState::say("  ");
    state.response_text = None;

    h.start_with("call-1", state.continuing()).await.unwrap();

    assert!(h.fakes.synthesis.requests().is_empty());
    assert_eq!(h.metrics.snapshot().continuations_scheduled, 1);
}

#[tokio::test(start_paused = true)]
async fn test_decision_pauses_before_advancing() {
    let h = OrchestratorHarness::new();
    h.fakes.flow_state.script_advance(FlowState::collect());
    h.start_with("call-1", FlowState::decision().continuing())
        .await
        .unwrap();

    h.advance_time(Duration::from_millis(400)).await;
    assert!(h.fakes.flow_state.advance_requests().is_empty());

    h.advance_time(Duration::from_millis(200)).await;
    assert_eq!(h.fakes.flow_state.advance_requests().len(), 1);
    assert_eq!(h.metrics.snapshot().continuations_fired, 1);
}

#[tokio::test(start_paused = true)]
async fn test_chained_auto_continuations() {
    let h = OrchestratorHarness::new();
    h.fakes
        .flow_state
        .script_advance(FlowState::decision().continuing())
        .script_advance(FlowState::collect());

    h.start_with("call-1", FlowState::say("Welcome").continuing())
        .await
        .unwrap();

    h.advance_time(Duration::from_secs(2)).await;
    h.advance_time(Duration::from_millis(500)).await;

    assert_eq!(h.fakes.flow_state.advance_requests().len(), 2);
    let snapshot = h.orchestrator.session(&call("call-1")).await.unwrap();
    assert_eq!(snapshot.current_node_kind, Some(NodeKind::Collect));
}

#[tokio::test(start_paused = true)]
async fn test_stale_continuation_loses_race_with_external_continue() {
    let h = OrchestratorHarness::new();
    h.fakes.flow_state.script_advance(FlowState::collect());

    // Node A: a say that would auto-advance after 2s.
    h.start_with("call-1", FlowState::say("Press one").continuing())
        .await
        .unwrap();

    // The caller speaks first and the flow moves to node B.
    h.advance_time(Duration::from_secs(1)).await;
    h.orchestrator
        .continue_flow(&call("call-1"), Some("one".to_string()))
        .await
        .unwrap();

    // A's timer would have fired here.
    h.advance_time(Duration::from_secs(5)).await;

    let requests = h.fakes.flow_state.advance_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].external_input.as_deref(), Some("one"));

    let snapshot = h.orchestrator.session(&call("call-1")).await.unwrap();
    assert_eq!(snapshot.current_node_kind, Some(NodeKind::Collect));
    assert_eq!(h.metrics.snapshot().continuations_fired, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_transfer_keeps_session_and_retry_does_not_replay_prompts() {
    let h = OrchestratorHarness::new();
    let target = "+15559876543";
    h.fakes
        .flow_state
        .script_advance(FlowState::transfer(target, json!({ "intent": "billing" })))
        .script_advance(FlowState::transfer(target, json!({ "intent": "billing" })));
    h.fakes
        .telephony
        .fail_next_transfer(GatewayError::Status {
            status: 502,
            body: "no agents".to_string(),
        });

    h.start_with("call-1", FlowState::say("Connecting you"))
        .await
        .unwrap();

    let err = h
        .orchestrator
        .continue_flow(&call("call-1"), None)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.service(), Some(Service::TelephonyControl));
    assert_eq!(err.operation(), Some(Operation::TransferCall));
    match &err {
        OrchestratorError::Gateway { node_kind, .. } => {
            assert_eq!(node_kind, &Some(NodeKind::Transfer))
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.has_session("call-1"));

    // Retry succeeds and ends the session.
    let advance = h
        .orchestrator
        .continue_flow(&call("call-1"), None)
        .await
        .unwrap();
    assert_eq!(advance.report.continuation, Continuation::Terminate);
    assert!(!h.has_session("call-1"));

    let transfers = h.fakes.telephony.transfers();
    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[1].transfer_target.as_deref(), Some(target));
    assert_eq!(transfers[1].context, json!({ "intent": "billing" }));

    // Prompt spoken once; transfer hands the call off without ending it.
    assert_eq!(h.fakes.synthesis.requests().len(), 1);
    assert!(h.fakes.telephony.ended().is_empty());
    assert_eq!(h.fakes.flow_state.discarded(), vec![call("call-1")]);
}

#[tokio::test(start_paused = true)]
async fn test_transfer_not_required_waits() {
    let h = OrchestratorHarness::new();
    let mut state = FlowState::transfer("+15550000000", json!({}));
    state.transfer_required = false;

    let advance = h.start_with("call-1", state).await.unwrap();

    assert_eq!(advance.report.continuation, Continuation::Wait);
    assert!(h.fakes.telephony.transfers().is_empty());
    assert!(h.has_session("call-1"));
}

#[tokio::test(start_paused = true)]
async fn test_end_node_speaks_then_hangs_up_after_grace() {
    let h = OrchestratorHarness::new();
    h.start_with("call-1", FlowState::end(Some("Goodbye")))
        .await
        .unwrap();

    assert_eq!(h.fakes.synthesis.spoken(), vec!["Goodbye".to_string()]);
    let snapshot = h.orchestrator.session(&call("call-1")).await.unwrap();
    assert!(snapshot.closing);

    // Input during the grace period does not advance the call.
    let err = h
        .orchestrator
        .continue_flow(&call("call-1"), Some("wait".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::SessionClosing { .. }));

    h.advance_time(Duration::from_millis(2900)).await;
    assert!(h.fakes.telephony.ended().is_empty());

    h.advance_time(Duration::from_millis(200)).await;
    assert_eq!(h.fakes.telephony.ended(), vec![call("call-1")]);
    assert_eq!(h.fakes.flow_state.discarded(), vec![call("call-1")]);
    assert!(!h.has_session("call-1"));
    assert!(h.fakes.flow_state.advance_requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_end_call_failure_does_not_block_cleanup() {
    let h = OrchestratorHarness::new();
    h.fakes
        .telephony
        .fail_end_call(GatewayError::Transport("timeout".to_string()));

    h.start_with("call-1", FlowState::end(None)).await.unwrap();
    assert!(h.fakes.synthesis.requests().is_empty());

    h.advance_time(Duration::from_secs(3)).await;

    assert!(!h.has_session("call-1"));
    assert_eq!(h.fakes.telephony.ended().len(), 1);
    assert_eq!(h.metrics.snapshot().non_fatal_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_begin_failure_creates_no_session() {
    let h = OrchestratorHarness::new();
    h.fakes.flow_state.fail_begin(GatewayError::Status {
        status: 404,
        body: "unknown flow".to_string(),
    });

    let err = h
        .orchestrator
        .start(
            call("call-1"),
            FlowId::from("missing"),
            "+15551234567",
            VoiceSettings::default(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.operation(), Some(Operation::BeginFlow));
    assert_eq!(err.service(), Some(Service::FlowState));
    assert!(!h.has_session("call-1"));
    assert_eq!(h.metrics.snapshot().sessions_started, 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_start_is_rejected_before_begin_flow() {
    let h = OrchestratorHarness::new();
    h.fakes.flow_state.stall(Duration::from_secs(1));

    let first = {
        let h = h.clone();
        tokio::spawn(async move { h.start_with("call-1", FlowState::collect()).await })
    };
    settle().await;
    assert!(h.has_session("call-1"));

    let err = h
        .orchestrator
        .start(
            call("call-1"),
            FlowId::from("flow-42"),
            "+15551234567",
            VoiceSettings::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::DuplicateSession { .. }));

    h.advance_time(Duration::from_secs(1)).await;
    let advance = first.await.unwrap().unwrap();

    assert_eq!(advance.report.node_kind, NodeKind::Collect);
    assert_eq!(h.fakes.flow_state.begin_requests().len(), 1);
    assert_eq!(h.metrics.snapshot().sessions_started, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_begin_releases_call_id() {
    let h = OrchestratorHarness::new();
    h.fakes.flow_state.fail_begin(GatewayError::Transport("refused".to_string()));

    assert!(h.start_with("call-1", FlowState::collect()).await.is_err());
    assert!(!h.has_session("call-1"));
    assert_eq!(h.orchestrator.active_session_count(), 0);

    h.start_with("call-1", FlowState::collect()).await.unwrap();
    assert!(h.has_session("call-1"));
    assert_eq!(h.fakes.flow_state.begin_requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_begin_timeout_creates_no_session() {
    let h = OrchestratorHarness::builder()
        .gateway_timeout(Duration::from_secs(2))
        .build();
    h.fakes.flow_state.stall(Duration::from_secs(60));

    let err = h
        .start_with("call-1", FlowState::collect())
        .await
        .unwrap_err();

    match err {
        OrchestratorError::Gateway { source, .. } => assert!(source.is_timeout()),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!h.has_session("call-1"));
}

#[tokio::test(start_paused = true)]
async fn test_advance_failure_leaves_session_intact() {
    let h = OrchestratorHarness::new();
    h.fakes
        .flow_state
        .fail_advance(GatewayError::Transport("refused".to_string()))
        .script_advance(FlowState::say("Got it"));
    h.start_with("call-1", FlowState::collect()).await.unwrap();

    let err = h
        .orchestrator
        .continue_flow(&call("call-1"), Some("two".to_string()))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    match &err {
        OrchestratorError::Gateway { node_kind, .. } => {
            assert_eq!(node_kind, &Some(NodeKind::Collect))
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let snapshot = h.orchestrator.session(&call("call-1")).await.unwrap();
    assert_eq!(snapshot.current_node_kind, Some(NodeKind::Collect));

    h.orchestrator
        .continue_flow(&call("call-1"), Some("two".to_string()))
        .await
        .unwrap();
    assert_eq!(h.fakes.synthesis.spoken(), vec!["Got it".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_node_is_reported_and_session_kept() {
    let h = OrchestratorHarness::new();
    let err = h
        .start_with("call-1", FlowState::new(NodeKind::parse("ivr_menu")))
        .await
        .unwrap_err();

    match err {
        OrchestratorError::UnsupportedNode { call_id, node_kind } => {
            assert_eq!(call_id, call("call-1"));
            assert_eq!(node_kind, "ivr_menu");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.has_session("call-1"));
}

#[tokio::test(start_paused = true)]
async fn test_hangup_cleans_up_without_end_call() {
    let h = OrchestratorHarness::new();
    h.start_with("call-1", FlowState::say("Hello").continuing())
        .await
        .unwrap();

    assert!(h.orchestrator.hangup(&call("call-1")).await);
    h.advance_time(Duration::from_secs(5)).await;

    assert!(!h.has_session("call-1"));
    assert!(h.fakes.telephony.ended().is_empty());
    assert!(h.fakes.flow_state.advance_requests().is_empty());
    assert_eq!(h.fakes.flow_state.discarded(), vec![call("call-1")]);
}

#[tokio::test(start_paused = true)]
async fn test_voice_settings_flow_into_synthesis() {
    let h = OrchestratorHarness::new();
    h.fakes.flow_state.script_begin(FlowState::say("Bonjour"));

    h.orchestrator
        .start(
            call("call-9"),
            FlowId::from("flow-fr"),
            "+33100000000",
            VoiceSettings::new("amelie").premium(),
        )
        .await
        .unwrap();

    let request = &h.fakes.synthesis.requests()[0];
    assert_eq!(request.voice_id, "amelie");
    assert_eq!(request.tier, VoiceTier::Premium);
    assert_eq!(request.call_id, call("call-9"));
}

#[tokio::test(start_paused = true)]
async fn test_calls_are_independent() {
    let h = OrchestratorHarness::new();
    h.fakes.flow_state.script_advance(FlowState::collect());

    h.start_with("call-a", FlowState::say("A").continuing())
        .await
        .unwrap();
    h.start_with("call-b", FlowState::collect()).await.unwrap();
    assert_eq!(h.orchestrator.active_session_count(), 2);

    h.orchestrator.end_session(&call("call-b")).await;
    h.advance_time(Duration::from_secs(2)).await;

    let requests = h.fakes.flow_state.advance_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].call_id, call("call-a"));
    assert_eq!(h.orchestrator.active_sessions().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reaper_skips_sessions_with_pending_continuation() {
    let h = OrchestratorHarness::new();
    h.start_with("idle", FlowState::collect()).await.unwrap();
    h.start_with("busy", FlowState::say("Hi").continuing())
        .await
        .unwrap();

    let reaped = h.orchestrator.reap_stale_sessions(Duration::ZERO).await;

    assert_eq!(reaped, vec![call("idle")]);
    assert!(!h.has_session("idle"));
    assert!(h.has_session("busy"));

    let fresh = h
        .orchestrator
        .reap_stale_sessions(Duration::from_secs(3600))
        .await;
    assert!(fresh.is_empty());
}
