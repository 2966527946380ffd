use async_trait::async_trait;
use ride_actors::config::SystemConfig;
use ride_actors::framework::mock::{MockHandler, RecordingHandler};
use ride_actors::framework::{
    handler_fn, ActorContext, ActorHandler, ActorStatus, ActorSystem, EscalationReason,
    HandlerError, Message, RuntimeError, SupervisionPolicy,
};
use ride_actors::lifecycle::EscalationLog;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio_util::sync::CancellationToken;

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..400 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn started(name: &str) -> ActorSystem {
    let system = ActorSystem::new(name);
    system.start(&CancellationToken::new()).expect("start");
    system
}

fn msg(kind: &str) -> Message {
    Message::new(kind, json!(null), None)
}

fn noop() -> impl ActorHandler {
    handler_fn(|_| Ok(()))
}

/// Blocks on every message until released or cancelled.
struct Gated {
    gate: Arc<Notify>,
}

#[async_trait]
impl ActorHandler for Gated {
    async fn handle(&mut self, _message: Message, ctx: &ActorContext) -> Result<(), HandlerError> {
        tokio::select! {
            _ = self.gate.notified() => Ok(()),
            _ = ctx.cancelled() => Ok(()),
        }
    }
}

/// Ignores cancellation and sleeps far past any shutdown timeout.
struct Stuck;

#[async_trait]
impl ActorHandler for Stuck {
    async fn handle(
        &mut self,
        _message: Message,
        _ctx: &ActorContext,
    ) -> Result<(), HandlerError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

/// Stops its own actor on `quit` and reports what `stop_actor` returned.
struct Quitter {
    result: Option<oneshot::Sender<Result<(), RuntimeError>>>,
    stopped: Arc<Notify>,
}

#[async_trait]
impl ActorHandler for Quitter {
    async fn handle(&mut self, message: Message, ctx: &ActorContext) -> Result<(), HandlerError> {
        if message.kind() == "quit" {
            let result = ctx.system().stop_actor(ctx.myself().id()).await;
            if let Some(tx) = self.result.take() {
                let _ = tx.send(result);
            }
        }
        Ok(())
    }

    async fn on_stop(&mut self, _ctx: &ActorContext) {
        self.stopped.notify_one();
    }
}

fn stuck_system(name: &str) -> ActorSystem {
    let system = ActorSystem::with_config(
        SystemConfig {
            shutdown_timeout_ms: 50,
            ..SystemConfig::default()
        }
        .with_name(name),
    );
    system.start(&CancellationToken::new()).unwrap();
    system
        .spawn_actor("driver", "driver-1", 4, Stuck, SupervisionPolicy::Restart)
        .unwrap();
    system.send_message("driver-1", msg("ping")).unwrap();
    system
}

#[tokio::test]
async fn test_fifo_per_actor() {
    let system = started("fifo");
    let recorder = RecordingHandler::new();
    system
        .spawn_actor("driver", "driver-1", 128, recorder.handler(), SupervisionPolicy::Restart)
        .unwrap();

    for seq in 0..100 {
        system
            .send_message("driver-1", Message::new("seq", json!(seq), None))
            .unwrap();
    }

    wait_until(|| recorder.len() == 100).await;
    let observed: Vec<i64> = recorder
        .messages()
        .iter()
        .map(|m| m.payload().as_i64().unwrap())
        .collect();
    assert_eq!(observed, (0..100).collect::<Vec<_>>());

    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_slow_actor_does_not_delay_others() {
    let system = started("isolation");
    let gate = Arc::new(Notify::new());
    system
        .spawn_actor("driver", "slow", 8, Gated { gate: gate.clone() }, SupervisionPolicy::Resume)
        .unwrap();
    let fast = RecordingHandler::new();
    system
        .spawn_actor("driver", "fast", 16, fast.handler(), SupervisionPolicy::Resume)
        .unwrap();

    system.send_message("slow", msg("block")).unwrap();
    for _ in 0..10 {
        system.send_message("fast", msg("ping")).unwrap();
    }

    wait_until(|| fast.len() == 10).await;
    let slow = system.actor_stats("slow").unwrap();
    assert_eq!(slow.processed, 0, "slow actor is still blocked");

    gate.notify_one();
    wait_until(|| system.actor_stats("slow").unwrap().processed == 1).await;
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_id_leaves_first_actor_untouched() {
    let system = started("duplicate");
    let first = RecordingHandler::new();
    let original = system
        .spawn_actor("driver", "driver-1", 4, first.handler(), SupervisionPolicy::Restart)
        .unwrap();

    let err = system
        .spawn_actor("passenger", "driver-1", 4, noop(), SupervisionPolicy::Stop)
        .unwrap_err();
    assert_eq!(err, RuntimeError::DuplicateActor("driver-1".into()));

    assert_eq!(system.list_actors(), vec![original.clone()]);
    assert_eq!(system.list_actors()[0].actor_type(), "driver");

    system.send_message("driver-1", msg("ping")).unwrap();
    wait_until(|| first.len() == 1).await;
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_send_to_unknown_actor() {
    let system = started("unknown");
    for _ in 0..3 {
        assert_eq!(
            system.send_message("nobody", msg("ping")),
            Err(RuntimeError::ActorNotFound("nobody".into()))
        );
    }
    assert!(system.list_actors().is_empty());
    assert_eq!(system.get_metrics().total_actors, 0);
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_mailbox_accepts_exactly_capacity() {
    let system = started("capacity");
    let gate = Arc::new(Notify::new());
    system
        .spawn_actor("driver", "driver-1", 5, Gated { gate }, SupervisionPolicy::Resume)
        .unwrap();

    // The loop has not been polled yet, so nothing is consumed.
    for _ in 0..5 {
        system.send_message("driver-1", msg("ping")).unwrap();
    }
    assert_eq!(
        system.send_message("driver-1", msg("ping")),
        Err(RuntimeError::MailboxFull("driver-1".into()))
    );

    let stats = system.actor_stats("driver-1").unwrap();
    assert_eq!(stats.queued, 5);
    assert_eq!(stats.received, 5);
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_third_send_to_capacity_two_is_rejected() {
    let system = started("driver-capacity");
    system
        .spawn_actor("driver", "driver-1", 2, noop(), SupervisionPolicy::Restart)
        .unwrap();

    assert!(system.send_message("driver-1", msg("a")).is_ok());
    assert!(system.send_message("driver-1", msg("b")).is_ok());
    assert_eq!(
        system.send_message("driver-1", msg("c")),
        Err(RuntimeError::MailboxFull("driver-1".into()))
    );
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_restart_keeps_processing() {
    let system = started("restart");
    let recorder = RecordingHandler::new().failing_on(["boom"]);
    let actor = system
        .spawn_actor("driver", "driver-1", 8, recorder.handler(), SupervisionPolicy::Restart)
        .unwrap();

    for kind in ["a", "boom", "b", "c"] {
        system.send_message("driver-1", msg(kind)).unwrap();
    }
    wait_until(|| system.actor_stats("driver-1").unwrap().processed == 3).await;

    let stats = system.actor_stats("driver-1").unwrap();
    assert_eq!(stats.actor, actor);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.restarts, 1);
    assert_eq!(stats.status, ActorStatus::Running);
    assert_eq!(recorder.kinds(), vec!["a", "boom", "b", "c"]);
    assert_eq!(recorder.restarts(), 1);

    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_matcher_survives_boom() {
    let system = started("matcher");
    let handler = handler_fn(|m| match m.kind() {
        "boom" => Err(HandlerError::new("boom")),
        _ => Ok(()),
    });
    system
        .spawn_actor("matcher", "matcher", 8, handler, SupervisionPolicy::Restart)
        .unwrap();

    system.send_message("matcher", msg("boom")).unwrap();
    system.send_message("matcher", msg("ping")).unwrap();
    wait_until(|| system.actor_stats("matcher").unwrap().processed == 1).await;

    let actors = system.list_actors();
    assert_eq!(actors.len(), 1);
    assert_eq!(actors[0].id(), "matcher");
    assert_eq!(system.actor_status("matcher"), Some(ActorStatus::Running));
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_resume_does_not_reset_handler() {
    let system = started("resume");
    let mut mock = MockHandler::new();
    mock.expect_kind("boom").return_err("bad payload");
    mock.expect_kind("ping").return_ok();
    system
        .spawn_actor("matcher", "matcher", 8, mock.handler(), SupervisionPolicy::Resume)
        .unwrap();

    system.send_message("matcher", msg("boom")).unwrap();
    system.send_message("matcher", msg("ping")).unwrap();
    wait_until(|| system.actor_stats("matcher").unwrap().processed == 1).await;

    mock.verify();
    assert_eq!(mock.restarts(), 0);
    assert_eq!(system.actor_stats("matcher").unwrap().restarts, 0);
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_policy_removes_actor() {
    let system = started("stop-policy");
    let recorder = RecordingHandler::new().failing_on(["boom"]);
    system
        .spawn_actor("passenger", "p-1", 8, recorder.handler(), SupervisionPolicy::Stop)
        .unwrap();

    system.send_message("p-1", msg("boom")).unwrap();
    wait_until(|| !system.contains("p-1")).await;

    assert!(system.list_actors().is_empty());
    assert_eq!(
        system.send_message("p-1", msg("ping")),
        Err(RuntimeError::ActorNotFound("p-1".into()))
    );
    wait_until(|| recorder.stopped()).await;
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_escalate_notifies_observer() {
    let system = started("escalate");
    let log = Arc::new(EscalationLog::default());
    system.set_failure_observer(log.clone());

    let failing = handler_fn(|_| Err(HandlerError::new("payment gateway down")));
    system
        .spawn_actor("passenger", "p-1", 8, failing, SupervisionPolicy::Escalate)
        .unwrap();
    let message = msg("charge");
    let message_id = message.id();
    system.send_message("p-1", message).unwrap();

    wait_until(|| !log.reports().is_empty()).await;
    let report = &log.reports()[0];
    assert_eq!(report.actor.id(), "p-1");
    assert_eq!(report.reason, EscalationReason::Escalated);
    assert_eq!(report.error, "payment gateway down");
    assert_eq!(report.message_id, Some(message_id));
    assert_eq!(report.message_kind.as_deref(), Some("charge"));
    assert!(!system.contains("p-1"));

    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_restart_limit_gives_up() {
    let system = ActorSystem::with_config(SystemConfig {
        max_restarts: 2,
        ..SystemConfig::default()
    });
    system.start(&CancellationToken::new()).unwrap();
    let log = Arc::new(EscalationLog::default());
    system.set_failure_observer(log.clone());

    let recorder = RecordingHandler::new().failing_on(["boom"]);
    system
        .spawn_actor("driver", "driver-1", 8, recorder.handler(), SupervisionPolicy::Restart)
        .unwrap();
    for _ in 0..4 {
        system.send_message("driver-1", msg("boom")).unwrap();
    }

    wait_until(|| !log.reports().is_empty()).await;
    assert!(!system.contains("driver-1"));
    assert_eq!(recorder.restarts(), 2);
    // The fourth message was discarded with the mailbox.
    assert_eq!(recorder.len(), 3);

    let reports = log.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].reason, EscalationReason::RestartLimitExceeded);
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let system = started("panic");
    let log = Arc::new(EscalationLog::default());
    system.set_failure_observer(log.clone());

    let panicky = handler_fn(|m| {
        if m.kind() == "explode" {
            panic!("handler exploded");
        }
        Ok(())
    });
    system
        .spawn_actor("driver", "driver-1", 8, panicky, SupervisionPolicy::Restart)
        .unwrap();
    let bystander = RecordingHandler::new();
    system
        .spawn_actor("driver", "driver-2", 8, bystander.handler(), SupervisionPolicy::Restart)
        .unwrap();

    system.send_message("driver-1", msg("explode")).unwrap();
    wait_until(|| !log.reports().is_empty()).await;
    assert!(!system.contains("driver-1"));

    assert_eq!(log.reports()[0].reason, EscalationReason::Crashed);
    system.send_message("driver-2", msg("ping")).unwrap();
    wait_until(|| bystander.len() == 1).await;
    assert_eq!(system.list_actors().len(), 1);

    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_metrics_follow_spawn_and_stop() {
    let system = started("metrics");
    for i in 0..5 {
        system
            .spawn_actor("driver", &format!("driver-{i}"), 4, noop(), SupervisionPolicy::Restart)
            .unwrap();
    }
    let metrics = system.get_metrics();
    assert_eq!(metrics.total_actors, 5);
    assert_eq!(metrics.by_type.get("driver"), Some(&5));

    system.stop_actor("driver-0").await.unwrap();
    system.stop_actor("driver-3").await.unwrap();

    let metrics = system.get_metrics();
    assert_eq!(metrics.total_actors, 3);
    assert_eq!(metrics.actors_spawned_total, 5);
    assert_eq!(metrics.actors_removed_total, 2);
    assert_eq!(
        system.stop_actor("driver-0").await,
        Err(RuntimeError::ActorNotFound("driver-0".into()))
    );

    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_waits_for_every_loop() {
    let system = started("stop-waits");
    let recorders: Vec<RecordingHandler> = (0..3)
        .map(|_| RecordingHandler::new().with_delay(Duration::from_millis(20)))
        .collect();
    for (i, recorder) in recorders.iter().enumerate() {
        let id = format!("driver-{i}");
        system
            .spawn_actor("driver", &id, 8, recorder.handler(), SupervisionPolicy::Restart)
            .unwrap();
        for _ in 0..5 {
            system.send_message(&id, msg("ping")).unwrap();
        }
    }
    tokio::time::sleep(Duration::from_millis(30)).await;

    system.stop().await.unwrap();
    assert!(recorders.iter().all(RecordingHandler::stopped));
    assert!(system.list_actors().is_empty());

    let handled: Vec<usize> = recorders.iter().map(RecordingHandler::len).collect();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let after: Vec<usize> = recorders.iter().map(RecordingHandler::len).collect();
    assert_eq!(handled, after, "no loop may run after stop returns");
    assert!(handled.iter().all(|&n| n < 5), "queued messages are discarded");

    assert_eq!(
        system.spawn_actor("driver", "late", 4, noop(), SupervisionPolicy::Stop),
        Err(RuntimeError::ActorSystemShutdown)
    );
}

#[tokio::test]
async fn test_stop_times_out_on_stuck_handler() {
    let system = stuck_system("stuck");
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(
        system.stop().await,
        Err(RuntimeError::ShutdownTimeout { remaining: 1 })
    );
    assert!(system.list_actors().is_empty());
}

#[tokio::test]
async fn test_concurrent_stop_reports_the_same_timeout() {
    let system = stuck_system("stuck-twice");
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (first, second) = tokio::join!(system.stop(), system.stop());
    assert_eq!(first, Err(RuntimeError::ShutdownTimeout { remaining: 1 }));
    assert_eq!(second, first);
    assert!(!system.is_running());
}

#[tokio::test]
async fn test_actor_can_stop_itself() {
    let system = started("self-stop");
    let (tx, rx) = oneshot::channel();
    let stopped = Arc::new(Notify::new());
    let quitter = Quitter {
        result: Some(tx),
        stopped: stopped.clone(),
    };
    system
        .spawn_actor("passenger", "p-1", 8, quitter, SupervisionPolicy::Restart)
        .unwrap();

    system.send_message("p-1", msg("quit")).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(1), rx)
        .await
        .expect("stop_actor returned inside the handler")
        .unwrap();
    assert_eq!(result, Ok(()));

    tokio::time::timeout(Duration::from_secs(1), stopped.notified())
        .await
        .expect("on_stop ran");
    assert!(!system.contains("p-1"));
    assert_eq!(
        system.send_message("p-1", msg("ping")),
        Err(RuntimeError::ActorNotFound("p-1".into()))
    );
    system.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_from_handler_completes() {
    let system = started("stop-inside");
    let recorder = RecordingHandler::new();
    system
        .spawn_actor("driver", "driver-1", 8, recorder.handler(), SupervisionPolicy::Resume)
        .unwrap();

    struct StopAll;

    #[async_trait]
    impl ActorHandler for StopAll {
        async fn handle(
            &mut self,
            _message: Message,
            ctx: &ActorContext,
        ) -> Result<(), HandlerError> {
            ctx.system().stop().await.map_err(HandlerError::from)
        }
    }

    system
        .spawn_actor("admin", "admin", 8, StopAll, SupervisionPolicy::Resume)
        .unwrap();
    system.send_message("admin", msg("shutdown")).unwrap();

    wait_until(|| system.list_actors().is_empty() && recorder.stopped()).await;
    assert!(!system.is_running());
    assert_eq!(system.stop().await, Ok(()));
}

#[tokio::test]
async fn test_parent_cancellation_stops_system() {
    let parent = CancellationToken::new();
    let system = ActorSystem::new("parent");
    system.start(&parent).unwrap();
    let recorder = RecordingHandler::new();
    system
        .spawn_actor("driver", "driver-1", 8, recorder.handler(), SupervisionPolicy::Restart)
        .unwrap();
    system.send_message("driver-1", msg("ping")).unwrap();
    wait_until(|| recorder.len() == 1).await;

    parent.cancel();
    wait_until(|| recorder.stopped() && system.list_actors().is_empty()).await;
    assert!(!system.is_running());
    assert_eq!(
        system.send_message("driver-1", msg("ping")),
        Err(RuntimeError::ActorSystemShutdown)
    );
    assert_eq!(system.stop().await, Ok(()));
}

#[tokio::test]
async fn test_message_metadata_reaches_handler() {
    let system = started("metadata");
    let recorder = RecordingHandler::new();
    system
        .spawn_actor("passenger", "p-1", 4, recorder.handler(), SupervisionPolicy::Resume)
        .unwrap();

    let sent = Message::new("request_ride", json!({"from": "A"}), Some("gateway"))
        .with_correlation_id("trip-7")
        .with_trace_id("trace-abc");
    system.send_message("p-1", sent.clone()).unwrap();
    wait_until(|| recorder.len() == 1).await;

    let received = &recorder.messages()[0];
    assert_eq!(received, &sent);
    assert_eq!(received.sender(), Some("gateway"));
    assert_eq!(received.correlation_id(), Some("trip-7"));
    system.stop().await.unwrap();
}
