//! End-to-end tests: request lines through the dispatcher to mock hardware

use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

use car_agent::config::{Config, QueueConfig, ServerConfig};
use car_agent::hal::{ActuatorEvent, EventLog, MockActuators, MockDelay, MockDisplay, MockSource};
use car_agent::{job, BehaviorQueue, CarContext, Dispatcher, LineHandler, NoIdle, Reactions, Reply};

type MockReactions = Reactions<MockActuators, MockDisplay, MockSource>;
type MockContext = CarContext<MockActuators, MockDisplay, MockSource>;

fn setup(token: &str) -> (Dispatcher<MockReactions>, Arc<MockContext>, EventLog) {
    let source = MockSource::new()
        .with_frames("Happy", 2, 8, 4)
        .with_frames("Love", 2, 8, 4)
        .with_frames("Sad", 2, 8, 4)
        .with_frames("Cry", 2, 8, 4)
        .with_frames("Idle", 1, 8, 4)
        .with_frames("Blink", 2, 8, 4);
    let car = MockActuators::new();
    let log = car.log();
    let ctx = Arc::new(CarContext::new(car, MockDisplay::new(8, 4), source, Arc::new(MockDelay::new())).unwrap());
    log.clear();

    let config = Config::default()
        .with_server(ServerConfig::default().with_token(token))
        .with_queue(QueueConfig::default().with_idle_poll_ms(10));
    let queue = BehaviorQueue::start(NoIdle, &config.queue).unwrap();
    let reactions = Reactions::new(Arc::clone(&ctx), config.reactions.clone());

    (Dispatcher::from_config(queue, reactions, &config), ctx, log)
}

/// Waits until every job queued so far has run.
fn settle(dispatcher: &Dispatcher<MockReactions>) {
    let (tx, rx) = channel();
    dispatcher
        .queue()
        .enqueue(job(move |_| {
            tx.send(())?;
            Ok(())
        }))
        .unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
}

fn finish(dispatcher: &Dispatcher<MockReactions>, ctx: &MockContext) {
    dispatcher.queue().stop();
    dispatcher.queue().join();
    ctx.shutdown();
}

#[test]
fn right_moves_the_car_forward() {
    let (dispatcher, ctx, log) = setup("");

    assert_eq!(dispatcher.handle_line("RIGHT\r"), Reply::OkRight);
    settle(&dispatcher);

    assert!(log.events().contains(&ActuatorEvent::Forward(70.0)));
    ctx.with_actuators(|car| assert_eq!(car.duty, 0.0));
    finish(&dispatcher, &ctx);
}

#[test]
fn wrong_replies_ok_sad_and_backs_off() {
    let (dispatcher, ctx, log) = setup("");

    assert_eq!(dispatcher.respond("wrong"), "OK SAD");
    settle(&dispatcher);

    assert!(log.events().contains(&ActuatorEvent::Backward(45.0)));
    finish(&dispatcher, &ctx);
}

#[test]
fn face_request_plays_on_display_only() {
    let (dispatcher, ctx, log) = setup("");

    assert_eq!(dispatcher.respond("FACE Blink 3"), "OK FACE");
    settle(&dispatcher);

    ctx.with_display(|display| assert_eq!(display.shown().len(), 6));
    assert!(log.events().is_empty());
    finish(&dispatcher, &ctx);
}

#[test]
fn face_repeat_count_is_honoured() {
    let (dispatcher, ctx, _log) = setup("");

    assert_eq!(dispatcher.respond("FACE Blink 20"), "OK FACE");
    settle(&dispatcher);
    // 20 plays of 2 frames
    ctx.with_display(|display| assert_eq!(display.shown().len(), 40));

    assert_eq!(dispatcher.respond("FACE Blink 0"), "OK FACE");
    settle(&dispatcher);
    ctx.with_display(|display| assert_eq!(display.shown().len(), 40));
    finish(&dispatcher, &ctx);
}

#[test]
fn unknown_face_is_accepted_and_harmless() {
    let (dispatcher, ctx, _log) = setup("");

    assert_eq!(dispatcher.respond("FACE Nope"), "OK FACE");
    settle(&dispatcher);

    ctx.with_display(|display| assert!(display.shown().is_empty()));
    finish(&dispatcher, &ctx);
    assert_eq!(dispatcher.queue().stats().failed, 0);
}

#[test]
fn token_guards_every_command() {
    let (dispatcher, ctx, log) = setup("monstercookie");

    assert_eq!(dispatcher.respond("PING"), "ERR AUTH");
    assert_eq!(dispatcher.respond("cookie:RIGHT"), "ERR AUTH");
    assert_eq!(dispatcher.respond(" monstercookie : ping "), "PONG");
    assert_eq!(dispatcher.respond("monstercookie:RIGHT"), "OK RIGHT");
    settle(&dispatcher);

    // Only the authorised RIGHT ran
    let forwards = log
        .events()
        .iter()
        .filter(|e| **e == ActuatorEvent::Forward(70.0))
        .count();
    assert_eq!(forwards, 1);
    finish(&dispatcher, &ctx);
    // RIGHT plus the settle marker
    assert_eq!(dispatcher.queue().stats().completed, 2);
}

#[test]
fn long_token_is_not_shortened() {
    let token = "monstercookie".repeat(6);
    assert!(token.len() > 64);
    let (dispatcher, ctx, _log) = setup(&token);

    assert_eq!(dispatcher.respond(&format!("{token}:PING")), "PONG");
    assert_eq!(dispatcher.respond(&format!("{}:PING", &token[..64])), "ERR AUTH");
    assert_eq!(dispatcher.respond(&format!("{token}:RIGHT")), "OK RIGHT");
    finish(&dispatcher, &ctx);
}

#[test]
fn unknown_and_empty_requests_are_rejected() {
    let (dispatcher, ctx, _log) = setup("");

    assert_eq!(dispatcher.respond(""), "ERR UNKNOWN");
    assert_eq!(dispatcher.respond("DANCE"), "ERR UNKNOWN");
    assert_eq!(dispatcher.respond("PING now"), "ERR UNKNOWN");
    assert_eq!(dispatcher.respond("IDLE"), "OK IDLE");
    assert_eq!(dispatcher.queue().pending(), 0);
    finish(&dispatcher, &ctx);
}

#[test]
fn requests_after_stop_are_refused() {
    let (dispatcher, ctx, _log) = setup("");
    dispatcher.queue().stop();

    assert_eq!(dispatcher.respond("RIGHT"), "ERR STOPPED");
    assert_eq!(dispatcher.respond("FACE Blink"), "ERR STOPPED");
    assert_eq!(dispatcher.respond("PING"), "PONG");
    finish(&dispatcher, &ctx);
}

#[test]
fn back_to_back_reactions_run_in_order() {
    let (dispatcher, ctx, log) = setup("");

    for line in ["RIGHT", "WRONG", "RIGHT"] {
        assert!(!dispatcher.handle_line(line).is_error());
    }
    settle(&dispatcher);

    let drives: Vec<ActuatorEvent> = log
        .events()
        .into_iter()
        .filter(|e| matches!(e, ActuatorEvent::Forward(70.0) | ActuatorEvent::Backward(45.0)))
        .collect();
    assert_eq!(
        drives,
        vec![
            ActuatorEvent::Forward(70.0),
            ActuatorEvent::Backward(45.0),
            ActuatorEvent::Forward(70.0)
        ]
    );
    finish(&dispatcher, &ctx);
}
