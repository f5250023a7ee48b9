//! Integration tests for reactions running against mock hardware

use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::{Duration, Instant};

use car_agent::config::{QueueConfig, ReactionConfig};
use car_agent::hal::{ActuatorEvent, EventLog, MockActuators, MockDelay, MockDisplay, MockSource, StdDelay};
use car_agent::reactions::{script_duration, LedPattern, HAPPY_MOTION, SAD_MOTION};
use car_agent::{job, Actuators, BehaviorQueue, CarContext, NoIdle, ReactionState, Reactions};

type MockContext = CarContext<MockActuators, MockDisplay, MockSource>;

struct Rig {
    ctx: Arc<MockContext>,
    reactions: Reactions<MockActuators, MockDisplay, MockSource>,
    log: EventLog,
    delay: MockDelay,
}

fn source() -> MockSource {
    MockSource::new()
        .with_frames("Happy", 2, 8, 4)
        .with_frames("Love", 2, 8, 4)
        .with_frames("Sad", 3, 8, 4)
        .with_frames("Cry", 3, 8, 4)
        .with_frames("Idle", 1, 8, 4)
        .with_frames("Blink", 2, 8, 4)
}

fn rig() -> Rig {
    let car = MockActuators::new();
    let log = car.log();
    let delay = MockDelay::new();
    let ctx = Arc::new(CarContext::new(car, MockDisplay::new(8, 4), source(), Arc::new(delay.clone())).unwrap());
    log.clear();

    Rig {
        reactions: Reactions::new(Arc::clone(&ctx), ReactionConfig::default()),
        ctx,
        log,
        delay,
    }
}

fn shown(ctx: &MockContext) -> usize {
    ctx.with_display(|display| display.shown().len())
}

fn assert_at_rest(ctx: &MockContext) {
    ctx.with_actuators(|car| {
        assert_eq!(car.duty, 0.0);
        assert_eq!(car.angle, 0.0);
        assert!(car.led);
    });
    let idle = ctx.animations().first_frame("Idle").unwrap();
    ctx.with_display(|display| assert_eq!(display.last(), Some(&idle.bitmap)));
}

// ============================================================================
// Full Reactions
// ============================================================================

#[test]
fn happy_reaction_runs_all_three_parts_then_rests() {
    let rig = rig();
    let mut state = ReactionState::default();

    (rig.reactions.happy())(&mut state).unwrap();

    // Happy has 2 frames, played twice, then the resting frame
    assert_eq!(shown(&rig.ctx), 2 * 2 + 1);
    assert_at_rest(&rig.ctx);

    let events = rig.log.events();
    assert!(events.contains(&ActuatorEvent::Forward(70.0)));
    assert!(!events.iter().any(|e| matches!(e, ActuatorEvent::Backward(_))));
    // Six blink cycles plus the LED coming back on at rest
    assert_eq!(events.iter().filter(|e| e.is_led()).count(), 6 * 2 + 1);

    let frames = Duration::from_millis(80) * 4;
    assert_eq!(
        rig.delay.total(),
        script_duration(HAPPY_MOTION) + LedPattern::HAPPY.duration() + frames
    );
}

#[test]
fn sad_reaction_backs_off_and_rests() {
    let rig = rig();
    let mut state = ReactionState::default();

    (rig.reactions.sad())(&mut state).unwrap();

    assert_eq!(state.last_sad(), Some("Sad"));
    assert_eq!(shown(&rig.ctx), 3 * 2 + 1);
    assert_at_rest(&rig.ctx);

    let events = rig.log.events();
    assert!(events.contains(&ActuatorEvent::Backward(45.0)));
    assert_eq!(events.iter().filter(|e| e.is_led()).count(), 3 * 2 + 1);

    let frames = Duration::from_millis(80) * 6;
    assert_eq!(
        rig.delay.total(),
        script_duration(SAD_MOTION) + LedPattern::SAD.duration() + frames
    );
}

#[test]
fn reactions_alternate_faces_through_the_queue() {
    let rig = rig();
    let queue = BehaviorQueue::start(NoIdle, &QueueConfig::default().with_idle_poll_ms(10)).unwrap();
    let (tx, rx) = channel();

    let report = |queue: &BehaviorQueue| {
        let tx = tx.clone();
        queue
            .enqueue(job(move |state| {
                tx.send((state.last_happy().map(str::to_string), state.last_sad().map(str::to_string)))?;
                Ok(())
            }))
            .unwrap();
    };

    queue.enqueue(rig.reactions.happy()).unwrap();
    report(&queue);
    queue.enqueue(rig.reactions.happy()).unwrap();
    queue.enqueue(rig.reactions.sad()).unwrap();
    report(&queue);
    queue.enqueue(rig.reactions.happy()).unwrap();
    queue.enqueue(rig.reactions.sad()).unwrap();
    report(&queue);

    let wait = Duration::from_secs(5);
    assert_eq!(rx.recv_timeout(wait).unwrap(), (Some("Happy".into()), None));
    assert_eq!(rx.recv_timeout(wait).unwrap(), (Some("Love".into()), Some("Sad".into())));
    assert_eq!(rx.recv_timeout(wait).unwrap(), (Some("Happy".into()), Some("Cry".into())));

    queue.stop();
    queue.join();
    assert_eq!(queue.stats().failed, 0);
}

#[test]
fn happy_parts_run_at_the_same_time() {
    let car = MockActuators::new();
    let log = car.log();
    let ctx = Arc::new(CarContext::new(car, MockDisplay::new(8, 4), source(), Arc::new(StdDelay)).unwrap());
    let reactions = Reactions::new(Arc::clone(&ctx), ReactionConfig::default());
    log.clear();

    let started = Instant::now();
    (reactions.happy())(&mut ReactionState::default()).unwrap();
    let elapsed = started.elapsed();

    // Bounded by the longest part (motion), not the sum of all three
    let longest = script_duration(HAPPY_MOTION);
    let sum = longest + LedPattern::HAPPY.duration() + Duration::from_millis(80) * 4;
    assert!(elapsed >= longest, "{elapsed:?}");
    assert!(elapsed < sum - Duration::from_millis(500), "{elapsed:?} vs {sum:?}");

    // LED blinks land between the first and the late steering moves
    let events = log.events();
    let first_motion = events.iter().position(ActuatorEvent::is_motion).unwrap();
    let late_steer = events.iter().position(|e| *e == ActuatorEvent::Steer(-20.0)).unwrap();
    assert!(
        events[first_motion..late_steer].iter().any(ActuatorEvent::is_led),
        "{events:?}"
    );
}

#[test]
fn missing_reaction_face_still_moves_and_rests() {
    let car = MockActuators::new();
    let log = car.log();
    let source = MockSource::new().with_frames("Idle", 1, 8, 4);
    let ctx = Arc::new(CarContext::new(car, MockDisplay::new(8, 4), source, Arc::new(MockDelay::new())).unwrap());
    let reactions = Reactions::new(Arc::clone(&ctx), ReactionConfig::default());

    (reactions.happy())(&mut ReactionState::default()).unwrap();

    assert!(log.events().iter().any(ActuatorEvent::is_motion));
    assert_eq!(shown(&ctx), 1);
    assert_at_rest(&ctx);
}

// ============================================================================
// Failure Handling
// ============================================================================

/// Mock car whose drive motor refuses to go forward.
struct StalledMotor(MockActuators);

impl Actuators for StalledMotor {
    type Error = &'static str;

    fn steer(&mut self, angle_deg: f32) -> Result<(), Self::Error> {
        self.0.steer(angle_deg).map_err(|_| "steer")
    }

    fn forward(&mut self, _duty_pct: f32) -> Result<(), Self::Error> {
        Err("motor stalled")
    }

    fn backward(&mut self, duty_pct: f32) -> Result<(), Self::Error> {
        self.0.backward(duty_pct).map_err(|_| "backward")
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.0.stop().map_err(|_| "stop")
    }

    fn led_on(&mut self) -> Result<(), Self::Error> {
        self.0.led_on().map_err(|_| "led_on")
    }

    fn led_off(&mut self) -> Result<(), Self::Error> {
        self.0.led_off().map_err(|_| "led_off")
    }
}

#[test]
fn failed_motion_reports_error_but_car_still_rests() {
    let car = MockActuators::new();
    let log = car.log();
    let ctx = Arc::new(
        CarContext::new(StalledMotor(car), MockDisplay::new(8, 4), source(), Arc::new(MockDelay::new())).unwrap(),
    );
    let reactions = Reactions::new(Arc::clone(&ctx), ReactionConfig::default());

    let err = (reactions.happy())(&mut ReactionState::default()).unwrap_err();
    assert!(err.to_string().contains("motion task failed"), "{err}");

    // The LED pattern and animation were not cut short by the motion failure
    let events = log.events();
    assert_eq!(events.iter().filter(|e| e.is_led()).count(), 1 + 6 * 2 + 1);
    assert_eq!(events.last(), Some(&ActuatorEvent::LedOn));
    ctx.with_actuators(|car| {
        assert_eq!(car.0.duty, 0.0);
        assert_eq!(car.0.angle, 0.0);
        assert!(car.0.led);
    });
    ctx.with_display(|display| assert_eq!(display.shown().len(), 2 * 2 + 1));
}

#[test]
fn failed_reaction_does_not_block_the_next_one() {
    let car = MockActuators::new();
    let ctx = Arc::new(
        CarContext::new(StalledMotor(car), MockDisplay::new(8, 4), source(), Arc::new(MockDelay::new())).unwrap(),
    );
    let reactions = Reactions::new(Arc::clone(&ctx), ReactionConfig::default());
    let queue = BehaviorQueue::start(NoIdle, &QueueConfig::default().with_idle_poll_ms(10)).unwrap();

    queue.enqueue(reactions.happy()).unwrap();
    queue.enqueue(reactions.face("Blink", 1)).unwrap();
    let (tx, rx) = channel();
    queue
        .enqueue(job(move |_| {
            tx.send(())?;
            Ok(())
        }))
        .unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap();

    queue.stop();
    queue.join();
    let stats = queue.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 2);
}

// ============================================================================
// Face Jobs
// ============================================================================

#[test]
fn face_plays_requested_repeats_without_moving() {
    let rig = rig();

    (rig.reactions.face("Blink", 3))(&mut ReactionState::default()).unwrap();

    assert_eq!(shown(&rig.ctx), 2 * 3);
    assert!(rig.log.events().is_empty());
}

#[test]
fn unknown_face_completes_without_effect() {
    let rig = rig();

    (rig.reactions.face("Nope", 2))(&mut ReactionState::default()).unwrap();

    assert_eq!(shown(&rig.ctx), 0);
    assert!(rig.log.events().is_empty());
}

#[test]
fn animations_decode_once_across_reactions() {
    let rig = rig();
    let mut state = ReactionState::default();

    for _ in 0..3 {
        (rig.reactions.happy())(&mut state).unwrap();
        (rig.reactions.face("Blink", 1))(&mut state).unwrap();
    }

    let source = rig.ctx.animations().source();
    assert_eq!(source.decodes_of("Happy"), 1);
    assert_eq!(source.decodes_of("Love"), 1);
    assert_eq!(source.decodes_of("Idle"), 1);
    assert_eq!(source.decodes_of("Blink"), 1);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn shutdown_clears_display_and_releases_car() {
    let rig = rig();
    (rig.reactions.happy())(&mut ReactionState::default()).unwrap();

    rig.ctx.shutdown();

    rig.ctx.with_display(|display| assert_eq!(display.clears, 1));
    rig.ctx.with_actuators(|car| {
        assert!(car.released);
        assert!(!car.led);
        assert_eq!(car.duty, 0.0);
    });
    assert_eq!(rig.log.events().last(), Some(&ActuatorEvent::Release));
}
