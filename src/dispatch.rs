//! Command dispatcher: authenticated request line in, reply out.
//!
//! The dispatcher never waits for a reaction. Enqueueing commands reply as
//! soon as the job is queued; the behavior worker does the rest.

use tracing::{debug, warn};

use crate::commands::{Command, Reply, Request};
use crate::config::Config;
use crate::queue::{BehaviorQueue, Job};
use crate::reactions::ReactionFactory;

/// Handles one request line and returns the reply text.
///
/// Implemented by [`Dispatcher`]; the listener depends only on this trait.
pub trait LineHandler: Send + Sync + 'static {
    /// Reply to `line`, without the trailing newline.
    fn respond(&self, line: &str) -> String;
}

/// Maps requests to queue jobs and replies.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use car_agent::{BehaviorQueue, CarContext, Dispatcher, NoIdle, Reactions};
/// use car_agent::config::{QueueConfig, ReactionConfig};
/// use car_agent::hal::{MockActuators, MockDelay, MockDisplay, MockSource};
///
/// let ctx = Arc::new(
///     CarContext::new(MockActuators::new(), MockDisplay::new(8, 4), MockSource::new(), Arc::new(MockDelay::new()))
///         .unwrap(),
/// );
/// let queue = BehaviorQueue::start(NoIdle, &QueueConfig::default()).unwrap();
/// let dispatcher = Dispatcher::new(queue.clone(), Reactions::new(ctx, ReactionConfig::default()))
///     .with_token("s3cret");
///
/// assert_eq!(dispatcher.handle_line("s3cret:PING").as_str(), "PONG");
/// assert_eq!(dispatcher.handle_line("PING").as_str(), "ERR AUTH");
/// assert_eq!(dispatcher.handle_line("s3cret:dance").as_str(), "ERR UNKNOWN");
///
/// queue.stop();
/// queue.join();
/// ```
pub struct Dispatcher<R> {
    queue: BehaviorQueue,
    reactions: R,
    token: String,
}

impl<R: ReactionFactory> Dispatcher<R> {
    /// Creates a dispatcher with authentication disabled.
    pub fn new(queue: BehaviorQueue, reactions: R) -> Self {
        Self {
            queue,
            reactions,
            token: String::new(),
        }
    }

    /// Creates a dispatcher using the token from `config`.
    pub fn from_config(queue: BehaviorQueue, reactions: R, config: &Config) -> Self {
        Self::new(queue, reactions).with_token(&config.server.token)
    }

    /// Requires `token:` before every payload. Empty disables auth.
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    /// The queue jobs are sent to.
    pub fn queue(&self) -> &BehaviorQueue {
        &self.queue
    }

    /// Authenticates `line` and dispatches its payload.
    pub fn handle_line(&self, line: &str) -> Reply {
        let command = Command::parse(line);
        if !command.is_authorized(&self.token) {
            warn!(token = ?command.token(), "rejected request with bad token");
            return Reply::ErrAuth;
        }
        self.dispatch(command.payload())
    }

    /// Dispatches an already authenticated payload.
    pub fn dispatch(&self, payload: &str) -> Reply {
        let request = Request::parse(payload);
        debug!(?request, "dispatch");

        match request {
            Request::Ping => Reply::Pong,
            Request::Idle => Reply::OkIdle,
            Request::Right => self.submit(self.reactions.happy(), Reply::OkRight),
            Request::Wrong => self.submit(self.reactions.sad(), Reply::OkSad),
            Request::Face { name, repeat } => {
                // A missing or unparsable count plays once; 0 plays nothing
                self.submit(self.reactions.face(&name, repeat.unwrap_or(1)), Reply::OkFace)
            }
            Request::Unknown => Reply::ErrUnknown,
        }
    }

    fn submit(&self, job: Job, ok: Reply) -> Reply {
        match self.queue.enqueue(job) {
            Ok(()) => ok,
            Err(e) => {
                warn!(error = %e, "request refused");
                Reply::ErrStopped
            }
        }
    }
}

impl<R: ReactionFactory> LineHandler for Dispatcher<R> {
    fn respond(&self, line: &str) -> String {
        self.handle_line(line).as_str().to_string()
    }
}
