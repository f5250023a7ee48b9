//! car-agent - TCP-driven reaction controller.
//!
//! Listens for one-line commands and plays the matching reaction on the
//! car. Without GPIO access the actuators and panel are simulated and
//! every call is logged.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults (0.0.0.0:5005, faces from ./faces)
//! car-agent
//!
//! # Require a shared secret
//! CAR_AGENT_TOKEN=monstercookie car-agent
//!
//! # Watch every actuator call
//! car-agent --log-level trace
//!
//! # Send a command
//! echo "monstercookie:RIGHT" | nc localhost 5005
//! ```
//!
//! # Signals
//!
//! - `SIGTERM` / `SIGINT`: stop listening, let the current reaction finish,
//!   then release the hardware

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use car_agent::animation::DirectorySource;
use car_agent::config::{AnimationConfig, Config, QueueConfig, ReactionConfig, ServerConfig};
use car_agent::hal::{SimActuators, SimDisplay, StdDelay};
use car_agent::{services, AmbientIdle, BehaviorQueue, CarContext, Dispatcher, Reactions};

/// car-agent - reaction controller for a small robot car
#[derive(Parser, Debug)]
#[command(name = "car-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Interface to listen on
    #[arg(long, env = "CAR_AGENT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, env = "CAR_AGENT_PORT", default_value_t = 5005)]
    port: u16,

    /// Shared secret clients send as `token:COMMAND` (unset = no auth)
    #[arg(long, env = "CAR_AGENT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory holding `<Name>.txt` face sprites
    #[arg(short = 'f', long, env = "CAR_AGENT_FACES", default_value = "./faces")]
    faces_dir: String,

    /// Face panel width in pixels
    #[arg(long, default_value_t = 128)]
    width: u32,

    /// Face panel height in pixels
    #[arg(long, default_value_t = 32)]
    height: u32,

    /// How long to wait for a request line, in milliseconds
    #[arg(long, default_value_t = 5000)]
    read_timeout_ms: u32,

    /// Idle poll interval of the behavior worker, in milliseconds
    #[arg(long, default_value_t = 500)]
    idle_poll_ms: u32,

    /// Chance that an idle cycle blinks instead of resting (0.0 - 1.0)
    #[arg(long, default_value_t = 0.25)]
    blink_chance: f32,

    /// Seed for the ambient blink RNG (random if unset)
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> Config {
        Config::default()
            .with_server(
                ServerConfig::default()
                    .with_host(&self.host)
                    .with_port(self.port)
                    .with_token(self.token.as_deref().unwrap_or(""))
                    .with_read_timeout_ms(self.read_timeout_ms),
            )
            .with_queue(QueueConfig::default().with_idle_poll_ms(self.idle_poll_ms))
            .with_reactions(ReactionConfig::default().with_blink_chance(self.blink_chance))
            .with_animation(
                AnimationConfig::default()
                    .with_faces_dir(&self.faces_dir)
                    .with_size(self.width, self.height),
            )
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("car_agent={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .init();
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            error!(error = %e, "failed to listen for Ctrl-C");
                        }
                        info!("received SIGINT");
                    }
                    _ = sigterm.recv() => info!("received SIGTERM"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
    }
    info!("received SIGINT");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    let config = args.config();

    info!(version = env!("CARGO_PKG_VERSION"), "car-agent starting");

    // =========================================================================
    // Hardware
    // =========================================================================
    let (width, height) = (config.animation.width, config.animation.height);
    let source = DirectorySource::new(config.animation.faces_dir.as_str(), width, height);
    info!(faces_dir = %config.animation.faces_dir, width, height, "face source");

    let ctx = CarContext::new(
        SimActuators::new(),
        SimDisplay::new(width, height),
        source,
        Arc::new(StdDelay),
    )
    .map_err(|e| anyhow!("hardware init failed: {e:?}"))?;
    let ctx = Arc::new(ctx);

    let faces = config.reactions.ambient_faces();
    let ready = ctx.animations().preload(&faces);
    info!(ready, total = faces.len(), "ambient animations loaded");
    ctx.show_first_frame(config.reactions.ambient_rest.as_str());

    // =========================================================================
    // Behavior worker
    // =========================================================================
    let idle = match args.seed {
        Some(seed) => AmbientIdle::with_seed(Arc::clone(&ctx), &config.reactions, seed),
        None => AmbientIdle::new(Arc::clone(&ctx), &config.reactions),
    };
    let queue = BehaviorQueue::start(idle, &config.queue).context("failed to start behavior worker")?;

    let reactions = Reactions::new(Arc::clone(&ctx), config.reactions.clone());
    let dispatcher = Arc::new(Dispatcher::from_config(queue.clone(), reactions, &config));
    if !config.server.has_auth() {
        warn!("no token configured, authentication disabled");
    }

    // =========================================================================
    // Serve until signalled
    // =========================================================================
    let served = serve(&config, dispatcher).await;
    if let Err(e) = &served {
        error!(error = format!("{e:#}"), "command listener failed");
    }

    // Cleanup runs whether or not serving succeeded
    queue.stop();
    let worker = queue.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || worker.join()).await {
        error!(error = %e, "failed to join behavior worker");
    }
    ctx.shutdown();
    info!("car-agent stopped");

    served
}

async fn serve<H: car_agent::LineHandler>(config: &Config, handler: Arc<H>) -> Result<()> {
    let listener = services::bind(&config.server).await?;
    let read_timeout = Duration::from_millis(u64::from(config.server.read_timeout_ms));
    services::serve(listener, handler, read_timeout, shutdown_signal()).await;
    Ok(())
}
