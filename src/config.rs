//! Application configuration.
//!
//! Animation names use `heapless::String` so they stay fixed-size and cheap
//! to clone into worker threads. Hosts, tokens and paths are heap strings
//! and are never truncated.
//!
//! # Example
//!
//! ```rust
//! use car_agent::config::{Config, ReactionConfig, ServerConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.server.port, 5005);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_server(ServerConfig::default().with_port(6000).with_token("s3cret"))
//!     .with_reactions(ReactionConfig::default().with_happy("Grin", "Wink"));
//! assert_eq!(config.server.token.as_str(), "s3cret");
//! ```

use heapless::String as HString;

use crate::reactions::LedPattern;

/// Maximum length for animation names
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = HString::new();
    // Cut on a char boundary so the result stays valid UTF-8
    let mut end = s.len().min(MAX_SHORT_STRING);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let _ = hs.push_str(&s[..end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Command listener configuration
    pub server: ServerConfig,
    /// Behavior queue configuration
    pub queue: QueueConfig,
    /// Reaction choreography configuration
    pub reactions: ReactionConfig,
    /// Face animation configuration
    pub animation: AnimationConfig,
}

impl Config {
    /// Set listener configuration
    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    /// Set queue configuration
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Set reaction configuration
    pub fn with_reactions(mut self, reactions: ReactionConfig) -> Self {
        self.reactions = reactions;
        self
    }

    /// Set animation configuration
    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// TCP command listener configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Shared secret expected before `:` (empty = no auth), matched exactly
    pub token: String,
    /// How long to wait for a request line, in milliseconds
    pub read_timeout_ms: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5005,
            token: String::new(),
            read_timeout_ms: 5000,
        }
    }
}

impl ServerConfig {
    /// Set the bind host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the shared secret
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }

    /// Set the read timeout
    pub fn with_read_timeout_ms(mut self, ms: u32) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    /// Check if token authentication is enabled
    pub fn has_auth(&self) -> bool {
        !self.token.is_empty()
    }

    /// `host:port` string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Queue Config
// ============================================================================

/// Behavior queue configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueConfig {
    /// How long the worker waits for a job before running idle behavior
    pub idle_poll_ms: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { idle_poll_ms: 500 }
    }
}

impl QueueConfig {
    /// Set the idle poll interval
    pub fn with_idle_poll_ms(mut self, ms: u32) -> Self {
        self.idle_poll_ms = ms.max(1);
        self
    }
}

// ============================================================================
// Reaction Config
// ============================================================================

/// Reaction choreography configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReactionConfig {
    /// Faces the happy reaction alternates between
    pub happy: [ShortString; 2],
    /// Faces the sad reaction alternates between
    pub sad: [ShortString; 2],
    /// Ambient resting face (also the pose shown after each reaction)
    pub ambient_rest: ShortString,
    /// Ambient blink face
    pub ambient_blink: ShortString,
    /// Chance (0.0 to 1.0) that an idle cycle blinks instead of resting
    pub blink_chance: f32,
    /// How many times a reaction face plays
    pub reaction_repeat: u32,
    /// LED pattern during the happy reaction
    pub happy_led: LedPattern,
    /// LED pattern during the sad reaction
    pub sad_led: LedPattern,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            happy: [short_string("Happy"), short_string("Love")],
            sad: [short_string("Sad"), short_string("Cry")],
            ambient_rest: short_string("Idle"),
            ambient_blink: short_string("Blink"),
            blink_chance: 0.25,
            reaction_repeat: 2,
            happy_led: LedPattern::HAPPY,
            sad_led: LedPattern::SAD,
        }
    }
}

impl ReactionConfig {
    /// Set the two happy faces
    pub fn with_happy(mut self, first: &str, second: &str) -> Self {
        self.happy = [short_string(first), short_string(second)];
        self
    }

    /// Set the two sad faces
    pub fn with_sad(mut self, first: &str, second: &str) -> Self {
        self.sad = [short_string(first), short_string(second)];
        self
    }

    /// Set the ambient resting and blink faces
    pub fn with_ambient(mut self, rest: &str, blink: &str) -> Self {
        self.ambient_rest = short_string(rest);
        self.ambient_blink = short_string(blink);
        self
    }

    /// Set the blink chance
    pub fn with_blink_chance(mut self, chance: f32) -> Self {
        self.blink_chance = if chance.is_nan() { 0.0 } else { chance.clamp(0.0, 1.0) };
        self
    }

    /// Set how many times reaction faces repeat
    pub fn with_reaction_repeat(mut self, repeat: u32) -> Self {
        self.reaction_repeat = repeat;
        self
    }

    /// Set the LED patterns
    pub fn with_led_patterns(mut self, happy: LedPattern, sad: LedPattern) -> Self {
        self.happy_led = happy;
        self.sad_led = sad;
        self
    }

    /// Ambient faces worth loading at startup
    pub fn ambient_faces(&self) -> [&str; 2] {
        [self.ambient_rest.as_str(), self.ambient_blink.as_str()]
    }
}

// ============================================================================
// Animation Config
// ============================================================================

/// Face animation configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnimationConfig {
    /// Directory holding `<Name>.txt` sprite files
    pub faces_dir: String,
    /// Panel width in pixels
    pub width: u32,
    /// Panel height in pixels
    pub height: u32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            faces_dir: "./faces".to_string(),
            width: 128,
            height: 32,
        }
    }
}

impl AnimationConfig {
    /// Set the sprite directory
    pub fn with_faces_dir(mut self, dir: &str) -> Self {
        self.faces_dir = dir.to_string();
        self
    }

    /// Set the panel size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5005);
        assert_eq!(config.server.read_timeout_ms, 5000);
        assert_eq!(config.queue.idle_poll_ms, 500);
        assert_eq!(config.animation.width, 128);
        assert_eq!(config.animation.height, 32);
    }

    #[test]
    fn server_auth_detection() {
        assert!(!ServerConfig::default().has_auth());
        assert!(ServerConfig::default().with_token("monster").has_auth());
        assert!(!ServerConfig::default().with_token("").has_auth());
    }

    #[test]
    fn server_bind_addr() {
        let server = ServerConfig::default().with_host("127.0.0.1").with_port(7000);
        assert_eq!(server.bind_addr(), "127.0.0.1:7000");
    }

    #[test]
    fn reaction_defaults() {
        let reactions = ReactionConfig::default();
        assert_eq!(reactions.happy[0].as_str(), "Happy");
        assert_eq!(reactions.happy[1].as_str(), "Love");
        assert_eq!(reactions.sad[0].as_str(), "Sad");
        assert_eq!(reactions.sad[1].as_str(), "Cry");
        assert_eq!(reactions.ambient_faces(), ["Idle", "Blink"]);
        assert_eq!(reactions.reaction_repeat, 2);
        assert_eq!(reactions.happy_led, LedPattern::HAPPY);
    }

    #[test]
    fn blink_chance_clamped() {
        assert_eq!(ReactionConfig::default().with_blink_chance(1.5).blink_chance, 1.0);
        assert_eq!(ReactionConfig::default().with_blink_chance(-0.5).blink_chance, 0.0);
        assert_eq!(ReactionConfig::default().with_blink_chance(f32::NAN).blink_chance, 0.0);
    }

    #[test]
    fn idle_poll_never_zero() {
        assert_eq!(QueueConfig::default().with_idle_poll_ms(0).idle_poll_ms, 1);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_server(ServerConfig::default().with_port(6000).with_read_timeout_ms(100))
            .with_queue(QueueConfig::default().with_idle_poll_ms(50))
            .with_reactions(ReactionConfig::default().with_sad("Frown", "Tear"))
            .with_animation(AnimationConfig::default().with_faces_dir("/srv/faces").with_size(64, 48));

        assert_eq!(config.server.port, 6000);
        assert_eq!(config.server.read_timeout_ms, 100);
        assert_eq!(config.queue.idle_poll_ms, 50);
        assert_eq!(config.reactions.sad[0].as_str(), "Frown");
        assert_eq!(config.animation.faces_dir.as_str(), "/srv/faces");
        assert_eq!((config.animation.width, config.animation.height), (64, 48));
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 3-byte chars: 64 is not a multiple of 3
        let input = "é€".repeat(40);
        let s = short_string(&input);
        assert!(s.len() <= MAX_SHORT_STRING);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());

        let s = short_string(&"€".repeat(100));
        assert_eq!(s.len() % 3, 0);
    }

    #[test]
    fn long_token_kept_whole() {
        let token = "k".repeat(70) + "€";
        let server = ServerConfig::default().with_token(&token);
        assert_eq!(server.token, token);
        assert!(server.has_auth());
    }

    #[test]
    fn long_faces_dir_kept_whole() {
        let dir = format!("/srv/{}/faces", "nested/".repeat(30));
        assert!(dir.len() > 200);
        let animation = AnimationConfig::default().with_faces_dir(&dir);
        assert_eq!(animation.faces_dir, dir);
    }

    #[test]
    fn long_host_kept_whole() {
        let host = format!("{}.example.internal", "edge".repeat(20));
        let server = ServerConfig::default().with_host(&host).with_port(80);
        assert_eq!(server.bind_addr(), format!("{host}:80"));
    }
}
