//! Network services (requires the `server` feature).
//!
//! - `listener`: tokio TCP listener speaking the one-line command protocol
//!
//! The listener only moves bytes. Authentication and dispatch happen in a
//! [`LineHandler`](crate::dispatch::LineHandler), normally the
//! [`Dispatcher`](crate::Dispatcher):
//!
//! ```ignore
//! use std::sync::Arc;
//! use car_agent::services;
//!
//! let listener = services::bind(&config.server).await?;
//! services::serve(listener, Arc::new(dispatcher), read_timeout, shutdown_signal).await;
//! ```

pub mod listener;

pub use listener::{bind, handle_connection, read_request, serve, MAX_REQUEST_BYTES};
