//! # Armature
//!
//! A dependency injection container with lifecycle orchestration for Rust.
//!
//! Armature builds one in-process object graph for the lifetime of a
//! process: constructors are registered against the type they produce, the
//! graph is resolved depth-first on demand, and the objects it produces may
//! register start/stop hooks that run in a strict order with timeout and
//! rollback semantics. Every container action is reported through a
//! structured event stream.
//!
//! ## Features
//!
//! - **Typed provider registry**: one constructor per output type, duplicate
//!   registration rejected, unknown and cyclic dependencies reported with
//!   full context
//! - **Singleton resolution**: each constructor runs at most once; values
//!   are shared as `Arc`s across every dependent
//! - **Lifecycle hooks**: constructors append start/stop pairs; start runs
//!   in registration order, stop in exact reverse, with per-phase deadlines
//!   and rollback on partial start failure
//! - **Structured events**: a pluggable [`EventSink`] observes resolution,
//!   invocation, and every hook execution
//! - **Process supervision**: [`App::run`] starts the graph, blocks until
//!   SIGINT/SIGTERM, stops it, and reports an exit code
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use armature::{App, BuildContext, Hook, ServiceKey};
//!
//! struct Config {
//!     addr: String,
//! }
//!
//! struct Server {
//!     addr: String,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = App::builder()
//!         .supply(Config { addr: "127.0.0.1:8080".into() })
//!         .provide("new_server", &[ServiceKey::of::<Config>()], |cx: &mut BuildContext| {
//!             let config = cx.get::<Config>()?;
//!             let addr = config.addr.clone();
//!             cx.lifecycle().append(
//!                 Hook::named("serve")
//!                     .on_start(|| async { /* bind and spawn */ Ok(()) })
//!                     .on_stop(|| async { /* signal and join */ Ok(()) }),
//!             );
//!             Ok(Server { addr })
//!         })
//!         .invoke("main", &[ServiceKey::of::<Server>()], |cx: &mut BuildContext| {
//!             let _ = cx.get::<Server>();
//!             async {}
//!         })
//!         .build()
//!         .await
//!         .expect("failed to build application graph");
//!
//!     std::process::exit(app.run().await);
//! }
//! ```

pub mod app;
pub mod di;
pub mod error;
pub mod event;
pub mod lifecycle;

// Re-export core types
pub use app::{App, AppBuilder, DEFAULT_START_TIMEOUT, DEFAULT_STOP_TIMEOUT};
pub use di::{BuildContext, Provider, ProviderRegistry, ServiceKey};
pub use error::{ArmatureError, Result};
pub use event::{Event, EventSink, TracingSink};
pub use lifecycle::{AppState, Hook, Lifecycle, LifecycleError, Orchestrator, shutdown_signal};

/// Prelude module for convenient imports
///
/// ```
/// use armature::prelude::*;
/// ```
pub mod prelude {
    pub use crate::app::{App, AppBuilder};
    pub use crate::di::{BuildContext, ServiceKey};
    pub use crate::error::{ArmatureError, Result};
    pub use crate::event::{Event, EventSink, TracingSink};
    pub use crate::lifecycle::{
        AppState, Hook, Lifecycle, LifecycleError, shutdown_signal,
    };
    pub use std::sync::Arc;
}
