//! Lifecycle orchestration.
//!
//! Constructors register [`Hook`] pairs through the [`Lifecycle`] registrar
//! while the object graph is being resolved. Once resolution finishes, the
//! [`Orchestrator`] owns every hook and drives them through the application
//! state machine:
//!
//! ```text
//! NotStarted ──start──> Starting ──ok──> Running ──stop──> Stopping ──> Stopped
//!                          │
//!                          └──hook failure / deadline──> StartFailed
//!                             (started hooks unwound in reverse first)
//! ```
//!
//! Start hooks run in registration order, stop hooks in exact reverse
//! order. Both phases share a deadline; a hook that outlives its remaining
//! budget is treated as failed.

mod error;
mod hook;
mod orchestrator;
mod shutdown;

pub use error::{LifecycleError, Result};
pub use hook::{Hook, Lifecycle};
pub use orchestrator::{AppState, Orchestrator};
pub use shutdown::shutdown_signal;
