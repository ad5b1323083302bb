//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Env overrides → CLI overrides → Validate
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Clear session registry (streams end)
//!         → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Open SSE streams never finish on their own, so the registry is cleared
//!   before draining; otherwise graceful shutdown would wait forever

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::shutdown_signal;
pub use startup::{resolve_config, CliOverrides};
