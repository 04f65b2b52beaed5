//! Viewport rendering pipeline.
//!
//! The window cache ([`window`]) decides which lines are needed, the worker
//! ([`worker`]) reads them off the session in the background, and the coordinator
//! ([`service`]) ties the two together over the [`protocol`] channels.

pub mod protocol;
pub mod service;
pub mod window;
pub mod worker;

pub use protocol::{RequestId, WorkerCommand, WorkerResponse};
pub use service::{SearchState, WindowCoordinator};
pub use window::{ViewportWindow, WindowPhase};
pub use worker::session_worker_loop;
