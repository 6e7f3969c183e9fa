//! Provision and decommission a server by running a create and a destroy
//! workflow on a remote orchestrator.
//!
//! Control flow: `LifecycleController` -> `binder` -> `invoker` -> `poller`
//! -> `outputs` -> back to the controller, which records the server or runs
//! the destroy workflow to undo a server that never became ready.

pub mod binder;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod invoker;
pub mod lifecycle;
pub mod outputs;
pub mod poller;
pub mod readiness;
pub mod state_store;

pub use config::DriverConfig;
pub use error::{DriverError, Result};
pub use lifecycle::LifecycleController;
pub use poller::CompletionPoller;
pub use readiness::{ReadinessProbe, TcpReadinessProbe};
pub use state_store::StateStore;
