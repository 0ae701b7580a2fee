//! Engine lifecycle and interception dispatch for instrumenting host processes.
//!
//! An [`Engine`] is created per host module through an [`EngineRegistry`]. Each
//! engine runs a worker thread which detects the render backend of the host
//! and patches it through the configured [`BackendWorker`]. Patched functions
//! raise events with [`invoke_event!`], which reach the callback tables set on
//! the engine.
//!
//! While any engine is alive, process termination is intercepted so every
//! worker can remove its hooks before the process goes away.

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod guard;
pub mod host;
pub mod log;
pub mod registry;

mod engine;
mod worker;

#[cfg(test)]
mod testing;

pub use backend::{BackendResources, BackendVariant, BackendWorker, RawInterface, RenderPipeline};
pub use config::{EngineConfig, HookTargets, LoggingConfig};
pub use dispatch::{
    CoreAudioCallbacks, D3D9Callbacks, D3D10Callbacks, D3D11Callbacks, D3D12Callbacks,
    EventCallbacks, EventExtension,
};
pub use engine::Engine;
pub use error::{EngineError, ErrorCode};
pub use guard::{ShutdownPolicy, TimeoutAction};
pub use host::Host;
pub use log::LogLevel;
pub use registry::{EngineRegistry, HostModule};
