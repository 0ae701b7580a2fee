//! Process wide engine registry keyed by host module.

use core::fmt::{self, Display, Formatter};
use std::sync::Arc;

use nohash_hasher::{IntMap, IsEnabled};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::{
    Engine,
    config::EngineConfig,
    error::EngineError,
    guard::ShutdownPolicy,
    host::Host,
    log::LogSink,
    worker,
};

/// Address identifying the loaded module an engine belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostModule(usize);

impl HostModule {
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    #[inline]
    pub const fn addr(self) -> usize {
        self.0
    }
}

impl IsEnabled for HostModule {}

impl From<usize> for HostModule {
    fn from(addr: usize) -> Self {
        Self(addr)
    }
}

impl Display for HostModule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

pub(crate) struct RegistryState {
    pub engines: IntMap<HostModule, Arc<Engine>>,
    pub exit_hooked: bool,
}

/// Registry of live engines, at most one per host module.
pub struct EngineRegistry {
    pub(crate) state: Mutex<RegistryState>,
    pub(crate) host: Box<dyn Host>,
    pub(crate) policy: ShutdownPolicy,
}

impl EngineRegistry {
    pub fn new(host: impl Host) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                engines: IntMap::default(),
                exit_hooked: false,
            }),
            host: Box::new(host),
            policy: ShutdownPolicy::default(),
        }
    }

    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registry of the current process.
    #[cfg(windows)]
    pub fn global() -> &'static EngineRegistry {
        use once_cell::sync::Lazy;

        use crate::host::win32::Win32Host;

        static REGISTRY: Lazy<EngineRegistry> = Lazy::new(|| EngineRegistry::new(Win32Host::new()));

        &REGISTRY
    }

    /// Create an engine for `module` and launch its worker thread.
    #[tracing::instrument(skip(self, config))]
    pub fn create(
        &self,
        module: HostModule,
        config: EngineConfig,
    ) -> Result<Arc<Engine>, EngineError> {
        let mut state = self.state.lock();
        if state.engines.contains_key(&module) {
            return Err(EngineError::AlreadyAllocated);
        }

        self.host
            .pin_module(module)
            .map_err(EngineError::ReferenceIncrementFailed)?;

        self.arm_guard(&mut state);

        let log = LogSink::open(&config.logging, module);
        let engine = Arc::new(Engine::new(module, config, log));
        engine.with_log(|| {
            info!(target: "indicium::api", "engine initialized, attempting to launch worker thread");
        });

        let handle = match worker::spawn(&*self.host, &engine) {
            Ok(handle) => handle,
            Err(err) => {
                engine.with_log(|| {
                    error!(
                        target: "indicium::api",
                        "could not create worker thread, library unusable. err: {err:?}"
                    );
                });

                if state.engines.is_empty() {
                    self.disarm_guard(&mut state);
                }

                return Err(EngineError::CreateThreadFailed(err));
            }
        };
        engine.attach_worker(handle);
        engine.with_log(|| {
            info!(target: "indicium::api", "worker thread created successfully");
        });

        state.engines.insert(module, engine.clone());
        Ok(engine)
    }

    /// Unregister the engine of `module` and release its resources.
    ///
    /// The worker thread is not stopped. Call [`Engine::request_stop`] first for a graceful shutdown.
    #[tracing::instrument(skip(self))]
    pub fn destroy(&self, module: HostModule) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        let engine = state
            .engines
            .remove(&module)
            .ok_or(EngineError::InvalidHandle)?;

        if state.engines.is_empty() {
            self.disarm_guard(&mut state);
        }
        drop(state);

        engine.with_log(|| {
            info!(target: "indicium::api", "freeing remaining resources");

            if let Some(worker) = engine.take_worker() {
                if !worker.is_finished() {
                    debug!(target: "indicium::api", "detaching running worker thread");
                }
                drop(worker);
            }
            engine.free_custom_context();

            info!(target: "indicium::api", "engine shutdown complete");
        });

        Ok(())
    }

    pub fn get(&self, module: HostModule) -> Option<Arc<Engine>> {
        self.state.lock().engines.get(&module).cloned()
    }

    /// Look up a registered engine by its address.
    pub fn resolve(&self, engine: *const Engine) -> Result<Arc<Engine>, EngineError> {
        if engine.is_null() {
            return Err(EngineError::InvalidEngineHandle);
        }

        self.state
            .lock()
            .engines
            .values()
            .find(|registered| Arc::as_ptr(registered) == engine)
            .cloned()
            .ok_or(EngineError::InvalidEngineHandle)
    }

    pub fn len(&self) -> usize {
        self.state.lock().engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().engines.is_empty()
    }

    /// Check if process termination is currently intercepted.
    pub fn is_exit_hooked(&self) -> bool {
        self.state.lock().exit_hooked
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Engine>> {
        self.state.lock().engines.values().cloned().collect()
    }
}
