use core::{fmt::Display, time::Duration};
use std::{sync::Arc, thread::JoinHandle};

use once_cell::sync::OnceCell;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{trace, warn};

use crate::{
    backend::{BackendResources, BackendVariant, RenderPipeline},
    config::EngineConfig,
    dispatch::{EventCallbacks, EventExtension, EventTable, EventTables},
    error::EngineError,
    event::Event,
    log::{LogLevel, LogSink},
    registry::HostModule,
};

/// One instrumentation session attached to a host module.
pub struct Engine {
    host_module: HostModule,
    backend: OnceCell<BackendVariant>,
    config: EngineConfig,
    events: EventTables,

    cancellation: Event,
    finished: Event,
    worker: Mutex<Option<JoinHandle<()>>>,

    context: Mutex<Option<Box<[u8]>>>,
    resources: Mutex<BackendResources>,

    log: LogSink,
}

impl Engine {
    pub(crate) fn new(host_module: HostModule, config: EngineConfig, log: LogSink) -> Self {
        Self {
            host_module,
            backend: OnceCell::new(),
            config,
            events: EventTables::default(),
            cancellation: Event::new(),
            finished: Event::new(),
            worker: Mutex::new(None),
            context: Mutex::new(None),
            resources: Mutex::new(BackendResources::default()),
            log,
        }
    }

    #[inline]
    pub fn host_module(&self) -> HostModule {
        self.host_module
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render backend detected by the worker, [`BackendVariant::Unknown`] until detection completes.
    #[inline]
    pub fn backend(&self) -> BackendVariant {
        self.backend.get().copied().unwrap_or_default()
    }

    /// Record the detected backend. The first recorded variant wins.
    pub(crate) fn set_backend(&self, variant: BackendVariant) -> bool {
        if self.backend.set(variant).is_err() {
            warn!(
                "backend already detected as {:?}, ignoring {:?}",
                self.backend(),
                variant
            );
            return false;
        }

        true
    }

    /// Replace the callback table of one backend variant.
    pub fn set_callbacks(&self, callbacks: impl Into<EventCallbacks>) {
        self.events.store(callbacks.into());
    }

    /// Run `f` with the callback table `T` if it may be consulted.
    ///
    /// Render tables are only consulted once their variant has been detected.
    pub fn dispatch<T: EventTable>(self: &Arc<Self>, f: impl FnOnce(&T, &EventExtension<'_>)) {
        if let Some(variant) = T::VARIANT {
            if self.backend() != variant {
                trace!("ignoring {:?} event on {:?} backend", variant, self.backend());
                return;
            }
        }

        let table = self.events.load::<T>();
        f(&table, &EventExtension::new(self));
    }

    /// Copy `payload` into newly allocated custom context memory.
    ///
    /// Previous context memory is released first, even if the allocation fails.
    pub fn alloc_custom_context(&self, payload: &[u8]) -> Result<(), EngineError> {
        self.alloc_custom_context_with(payload.len(), |buf| buf.copy_from_slice(payload))
    }

    /// Allocate `size` zeroed bytes of custom context memory and fill them with `init`.
    ///
    /// Previous context memory is released first, even if the allocation fails.
    /// `init` runs with the context locked and must not access the custom context.
    pub fn alloc_custom_context_with(
        &self,
        size: usize,
        init: impl FnOnce(&mut [u8]),
    ) -> Result<(), EngineError> {
        let mut context = self.context.lock();
        context.take();

        let mut buf = Vec::new();
        buf.try_reserve_exact(size)
            .map_err(|_| EngineError::ContextAllocationFailed)?;
        buf.resize(size, 0);
        init(&mut buf);

        *context = Some(buf.into_boxed_slice());
        Ok(())
    }

    /// Release custom context memory, if any.
    pub fn free_custom_context(&self) {
        self.context.lock().take();
    }

    pub fn custom_context(&self) -> Option<MappedMutexGuard<'_, [u8]>> {
        MutexGuard::try_map(self.context.lock(), |context| context.as_deref_mut()).ok()
    }

    pub fn resources(&self) -> MutexGuard<'_, BackendResources> {
        self.resources.lock()
    }

    /// Attach the worker to a render pipeline object.
    pub fn set_pipeline(&self, pipeline: RenderPipeline) {
        if !pipeline.matches(self.backend()) {
            warn!(
                "pipeline {:?} does not match backend {:?}",
                pipeline,
                self.backend()
            );
        }

        self.resources.lock().pipeline = pipeline;
    }

    /// Request the worker thread to end.
    ///
    /// Returns `false` if a stop was already requested.
    pub fn request_stop(&self) -> bool {
        self.cancellation.set()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_set()
    }

    /// Block until cancellation is requested or the timeout elapses.
    pub fn wait_cancelled(&self, timeout: Duration) -> bool {
        self.cancellation.wait_timeout(timeout)
    }

    /// Block until the worker thread has finished or the timeout elapses.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        self.finished.wait_timeout(timeout)
    }

    pub(crate) fn cancellation(&self) -> &Event {
        &self.cancellation
    }

    pub(crate) fn finished(&self) -> &Event {
        &self.finished
    }

    pub(crate) fn attach_worker(&self, handle: JoinHandle<()>) {
        *self.worker.lock() = Some(handle);
    }

    pub(crate) fn take_worker(&self) -> Option<JoinHandle<()>> {
        self.worker.lock().take()
    }

    pub(crate) fn log_sink(&self) -> &LogSink {
        &self.log
    }

    /// Run `f` with this engine's log sink as the thread default.
    pub(crate) fn with_log<R>(&self, f: impl FnOnce() -> R) -> R {
        self.log.scope(f)
    }

    /// Write a host message to the engine log.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.log.write(level, message, &[]);
    }

    /// Write a host message with key value fields to the engine log.
    pub fn log_fields(&self, level: LogLevel, message: &str, fields: &[(&str, &dyn Display)]) {
        self.log.write(level, message, fields);
    }

    pub fn log_debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn log_info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn log_warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn log_error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("host_module", &self.host_module)
            .field("backend", &self.backend())
            .field("cancelled", &self.is_cancelled())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
