//! Process termination guard.
//!
//! While at least one engine is registered, process termination is redirected
//! here. Every engine gets a chance to shut its worker down before the real
//! termination proceeds.

use core::time::Duration;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    Engine,
    registry::{EngineRegistry, RegistryState},
};

/// Time a worker thread is given to finish after cancellation.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(3000);

/// Action taken on a worker which outlives the grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutAction {
    /// Leave the worker running. Useful while a debugger holds the thread.
    Leave,

    /// Forcibly end the worker thread.
    Terminate,
}

impl Default for TimeoutAction {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Leave
        } else {
            Self::Terminate
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    pub grace_period: Duration,
    pub on_timeout: TimeoutAction,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            on_timeout: TimeoutAction::default(),
        }
    }
}

impl EngineRegistry {
    /// Shut down every registered engine, then terminate the process with `exit_code`.
    #[tracing::instrument(skip(self))]
    pub fn on_process_exit(&self, exit_code: u32) {
        let engines = self.snapshot();
        info!(
            target: "indicium::process",
            "host process is terminating, shutting down {} engine(s)",
            engines.len()
        );

        for engine in engines {
            engine.with_log(|| self.shutdown_engine(&engine));
        }

        self.host.exit_process(exit_code);
    }

    fn shutdown_engine(&self, engine: &Arc<Engine>) {
        info!(target: "indicium::process", "performing pre-exit clean-up tasks");
        if let Some(on_pre_exit) = &engine.config().on_pre_exit {
            on_pre_exit(engine);
        }

        if !engine.request_stop() {
            debug!(target: "indicium::process", "cancellation was already requested");
        }

        let Some(worker) = engine.take_worker() else {
            warn!(target: "indicium::process", "worker thread already released");
            return;
        };

        if engine.wait_stopped(self.policy.grace_period) {
            match worker.join() {
                Ok(()) => info!(target: "indicium::process", "thread shutdown complete"),
                Err(_) => error!(
                    target: "indicium::process",
                    "worker thread panicked, host process might crash during exit"
                ),
            }

            return;
        }

        match self.policy.on_timeout {
            TimeoutAction::Terminate => {
                error!(
                    target: "indicium::process",
                    "thread hasn't finished clean-up within expected time, terminating"
                );
                self.host.terminate_worker(&worker);
            }

            TimeoutAction::Leave => engine.attach_worker(worker),
        }
    }

    pub(crate) fn arm_guard(&self, state: &mut RegistryState) {
        if state.exit_hooked {
            return;
        }

        match self.host.hook_exit() {
            Ok(()) => {
                state.exit_hooked = true;
                debug!(target: "indicium::api", "process termination intercepted");
            }

            Err(err) => error!(
                target: "indicium::api",
                "cannot intercept process termination. err: {err:?}"
            ),
        }
    }

    pub(crate) fn disarm_guard(&self, state: &mut RegistryState) {
        if !state.exit_hooked {
            return;
        }

        match self.host.unhook_exit() {
            Ok(()) => {
                state.exit_hooked = false;
                debug!(target: "indicium::api", "process termination restored");
            }

            Err(err) => error!(
                target: "indicium::api",
                "cannot restore process termination. err: {err:?}"
            ),
        }
    }
}
