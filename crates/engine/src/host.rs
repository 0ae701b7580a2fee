//! Process level capabilities the engine depends on.
//!
//! Everything touching the host process itself goes through [`Host`], so the
//! lifecycle logic can run against a substitute in tests.

#[cfg(windows)]
pub(crate) mod win32;

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use crate::registry::HostModule;

pub trait Host: Send + Sync + 'static {
    /// Resolve the host module and keep it loaded for the rest of the process lifetime.
    fn pin_module(&self, module: HostModule) -> anyhow::Result<()>;

    /// Redirect process termination to the termination guard.
    fn hook_exit(&self) -> anyhow::Result<()>;

    /// Restore the process termination entry point.
    fn unhook_exit(&self) -> anyhow::Result<()>;

    /// Call the real process termination entry point.
    ///
    /// Never returns on a real host.
    fn exit_process(&self, exit_code: u32);

    fn spawn_worker(
        &self,
        builder: thread::Builder,
        f: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>> {
        builder.spawn(f)
    }

    /// Forcibly end a worker thread. Resources held by the worker are lost.
    fn terminate_worker(&self, worker: &JoinHandle<()>);
}

impl<H: Host> Host for Arc<H> {
    fn pin_module(&self, module: HostModule) -> anyhow::Result<()> {
        (**self).pin_module(module)
    }

    fn hook_exit(&self) -> anyhow::Result<()> {
        (**self).hook_exit()
    }

    fn unhook_exit(&self) -> anyhow::Result<()> {
        (**self).unhook_exit()
    }

    fn exit_process(&self, exit_code: u32) {
        (**self).exit_process(exit_code)
    }

    fn spawn_worker(
        &self,
        builder: thread::Builder,
        f: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>> {
        (**self).spawn_worker(builder, f)
    }

    fn terminate_worker(&self, worker: &JoinHandle<()>) {
        (**self).terminate_worker(worker)
    }
}
