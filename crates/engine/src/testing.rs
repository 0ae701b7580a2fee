//! Test doubles for the host and backend worker.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use anyhow::bail;
use parking_lot::Mutex;

use crate::{
    Engine,
    backend::{BackendVariant, BackendWorker},
    config::EngineConfig,
    event::Event,
    host::Host,
    log::LogSink,
    registry::HostModule,
};

pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

pub(crate) struct TestBackend {
    variant: BackendVariant,
    fail: bool,
    unhook_gate: Option<Arc<Event>>,
    journal: Journal,
}

impl TestBackend {
    pub fn new(variant: BackendVariant) -> Self {
        Self {
            variant,
            fail: false,
            unhook_gate: None,
            journal: Journal::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(BackendVariant::Unknown)
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Block unhooking until `gate` is set.
    pub fn blocking_unhook(mut self, gate: Arc<Event>) -> Self {
        self.unhook_gate = Some(gate);
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl BackendWorker for TestBackend {
    fn hook(&self, _: &Arc<Engine>) -> anyhow::Result<BackendVariant> {
        self.journal.lock().push("hook".to_string());
        if self.fail {
            bail!("no render backend present");
        }

        Ok(self.variant)
    }

    fn unhook(&self, _: &Arc<Engine>) {
        if let Some(gate) = &self.unhook_gate {
            gate.wait();
        }

        self.journal.lock().push("unhook".to_string());
    }
}

/// Configuration writing no log file.
pub(crate) fn test_config(backend: TestBackend) -> EngineConfig {
    let mut config = EngineConfig::new(backend);
    config.logging.enabled = false;
    config.logging.file_path = String::new();

    config
}

/// Engine which is not registered and has no worker.
pub(crate) fn test_engine(backend: TestBackend) -> Arc<Engine> {
    Arc::new(Engine::new(
        HostModule::new(0x1000),
        test_config(backend),
        LogSink::disabled(),
    ))
}

#[derive(Default)]
pub(crate) struct FakeHost {
    pub fail_pin: AtomicBool,
    pub fail_spawn: AtomicBool,

    pub pinned: Mutex<Vec<HostModule>>,
    pub exit_hooks: AtomicUsize,
    pub exit_unhooks: AtomicUsize,
    pub exits: Mutex<Vec<u32>>,
    pub terminated: AtomicUsize,

    pub journal: Journal,
}

impl Host for FakeHost {
    fn pin_module(&self, module: HostModule) -> anyhow::Result<()> {
        if self.fail_pin.load(Ordering::SeqCst) {
            bail!("module {module} is not loaded");
        }

        self.pinned.lock().push(module);
        Ok(())
    }

    fn hook_exit(&self) -> anyhow::Result<()> {
        self.exit_hooks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unhook_exit(&self) -> anyhow::Result<()> {
        self.exit_unhooks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exit_process(&self, exit_code: u32) {
        self.journal.lock().push(format!("exit({exit_code})"));
        self.exits.lock().push(exit_code);
    }

    fn spawn_worker(
        &self,
        builder: thread::Builder,
        f: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>> {
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(io::Error::other("thread limit reached"));
        }

        builder.spawn(f)
    }

    fn terminate_worker(&self, _: &JoinHandle<()>) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push("terminate".to_string());
    }
}
