//! Promotion of an engine log sink to the process default.
//!
//! Promotion cannot be undone for the rest of the process, so this scenario
//! lives in its own test binary.

use std::{
    fs, io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use indicium::{
    BackendVariant, BackendWorker, Engine, EngineConfig, EngineError, EngineRegistry, Host,
    HostModule,
};

struct NoopHost;

impl Host for NoopHost {
    fn pin_module(&self, _: HostModule) -> anyhow::Result<()> {
        Ok(())
    }

    fn hook_exit(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn unhook_exit(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn exit_process(&self, _: u32) {}

    fn spawn_worker(
        &self,
        builder: thread::Builder,
        f: Box<dyn FnOnce() + Send + 'static>,
    ) -> io::Result<JoinHandle<()>> {
        builder.spawn(f)
    }

    fn terminate_worker(&self, _: &JoinHandle<()>) {}
}

struct D3D11Backend;

impl BackendWorker for D3D11Backend {
    fn hook(&self, _: &Arc<Engine>) -> anyhow::Result<BackendVariant> {
        Ok(BackendVariant::D3D11)
    }

    fn unhook(&self, _: &Arc<Engine>) {}
}

#[test]
fn promoted_sink_receives_process_logs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Indicium-Supra.log");

    let registry = EngineRegistry::new(NoopHost);
    let module = HostModule::new(0x18000);

    let mut config = EngineConfig::new(D3D11Backend);
    config.logging.enabled = true;
    config.logging.file_path = path.to_string_lossy().into_owned();

    let engine = registry.create(module, config).unwrap();
    assert_eq!(registry.len(), 1);
    engine.log_info("host says hello");
    tracing::info!("logged outside any engine");

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("worker thread created successfully"));
    assert!(content.contains("host says hello"));
    assert!(content.contains("logged outside any engine"));

    engine.request_stop();
    assert!(engine.wait_stopped(Duration::from_secs(10)));
    registry.destroy(module).unwrap();
    assert_eq!(registry.len(), 0);
    assert!(matches!(
        registry.destroy(module),
        Err(EngineError::InvalidHandle)
    ));
}
