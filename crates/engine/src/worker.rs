//! Engine worker thread.

use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use scopeguard::defer;
use tracing::{debug, error, info, warn};

use crate::{Engine, backend::BackendVariant, host::Host};

pub(crate) fn spawn(host: &dyn Host, engine: &Arc<Engine>) -> io::Result<JoinHandle<()>> {
    let builder = thread::Builder::new().name(format!("indicium-{}", engine.host_module()));
    let engine = engine.clone();

    host.spawn_worker(builder, Box::new(move || run(&engine)))
}

fn run(engine: &Arc<Engine>) {
    defer!({
        engine.finished().set();
    });
    let _log = tracing::dispatcher::set_default(engine.log_sink().dispatch());
    debug!(target: "indicium::worker", "worker thread started");

    let backend = engine.config().backend.clone();
    let hooked = match backend.hook(engine) {
        Ok(BackendVariant::Unknown) => {
            warn!(target: "indicium::worker", "no supported render backend detected");
            true
        }

        Ok(variant) => {
            if !engine.config().hook_targets.allows(variant) {
                warn!(target: "indicium::worker", "{:?} hooked but not requested", variant);
            }

            if engine.set_backend(variant) {
                info!(target: "indicium::worker", "{:?} backend hooked", variant);
                if let Some(on_hooked) = &engine.config().on_hooked {
                    on_hooked(engine, variant);
                }
            }

            true
        }

        Err(err) => {
            error!(target: "indicium::worker", "hooking backend failed. err: {err:?}");
            false
        }
    };

    engine.cancellation().wait();
    debug!(target: "indicium::worker", "cancellation requested");

    if !hooked {
        return;
    }

    if let Some(on_pre_unhook) = &engine.config().on_pre_unhook {
        on_pre_unhook(engine);
    }

    backend.unhook(engine);
    info!(target: "indicium::worker", "backend unhooked");

    if let Some(on_post_unhook) = &engine.config().on_post_unhook {
        on_post_unhook(engine);
    }
}
