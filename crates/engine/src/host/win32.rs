use core::mem;
use std::{os::windows::io::AsRawHandle, thread::JoinHandle};

use anyhow::Context;
use indicium_hook::DetourHook;
use parking_lot::Mutex;
use tracing::{debug, error};
use windows::{
    Win32::{
        Foundation::{HANDLE, HMODULE},
        System::{
            LibraryLoader::{
                GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS, GetModuleHandleA, GetModuleHandleExW,
                GetProcAddress,
            },
            Threading::TerminateThread,
        },
    },
    core::{PCWSTR, s},
};

use crate::{
    host::Host,
    registry::{EngineRegistry, HostModule},
};

type ExitProcessFn = unsafe extern "system" fn(u32);

/// Host backed by the current Windows process.
///
/// The exit guard always reports to [`EngineRegistry::global`].
pub(crate) struct Win32Host {
    exit_hook: Mutex<Option<DetourHook<ExitProcessFn>>>,
}

impl Win32Host {
    pub fn new() -> Self {
        Self {
            exit_hook: Mutex::new(None),
        }
    }
}

#[tracing::instrument]
extern "system" fn hooked_exit_process(exit_code: u32) {
    EngineRegistry::global().on_process_exit(exit_code);
}

/// Get pointer to kernel32!ExitProcess
fn get_exit_process_addr() -> anyhow::Result<ExitProcessFn> {
    let kernel32 = unsafe { GetModuleHandleA(s!("kernel32.dll"))? };
    let addr = unsafe { GetProcAddress(kernel32, s!("ExitProcess")) }
        .context("ExitProcess not found")?;
    debug!("ExitProcess found: {:p}", addr);

    Ok(unsafe { mem::transmute::<unsafe extern "system" fn() -> isize, ExitProcessFn>(addr) })
}

impl Host for Win32Host {
    fn pin_module(&self, module: HostModule) -> anyhow::Result<()> {
        let mut hmodule = HMODULE::default();
        unsafe {
            GetModuleHandleExW(
                GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
                PCWSTR(module.addr() as *const u16),
                &mut hmodule,
            )
        }
        .with_context(|| format!("cannot resolve module {module}"))?;

        Ok(())
    }

    fn hook_exit(&self) -> anyhow::Result<()> {
        let mut hook = self.exit_hook.lock();
        if hook.is_some() {
            return Ok(());
        }

        let exit_process = get_exit_process_addr()?;
        debug!("hooking ExitProcess");
        *hook = Some(unsafe {
            DetourHook::attach(exit_process, hooked_exit_process as ExitProcessFn)?
        });

        Ok(())
    }

    fn unhook_exit(&self) -> anyhow::Result<()> {
        if let Some(hook) = self.exit_hook.lock().take() {
            debug!("unhooking ExitProcess");
            hook.detach()?;
        }

        Ok(())
    }

    fn exit_process(&self, exit_code: u32) {
        let hooked = self.exit_hook.lock().as_ref().map(DetourHook::original_fn);
        let exit_process = match hooked {
            Some(original) => original,
            None => match get_exit_process_addr() {
                Ok(exit_process) => exit_process,
                Err(err) => {
                    error!("cannot locate ExitProcess. err: {err:?}");
                    std::process::exit(exit_code as i32)
                }
            },
        };

        unsafe { exit_process(exit_code) }
    }

    fn terminate_worker(&self, worker: &JoinHandle<()>) {
        let handle = HANDLE(worker.as_raw_handle());
        if let Err(err) = unsafe { TerminateThread(handle, 0) } {
            error!("TerminateThread failed. err: {err:?}");
        }
    }
}
