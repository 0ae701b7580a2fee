//! Function detouring primitive for Windows.
//!
//! This crate is intended to be used only as `indicium`'s internal dependency.
//! It provides a typed abstraction over `retour` raw detours, where one attach
//! or detach call patches exactly one function pointer.
#![cfg(windows)]

use core::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    mem,
};

use retour::RawDetour;
use tracing::debug;

/// A detour function hook.
///
/// While the hook is alive every call to the target function is redirected
/// to the replacement. [`DetourHook::original_fn`] returns a trampoline which
/// still reaches the unpatched target.
pub struct DetourHook<F> {
    detour: RawDetour,
    original: F,
}

impl<F: Copy> DetourHook<F> {
    /// Attach a hook to the target function.
    ///
    /// # Safety
    /// func and detour should be valid function pointers with same signature.
    #[tracing::instrument]
    pub unsafe fn attach(func: F, detour: F) -> DetourResult<Self>
    where
        F: Debug,
    {
        debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<*const ()>());

        let raw = unsafe {
            let raw = RawDetour::new(
                mem::transmute_copy::<F, *const ()>(&func),
                mem::transmute_copy::<F, *const ()>(&detour),
            )
            .map_err(DetourError)?;
            raw.enable().map_err(DetourError)?;
            raw
        };
        let trampoline: *const () = raw.trampoline();
        let original = unsafe { mem::transmute_copy::<*const (), F>(&trampoline) };
        debug!("hook attached");

        Ok(DetourHook {
            detour: raw,
            original,
        })
    }

    /// Get the original function pointer.
    ///
    /// Only valid while this hook is alive.
    #[inline(always)]
    pub fn original_fn(&self) -> F {
        self.original
    }

    /// Detach the hook and restore the target function.
    #[tracing::instrument(skip(self))]
    pub fn detach(self) -> DetourResult<()> {
        unsafe { self.detour.disable() }.map_err(DetourError)?;
        debug!("hook detached");

        Ok(())
    }
}

impl<F> Debug for DetourHook<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetourHook")
            .field("enabled", &self.detour.is_enabled())
            .finish_non_exhaustive()
    }
}

pub type DetourResult<T> = Result<T, DetourError>;

/// Detour error.
#[derive(Debug)]
pub struct DetourError(retour::Error);

impl Display for DetourError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Detour call error: {}", self.0)
    }
}

impl Error for DetourError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}
