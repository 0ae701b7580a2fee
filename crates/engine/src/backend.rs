//! Backend variants, live backend handles and the worker procedure contract.

use core::{ffi::c_void, ptr::NonNull};
use std::sync::Arc;

use crate::Engine;

/// Rendering API family used by the host.
///
/// Values match the flags reported to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum BackendVariant {
    #[default]
    Unknown = 0,
    D3D9 = 1 << 0,
    D3D10 = 1 << 1,
    D3D11 = 1 << 2,
    D3D12 = 1 << 3,
}

/// Raw interface pointer owned by the host.
///
/// The engine never adds or releases references through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct RawInterface(NonNull<c_void>);

// Interface pointers are only dereferenced by the backend that produced them
unsafe impl Send for RawInterface {}
unsafe impl Sync for RawInterface {}

impl RawInterface {
    #[inline]
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    #[inline]
    pub const fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Render pipeline object the backend worker is currently attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPipeline {
    #[default]
    None,

    /// DXGI swap chain of a Direct3D 10, 11 or 12 host.
    SwapChain(RawInterface),

    D3D9Device(RawInterface),

    D3D9ExDevice(RawInterface),
}

impl RenderPipeline {
    /// Check if this pipeline object can belong to the variant.
    pub fn matches(&self, variant: BackendVariant) -> bool {
        match self {
            Self::None => true,
            Self::SwapChain(_) => matches!(
                variant,
                BackendVariant::D3D10 | BackendVariant::D3D11 | BackendVariant::D3D12
            ),
            Self::D3D9Device(_) | Self::D3D9ExDevice(_) => variant == BackendVariant::D3D9,
        }
    }
}

/// Live backend handles, used by the backend worker only.
#[derive(Debug, Default)]
pub struct BackendResources {
    pub pipeline: RenderPipeline,

    /// Core Audio render client.
    pub audio_client: Option<RawInterface>,
}

/// Procedure which detects the backend of the host and patches it.
///
/// Both methods run on the engine worker thread.
pub trait BackendWorker: Send + Sync + 'static {
    /// Detect the backend used by the host and install its hooks.
    ///
    /// Returns [`BackendVariant::Unknown`] if no render backend was hooked.
    fn hook(&self, engine: &Arc<Engine>) -> anyhow::Result<BackendVariant>;

    /// Remove every hook installed by [`BackendWorker::hook`].
    fn unhook(&self, engine: &Arc<Engine>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_interface_rejects_null() {
        assert!(RawInterface::new(core::ptr::null_mut()).is_none());

        let mut value = 0_u32;
        let raw = RawInterface::new((&raw mut value).cast()).unwrap();
        assert_eq!(raw.as_ptr(), (&raw mut value).cast());
    }

    #[test]
    fn pipeline_matches_variant() {
        let mut value = 0_u32;
        let raw = RawInterface::new((&raw mut value).cast()).unwrap();

        assert!(RenderPipeline::SwapChain(raw).matches(BackendVariant::D3D11));
        assert!(!RenderPipeline::SwapChain(raw).matches(BackendVariant::D3D9));
        assert!(RenderPipeline::D3D9ExDevice(raw).matches(BackendVariant::D3D9));
        assert!(RenderPipeline::None.matches(BackendVariant::D3D12));
    }
}
