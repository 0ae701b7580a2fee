//! Per backend event callback tables.
//!
//! Every table is a set of optional callback slots. Backend workers raise
//! events through [`invoke_event!`](crate::invoke_event), which calls the slot
//! if it is filled and does nothing otherwise.

use core::{
    ffi::c_void,
    fmt::{self, Debug, Formatter},
};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::MappedMutexGuard;

use crate::{
    Engine,
    backend::{BackendVariant, RawInterface},
};

/// Extra data passed to every event callback.
pub struct EventExtension<'a> {
    engine: &'a Arc<Engine>,
}

impl<'a> EventExtension<'a> {
    pub(crate) fn new(engine: &'a Arc<Engine>) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn engine(&self) -> &'a Arc<Engine> {
        self.engine
    }

    /// Custom context of the engine, if any.
    #[inline]
    pub fn context(&self) -> Option<MappedMutexGuard<'a, [u8]>> {
        self.engine.custom_context()
    }
}

/// A table of event callbacks owned by one backend variant.
pub trait EventTable: Default + Send + Sync + 'static {
    /// Render variant which must be detected for the table to be consulted.
    ///
    /// `None` if the table is independent of the render backend.
    const VARIANT: Option<BackendVariant>;

    #[doc(hidden)]
    fn slot(tables: &EventTables) -> &ArcSwap<Self>;
}

macro_rules! callback_table {
    (
        $(#[$meta:meta])*
        $name:ident($field:ident, $variant:expr) {
            $(
                $slot:ident($($ty:ty),* $(,)?);
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Default)]
        pub struct $name {
            $(
                pub $slot: Option<Arc<dyn Fn($($ty,)* &EventExtension<'_>) + Send + Sync>>,
            )*
        }

        impl EventTable for $name {
            const VARIANT: Option<BackendVariant> = $variant;

            #[inline]
            fn slot(tables: &EventTables) -> &ArcSwap<Self> {
                &tables.$field
            }
        }

        impl From<$name> for EventCallbacks {
            fn from(table: $name) -> Self {
                EventCallbacks::$name(table)
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    $(.field(stringify!($slot), &self.$slot.is_some()))*
                    .finish()
            }
        }
    };
}

callback_table! {
    /// Direct3D 9(Ex) render pipeline callbacks.
    ///
    /// Present arguments are the device, source rect, dest rect,
    /// dest window override and dirty region.
    D3D9Callbacks(d3d9, Some(BackendVariant::D3D9)) {
        pre_present(RawInterface, *const c_void, *const c_void, *mut c_void, *const c_void);
        post_present(RawInterface, *const c_void, *const c_void, *mut c_void, *const c_void);
        pre_reset(RawInterface, *mut c_void);
        post_reset(RawInterface, *mut c_void);
        pre_end_scene(RawInterface);
        post_end_scene(RawInterface);
        pre_present_ex(RawInterface, *const c_void, *const c_void, *mut c_void, *const c_void, u32);
        post_present_ex(RawInterface, *const c_void, *const c_void, *mut c_void, *const c_void, u32);
        pre_reset_ex(RawInterface, *mut c_void, *mut c_void);
        post_reset_ex(RawInterface, *mut c_void, *mut c_void);
    }
}

callback_table! {
    /// Direct3D 10 swap chain callbacks.
    D3D10Callbacks(d3d10, Some(BackendVariant::D3D10)) {
        pre_present(RawInterface, u32, u32);
        post_present(RawInterface, u32, u32);
        pre_resize_target(RawInterface, *const c_void);
        post_resize_target(RawInterface, *const c_void);
        pre_resize_buffers(RawInterface, u32, u32, u32, u32, u32);
        post_resize_buffers(RawInterface, u32, u32, u32, u32, u32);
    }
}

callback_table! {
    /// Direct3D 11 swap chain callbacks.
    ///
    /// Present arguments are the swap chain, sync interval and flags.
    /// Resize buffers arguments are the swap chain, buffer count, width,
    /// height, format and swap chain flags.
    D3D11Callbacks(d3d11, Some(BackendVariant::D3D11)) {
        pre_present(RawInterface, u32, u32);
        post_present(RawInterface, u32, u32);
        pre_resize_target(RawInterface, *const c_void);
        post_resize_target(RawInterface, *const c_void);
        pre_resize_buffers(RawInterface, u32, u32, u32, u32, u32);
        post_resize_buffers(RawInterface, u32, u32, u32, u32, u32);
    }
}

callback_table! {
    /// Direct3D 12 swap chain callbacks.
    D3D12Callbacks(d3d12, Some(BackendVariant::D3D12)) {
        pre_present(RawInterface, u32, u32);
        post_present(RawInterface, u32, u32);
        pre_resize_target(RawInterface, *const c_void);
        post_resize_target(RawInterface, *const c_void);
        pre_resize_buffers(RawInterface, u32, u32, u32, u32, u32);
        post_resize_buffers(RawInterface, u32, u32, u32, u32, u32);
    }
}

callback_table! {
    /// Core Audio render client callbacks.
    ///
    /// Audio hooks are installed alongside any render backend,
    /// so this table is consulted regardless of the detected variant.
    CoreAudioCallbacks(core_audio, None) {
        pre_get_buffer(RawInterface, u32, *mut *mut u8);
        post_get_buffer(RawInterface, u32, *mut *mut u8);
        pre_release_buffer(RawInterface, u32, u32);
        post_release_buffer(RawInterface, u32, u32);
    }
}

/// A full callback table for one backend variant.
#[derive(Debug, Clone)]
#[allow(clippy::enum_variant_names)]
pub enum EventCallbacks {
    D3D9Callbacks(D3D9Callbacks),
    D3D10Callbacks(D3D10Callbacks),
    D3D11Callbacks(D3D11Callbacks),
    D3D12Callbacks(D3D12Callbacks),
    CoreAudioCallbacks(CoreAudioCallbacks),
}

/// Callback tables of one engine, one per backend variant.
#[derive(Default)]
pub struct EventTables {
    d3d9: ArcSwap<D3D9Callbacks>,
    d3d10: ArcSwap<D3D10Callbacks>,
    d3d11: ArcSwap<D3D11Callbacks>,
    d3d12: ArcSwap<D3D12Callbacks>,
    core_audio: ArcSwap<CoreAudioCallbacks>,
}

impl EventTables {
    /// Replace a whole table at once.
    pub(crate) fn store(&self, callbacks: EventCallbacks) {
        match callbacks {
            EventCallbacks::D3D9Callbacks(table) => self.d3d9.store(Arc::new(table)),
            EventCallbacks::D3D10Callbacks(table) => self.d3d10.store(Arc::new(table)),
            EventCallbacks::D3D11Callbacks(table) => self.d3d11.store(Arc::new(table)),
            EventCallbacks::D3D12Callbacks(table) => self.d3d12.store(Arc::new(table)),
            EventCallbacks::CoreAudioCallbacks(table) => self.core_audio.store(Arc::new(table)),
        }
    }

    #[inline]
    pub(crate) fn load<T: EventTable>(&self) -> Arc<T> {
        T::slot(self).load_full()
    }
}

impl Debug for EventTables {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventTables")
            .field("d3d9", &**self.d3d9.load())
            .field("d3d10", &**self.d3d10.load())
            .field("d3d11", &**self.d3d11.load())
            .field("d3d12", &**self.d3d12.load())
            .field("core_audio", &**self.core_audio.load())
            .finish()
    }
}

/// Invoke an event callback of an engine if the slot is filled.
///
/// ```ignore
/// invoke_event!(engine, D3D11Callbacks::pre_present(swap_chain, sync_interval, flags));
/// ```
#[macro_export]
macro_rules! invoke_event {
    ($engine:expr, $table:ident :: $slot:ident ( $($arg:expr),* $(,)? )) => {
        $crate::Engine::dispatch($engine, |table: &$table, extension| {
            if let Some(callback) = table.$slot.as_deref() {
                callback($($arg,)* extension);
            }
        })
    };
}
