//! Engine configuration snapshot.

use core::fmt::{self, Debug, Formatter};
use std::{env, sync::Arc};

use crate::{
    Engine,
    backend::{BackendVariant, BackendWorker},
};

/// Callback invoked once the backend of the host has been hooked.
pub type HookedFn = Arc<dyn Fn(&Arc<Engine>, BackendVariant) + Send + Sync>;

/// Callback invoked with the engine at a lifecycle transition.
pub type EngineFn = Arc<dyn Fn(&Arc<Engine>) + Send + Sync>;

#[cfg(windows)]
pub const DEFAULT_LOG_FILE: &str = "%TEMP%\\Indicium-Supra.log";
#[cfg(not(windows))]
pub const DEFAULT_LOG_FILE: &str = "/tmp/Indicium-Supra.log";

/// Configuration copied into an engine at creation.
///
/// The engine never mutates its snapshot.
#[derive(Clone)]
pub struct EngineConfig {
    /// Procedure detecting the host backend and patching it.
    pub backend: Arc<dyn BackendWorker>,

    /// Invoked once a requested backend has been hooked successfully.
    pub on_hooked: Option<HookedFn>,

    /// Invoked before the backend hooks are removed.
    pub on_pre_unhook: Option<EngineFn>,

    /// Invoked after the backend hooks have been removed.
    pub on_post_unhook: Option<EngineFn>,

    /// Invoked when host process termination has been intercepted.
    pub on_pre_exit: Option<EngineFn>,

    /// Backends the worker is allowed to detect and hook.
    pub hook_targets: HookTargets,

    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn new(backend: impl BackendWorker) -> Self {
        Self {
            backend: Arc::new(backend),
            on_hooked: None,
            on_pre_unhook: None,
            on_post_unhook: None,
            on_pre_exit: None,
            hook_targets: HookTargets::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Debug for EngineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("on_hooked", &self.on_hooked.is_some())
            .field("on_pre_unhook", &self.on_pre_unhook.is_some())
            .field("on_post_unhook", &self.on_post_unhook.is_some())
            .field("on_pre_exit", &self.on_pre_exit.is_some())
            .field("hook_targets", &self.hook_targets)
            .field("logging", &self.logging)
            .finish_non_exhaustive()
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HookTargets: u32 {
        const D3D9 = 0b00000001;
        const D3D10 = 0b00000010;
        const D3D11 = 0b00000100;
        const D3D12 = 0b00001000;
        const CORE_AUDIO = 0b00010000;
    }
}

impl HookTargets {
    /// Check if the render variant may be hooked.
    pub fn allows(self, variant: BackendVariant) -> bool {
        let flag = match variant {
            BackendVariant::Unknown => return false,
            BackendVariant::D3D9 => Self::D3D9,
            BackendVariant::D3D10 => Self::D3D10,
            BackendVariant::D3D11 => Self::D3D11,
            BackendVariant::D3D12 => Self::D3D12,
        };

        self.contains(flag)
    }
}

impl Default for HookTargets {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Promote the engine log sink to the process default.
    pub enabled: bool,

    /// Log file destination. `%NAME%` tokens are expanded from the environment.
    pub file_path: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            file_path: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

/// Expand `%NAME%` environment variable tokens.
///
/// Unknown variables and unterminated tokens are kept verbatim, `%%` becomes `%`.
pub fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let Some(len) = after.find('%') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..len];
        match name {
            "" => out.push('%'),
            name => match env::var(name) {
                Ok(value) => out.push_str(&value),
                Err(_) => {
                    out.push('%');
                    out.push_str(name);
                    out.push('%');
                }
            },
        }

        rest = &after[len + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_variables() {
        // PATH is set for every test process
        let path = env::var("PATH").unwrap();
        assert_eq!(expand_env("%PATH%/log.txt"), format!("{path}/log.txt"));
    }

    #[test]
    fn keeps_unknown_and_unterminated_tokens() {
        assert_eq!(
            expand_env("%INDICIUM_SURELY_UNSET_VAR%\\a.log"),
            "%INDICIUM_SURELY_UNSET_VAR%\\a.log"
        );
        assert_eq!(expand_env("dir/50%.log"), "dir/50%.log");
        assert_eq!(expand_env("100%%"), "100%");
        assert_eq!(expand_env("plain"), "plain");
    }

    #[test]
    fn logging_is_not_promoted_by_default() {
        let logging = LoggingConfig::default();
        assert!(!logging.enabled);
        assert_eq!(logging.file_path, DEFAULT_LOG_FILE);
    }

    #[test]
    fn hook_targets_default_allows_every_variant() {
        let targets = HookTargets::default();
        assert!(targets.allows(BackendVariant::D3D9));
        assert!(targets.allows(BackendVariant::D3D12));
        assert!(targets.contains(HookTargets::CORE_AUDIO));
        assert!(!targets.allows(BackendVariant::Unknown));

        let only_d3d11 = HookTargets::D3D11;
        assert!(only_d3d11.allows(BackendVariant::D3D11));
        assert!(!only_d3d11.allows(BackendVariant::D3D10));
    }
}
