//! Ambient: runtime configuration (§6). Plain data handed in by the host;
//! this crate mandates no on-disk format and does no parsing of its own.

/// Which concrete `Backend` implementation a host has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    #[default]
    Vulkan,
    OpenGl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub backend: BackendKind,
    /// Whether the runtime performs the depth-buffer selection policy's
    /// exhaustive aspect-ratio/size-factor filtering (§4.5/§6), or just
    /// takes the candidate with the most drawcalls outright.
    pub exhaustive_depth_buffer_filtering: bool,
    /// Promotes every warning-class diagnostic (§7) to compile-fatal. Off
    /// by default; intended for tooling that wants to fail a build on any
    /// diagnostic rather than just errors.
    pub strict_warnings: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            exhaustive_depth_buffer_filtering: true,
            strict_warnings: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_vulkan_and_exhaustive_filtering() {
        let config = RuntimeConfig::default();
        assert_eq!(config.backend, BackendKind::Vulkan);
        assert!(config.exhaustive_depth_buffer_filtering);
        assert!(!config.strict_warnings);
    }
}
