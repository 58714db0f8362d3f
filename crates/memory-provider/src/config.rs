//! Provider handle configuration

/// Configuration for a provider handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Name recorded in the registry and in log events instead of the
    /// backend-reported name
    pub label: Option<String>,

    /// Keep per-handle dispatch statistics
    pub track_stats: bool,

    /// Emit a log event for every failed dispatch
    pub log_failures: bool,

    /// Reject misaligned purge ranges before they reach the backend
    ///
    /// On in every preset. With it off, a misaligned purge reports whatever
    /// the backend reports, which need not be `InvalidAlignment`.
    pub validate_purge_alignment: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            label: None,
            track_stats: cfg!(debug_assertions),
            log_failures: true,
            validate_purge_alignment: true,
        }
    }
}

impl ProviderConfig {
    /// Production configuration - failures logged, no statistics
    #[must_use]
    pub fn production() -> Self {
        Self {
            label: None,
            track_stats: false,
            log_failures: true,
            validate_purge_alignment: true,
        }
    }

    /// Debug configuration - everything on
    #[must_use]
    pub fn debug() -> Self {
        Self {
            label: None,
            track_stats: true,
            log_failures: true,
            validate_purge_alignment: true,
        }
    }

    /// Performance configuration - minimal dispatch overhead
    ///
    /// Drops statistics and failure logging. The purge alignment check stays.
    #[must_use]
    pub fn performance() -> Self {
        Self {
            label: None,
            track_stats: false,
            log_failures: false,
            validate_purge_alignment: true,
        }
    }

    /// Set the label
    #[must_use = "builder methods must be chained or built"]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Enable or disable the dispatch-side purge alignment check
    #[must_use = "builder methods must be chained or built"]
    pub fn with_purge_alignment_check(mut self, enabled: bool) -> Self {
        self.validate_purge_alignment = enabled;
        self
    }

    /// Enable or disable statistics
    #[must_use = "builder methods must be chained or built"]
    pub fn with_stats(mut self, track_stats: bool) -> Self {
        self.track_stats = track_stats;
        self
    }
}
