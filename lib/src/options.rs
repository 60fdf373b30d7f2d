//! Shared option types that replace boolean flag parameters in the Rust API.

use crate::format::Format;

/// Controls whether a URI that was already loaded is fetched again.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum RefreshStrategy {
    /// Always refetch, bypassing both the load log and the web cache.
    Force,
    /// Skip URIs that were loaded before and serve from the web cache when possible.
    #[default]
    UseCache,
}

impl RefreshStrategy {
    pub fn is_force(self) -> bool {
        matches!(self, RefreshStrategy::Force)
    }
}

impl From<bool> for RefreshStrategy {
    fn from(value: bool) -> Self {
        if value {
            RefreshStrategy::Force
        } else {
            RefreshStrategy::UseCache
        }
    }
}

/// What a batch load does when one of its URIs fails.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum OnError {
    /// Stop and return the error.
    #[default]
    Propagate,
    /// Log the failure and continue with the remaining URIs.
    Skip,
}

impl From<bool> for OnError {
    fn from(allow_error: bool) -> Self {
        if allow_error {
            OnError::Skip
        } else {
            OnError::Propagate
        }
    }
}

/// Whether property lookups on a resource also consult its `owl:sameAs` aliases.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum AliasLookup {
    #[default]
    Include,
    Direct,
}

/// Options for [`Graph::load`](crate::graph::Graph::load).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub on_error: OnError,
    pub refresh: RefreshStrategy,
    pub format: Option<Format>,
}

impl LoadOptions {
    pub fn allow_error(mut self) -> Self {
        self.on_error = OnError::Skip;
        self
    }

    pub fn reload(mut self) -> Self {
        self.refresh = RefreshStrategy::Force;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }
}
