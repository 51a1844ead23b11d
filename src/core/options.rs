//! Run configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::loader::DEFAULT_LOAD_TIMEOUT;
use crate::core::scanner::ScanOptions;
use crate::utils::error::{DvizError, DvizResult};

/// Content region selector used when nothing else is configured
pub const DEFAULT_CONTENT_SELECTOR: &str = ".dviz-content";

/// Code node selector used when nothing else is configured
pub const DEFAULT_CODE_SELECTOR: &str = "*:not(pre) > code";

/// What happens when a render function fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop at the first failure and return it; earlier renders stay
    #[default]
    AbortBatch,
    /// Record the failure, restore that annotation and keep going
    Isolate,
}

/// Options for a dviz run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunOptions {
    /// Selector for the content region
    /// Default: `.dviz-content`
    pub content_selector: String,

    /// Selector for candidate code nodes
    /// Default: `*:not(pre) > code`
    pub code_selector: String,

    /// Load barrier bound in seconds; `None` waits forever
    /// Default: 30
    pub load_timeout_secs: Option<u64>,

    /// Default: abort the batch
    pub failure_policy: FailurePolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            content_selector: DEFAULT_CONTENT_SELECTOR.to_string(),
            code_selector: DEFAULT_CODE_SELECTOR.to_string(),
            load_timeout_secs: Some(DEFAULT_LOAD_TIMEOUT.as_secs()),
            failure_policy: FailurePolicy::AbortBatch,
        }
    }
}

impl RunOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort on the first render failure (the default)
    pub fn strict() -> Self {
        Self {
            failure_policy: FailurePolicy::AbortBatch,
            ..Self::default()
        }
    }

    /// Keep rendering past failures and report them at the end
    pub fn lenient() -> Self {
        Self {
            failure_policy: FailurePolicy::Isolate,
            ..Self::default()
        }
    }

    /// Read options from TOML; missing keys keep their defaults
    pub fn from_toml_str(input: &str) -> DvizResult<Self> {
        Ok(toml::from_str(input)?)
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_secs.map(Duration::from_secs)
    }

    /// Compile the selectors
    pub fn scan_options(&self) -> DvizResult<ScanOptions> {
        ScanOptions::new(&self.content_selector, &self.code_selector).map_err(DvizError::from)
    }
}
