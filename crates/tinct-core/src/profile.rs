//! The narrow profile contract the pixel core depends on.
//!
//! ICC parsing lives elsewhere; images only need to know how many color
//! channels a profile describes and a stable name for cache identity.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub trait Profile: fmt::Debug + Send + Sync {
    /// Number of color channels, excluding alpha.
    fn channel_count(&self) -> usize;

    /// Stable name used in image identity strings.
    fn name(&self) -> String;
}

/// Shared profile handle held by images.
pub type ProfileHandle = Arc<dyn Profile>;

/// A profile described by name and channel count only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleProfile {
    pub name: String,
    pub channels: usize,
}

impl SimpleProfile {
    pub fn new(name: impl Into<String>, channels: usize) -> Self {
        Self {
            name: name.into(),
            channels,
        }
    }

    pub fn gray() -> Self {
        Self::new("Gray", 1)
    }

    pub fn rgb() -> Self {
        Self::new("RGB", 3)
    }

    pub fn cmyk() -> Self {
        Self::new("CMYK", 4)
    }

    pub fn into_handle(self) -> ProfileHandle {
        Arc::new(self)
    }
}

impl Profile for SimpleProfile {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
