//! `PropertySet` for pass communication.
//!
//! Passes share data through a [`PropertySet`]: the [`CompileConfig`] they
//! read their tunables from, the most recent [`Schedule`], and any number of
//! typed custom entries such as the per-pass reports.
//!
//! # Examples
//!
//! ```
//! use qoc_compile::{CompileConfig, PropertySet};
//!
//! let props = PropertySet::new().with_config(CompileConfig::default().with_block_width(3));
//! assert_eq!(props.config.block_width, Some(3));
//! assert!(props.schedule.is_none());
//! ```
//!
//! ## Custom properties for pass communication
//!
//! ```
//! use qoc_compile::PropertySet;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct FusionStats {
//!     groups: usize,
//! }
//!
//! let mut props = PropertySet::new();
//! props.insert(FusionStats { groups: 4 });
//!
//! let stats = props.get::<FusionStats>().unwrap();
//! assert_eq!(stats.groups, 4);
//! ```

use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};

use crate::config::CompileConfig;
use crate::error::{CompileError, CompileResult};
use crate::passes::Schedule;

/// Shared state threaded through all passes of one compilation.
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Pipeline tunables.
    pub config: CompileConfig,

    /// Schedule produced by the last scheduler run.
    ///
    /// Cleared by passes that restructure the DAG.
    pub schedule: Option<Schedule>,

    /// Custom properties storage (type-erased).
    custom: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PropertySet {
    /// Create a new property set with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CompileConfig) -> Self {
        self.config = config;
        self
    }

    /// The current schedule, or [`CompileError::Unscheduled`].
    pub fn require_schedule(&self) -> CompileResult<&Schedule> {
        self.schedule.as_ref().ok_or(CompileError::Unscheduled)
    }

    /// Insert a custom property.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a custom property.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a mutable custom property.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove a custom property.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_set_defaults() {
        let props = PropertySet::new();
        assert_eq!(props.config, CompileConfig::default());
        assert!(matches!(
            props.require_schedule(),
            Err(CompileError::Unscheduled)
        ));
    }

    #[test]
    #[allow(clippy::items_after_statements)]
    fn test_property_set_custom() {
        let mut props = PropertySet::new();

        #[derive(Debug, PartialEq)]
        struct CustomData(i32);

        props.insert(CustomData(42));
        assert_eq!(props.get::<CustomData>(), Some(&CustomData(42)));

        if let Some(data) = props.get_mut::<CustomData>() {
            data.0 += 1;
        }
        let removed = props.remove::<CustomData>();
        assert_eq!(removed, Some(CustomData(43)));
        assert_eq!(props.get::<CustomData>(), None);
    }
}
