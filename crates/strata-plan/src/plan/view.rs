//! Views.

use std::collections::BTreeMap;

use strata_core::{SessionConfig, StructField};
use tracing::debug;

use crate::error::{PlanError, PlanResult};

/// Catalog description of a stored view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogTable {
    /// Name parts of the view.
    pub identifier: Vec<String>,
    /// SQL text the view was created from.
    pub view_text: Option<String>,
    /// Session configuration captured when the view was created.
    pub view_sql_configs: BTreeMap<String, String>,
    /// Declared schema.
    pub schema: Vec<StructField>,
}

impl CatalogTable {
    /// A view description with no captured configuration.
    #[must_use]
    pub fn new(identifier: Vec<String>) -> Self {
        Self { identifier, ..Self::default() }
    }

    /// Adds a captured configuration entry.
    #[must_use]
    pub fn with_sql_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.view_sql_configs.insert(key.into(), value.into());
        self
    }

    /// The dotted view name.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.identifier.join(".")
    }
}

/// A view over its analyzed definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    /// The catalog description.
    pub desc: CatalogTable,
    /// Whether the view lives only in this session.
    pub is_temp_view: bool,
}

impl ViewNode {
    /// The configuration the view's definition is analyzed under.
    ///
    /// A non-temporary view uses the active configuration when the active
    /// configuration asks for it; otherwise the captured configuration is
    /// applied over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a captured configuration value is malformed.
    pub fn effective_config(&self, active: &SessionConfig) -> PlanResult<SessionConfig> {
        if active.use_current_sql_configs_for_view && !self.is_temp_view {
            debug!(view = %self.desc.qualified_name(), "analyzing view with the active configuration");
            return Ok(active.clone());
        }
        debug!(
            view = %self.desc.qualified_name(),
            captured = self.desc.view_sql_configs.len(),
            "analyzing view with its captured configuration"
        );
        let captured = self.desc.view_sql_configs.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        SessionConfig::default().with_overrides(captured).map_err(PlanError::from)
    }
}
