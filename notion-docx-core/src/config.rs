//! Run configuration, constructed once at startup and passed down to every
//! component that needs it.

use tracing::{debug, info};

use crate::filter::FilterExpression;

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub database_id: String,
    pub filter: Option<FilterExpression>,
}

impl SnapshotConfig {
    pub fn trace_loaded(&self) {
        info!(
            database_id = %self.database_id,
            filter = %self
                .filter
                .as_ref()
                .map(FilterExpression::summary)
                .unwrap_or_else(|| "none".to_string()),
            "Loaded SnapshotConfig"
        );
        debug!(?self, "SnapshotConfig loaded (full debug)");
    }
}
