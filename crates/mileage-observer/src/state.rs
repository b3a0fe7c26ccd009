//! Shared application state for the read-back API.

use mileage_core::GenerationReport;

/// State shared by every handler.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. Reads go straight to the store; the only in-process data is
/// the report of the run that produced the dataset.
pub struct AppState<S> {
    /// The store the dataset was generated into.
    pub store: S,
    /// Report of the generation run of this process, if one happened.
    pub last_report: Option<GenerationReport>,
}

impl<S> AppState<S> {
    /// Serve `store` with no run report.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            last_report: None,
        }
    }

    /// Serve `store` together with the report of the run that filled it.
    pub const fn with_report(store: S, report: GenerationReport) -> Self {
        Self {
            store,
            last_report: Some(report),
        }
    }
}
