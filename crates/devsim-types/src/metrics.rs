//! # devsim-types::metrics
//!
//! Defines constants for metric names and labels.
//! Centralizing these constants prevents typos and ensures consistency
//! between the engine (where metrics are emitted) and external consumers.

// --- Metric Names ---
pub const MET_BAGS: &str = "devsim_bags_total";
pub const MET_TRANSITIONS: &str = "devsim_transitions_total";
pub const MET_EXTERNALS_ROUTED: &str = "devsim_externals_routed_total";
pub const MET_OBSERVATIONS: &str = "devsim_observations_total";
pub const MET_STRUCTURAL_CHANGES: &str = "devsim_structural_changes_total";

// --- Label Keys ---
pub const LBL_MODEL: &str = "model";
pub const LBL_KIND: &str = "kind";
pub const LBL_VIEW: &str = "view";
