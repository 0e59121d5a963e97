//! Filter implementations for event selection.
//!
//! Every filter answers one accept/reject question per event. Filters
//! reading valid objects or quantities must be placed after the
//! producers that fill them.

pub mod hlt;
pub mod min_objects;
pub mod object_cuts;
pub mod quantity_cuts;
pub mod run_lumi;

// Re-export for convenience
pub use hlt::HltFilter;
pub use min_objects::MinObjectsFilter;
pub use object_cuts::ObjectCutsFilter;
pub use quantity_cuts::QuantityCutsFilter;
pub use run_lumi::RunLumiEventFilter;
