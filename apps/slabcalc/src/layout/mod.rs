// Slab layout model: constants, the two-pass calculator, sweeps and policy audit.
// Everything here is pure integer arithmetic; percentages are derived last.

pub mod calculator;
pub mod constants;
pub mod policy;
pub mod sweep;

// Re-export the public API consumed by main and render.
pub use calculator::LayoutReport;
pub use constants::{LayoutConstants, SIZE_CLASSES};
pub use policy::{audit_all, PolicyAudit, SHIPPED_POLICY};
pub use sweep::{sweep_all, SizeClassSweep};
