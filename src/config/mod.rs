//! Probe configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ProbeConfig`] | Validated, immutable settings |
//! | [`ProbeConfigBuilder`] | Fluent configuration builder |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for probe configuration.
pub mod builder;

/// Configuration values and defaults.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ProbeConfigBuilder;
pub use options::ProbeConfig;
