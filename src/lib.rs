//! # Quartermaster
//!
//! Data-driven loadout generation for AI-controlled characters.
//!
//! ## Architecture Overview
//!
//! Given a static item catalog, a set of weapon presets and a per-role bot
//! template, Quartermaster produces a complete, self-consistent inventory:
//!
//! - **Catalog**: Immutable item templates, slot and grid definitions, presets
//! - **Inventory**: An arena of items addressed by handle, with tree integrity checks
//! - **Placement**: Grid occupancy and first-fit placement into containers
//! - **Generation**: Equipment, weapons with mod trees, ammunition and loot
//!
//! Every generation pass reads shared immutable data and a caller-supplied
//! RNG, so identical seeds produce identical inventories and independent
//! bots can be generated in parallel.

pub mod catalog;
pub mod generation;
pub mod inventory;
pub mod placement;
pub mod utils;

// Core module re-exports
pub use catalog::*;
pub use generation::*;
pub use inventory::*;
pub use placement::*;
pub use utils::*;

/// Core error type for Quartermaster.
#[derive(thiserror::Error, Debug)]
pub enum QuartermasterError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A template id is not in the catalog
    #[error("Unknown item template: {0}")]
    UnknownTemplate(String),

    /// A min/max pair or weighted table cannot be sampled
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// A weapon could not be assembled and has no preset
    #[error("Weapon assembly failed for {template}: {reason}")]
    WeaponAssembly { template: String, reason: String },

    /// The item tree is inconsistent
    #[error("Invalid inventory: {0}")]
    InvalidInventory(String),

    /// Configuration or template data is invalid
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type used throughout the Quartermaster codebase.
pub type QuartermasterResult<T> = Result<T, QuartermasterError>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generation tuning constants.
pub mod config {
    /// Numerator of the dynamic loot weight (`scale / price`)
    pub const DYNAMIC_WEIGHT_SCALE: f64 = 1_000_000.0;

    /// Consecutive placement failures after which a loot category stops
    pub const MAX_CONSECUTIVE_PLACEMENT_FAILURES: u32 = 4;

    /// Multiple of the spawn-limit retry budget after which a capped item is
    /// accepted anyway
    pub const SPAWN_LIMIT_OVERFLOW_FACTOR: u32 = 10;

    /// Hard cap on the number of bots a single CLI invocation generates
    pub const MAX_BATCH_SIZE: u32 = 10_000;
}
