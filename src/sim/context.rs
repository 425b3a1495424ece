//! Shared simulation context
//!
//! Everything the components used to reach through globals: tunables, the
//! seeded RNG, and the grid-wide error block slot.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::settings::Properties;

/// Single-owner context passed by `&mut` into grid/block operations
#[derive(Debug, Clone)]
pub struct SwarmContext {
    /// Run seed for reproducibility
    pub seed: u64,
    pub properties: Properties,
    pub rng: Pcg32,
    /// Pool id of the current error block (at most one grid-wide)
    pub error_block: Option<usize>,
}

impl SwarmContext {
    pub fn new(seed: u64, properties: Properties) -> Self {
        Self {
            seed,
            properties,
            rng: Pcg32::seed_from_u64(seed),
            error_block: None,
        }
    }
}
