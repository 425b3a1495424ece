//! Block Swarm - grid status indicator simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tiles, blocks, state machine, result animations)
//! - `settings`: Tunable properties and colour themes
//! - `instance`: Plain-data records handed to a renderer every frame
//! - `error`: Errors raised by the host-facing parsers

pub mod error;
pub mod instance;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use error::{Result, SwarmError};
pub use settings::{Properties, Theme};

/// Simulation configuration constants
pub mod consts {
    /// Logical board is GRID_SIZE x GRID_SIZE, centred on (0, 0)
    pub const GRID_SIZE: usize = 5;
    pub const GRID_RADIUS: i32 = 2;

    /// Padded ring around the board for look-ahead and off-board staging
    pub const PADDED_SIZE: usize = 7;
    pub const PADDED_RADIUS: i32 = 3;
    pub const TILE_COUNT: usize = PADDED_SIZE * PADDED_SIZE;

    /// Maximum live blocks (one per board tile)
    pub const BOARD_CAPACITY: usize = GRID_SIZE * GRID_SIZE;
    /// Pre-allocated block slots
    pub const BLOCK_POOL_SIZE: usize = 2 * BOARD_CAPACITY;

    /// Cycles an error block lives before it is recycled
    pub const ERROR_BLOCK_MAX_LIFECYCLE: u32 = 6;

    /// Number of success animation levels (success, success2, success3)
    pub const COMPLETE_LEVELS: usize = 3;
}

/// Clamp to [0, 1]
#[inline]
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Remap `value` from [in_start, in_end] to [out_start, out_end], clamped to the output range
#[inline]
pub fn fit(value: f32, in_start: f32, in_end: f32, out_start: f32, out_end: f32) -> f32 {
    if (in_end - in_start).abs() <= f32::EPSILON {
        return if value >= in_end { out_end } else { out_start };
    }
    let t = clamp01((value - in_start) / (in_end - in_start));
    out_start + (out_end - out_start) * t
}

/// Symmetric ease-in-out with a tunable exponent (power = 1 is linear)
#[inline]
pub fn ease_in_out_pow(t: f32, power: f32) -> f32 {
    let t = clamp01(t);
    if t < 0.5 {
        0.5 * (2.0 * t).powf(power)
    } else {
        1.0 - 0.5 * (2.0 * (1.0 - t)).powf(power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_clamps() {
        assert_eq!(fit(-1.0, 0.0, 1.0, 0.0, 1.0), 0.0);
        assert_eq!(fit(2.0, 0.0, 1.0, 0.0, 1.0), 1.0);
        assert!((fit(0.5, 0.25, 0.75, 0.0, 1.0) - 0.5).abs() < 1e-6);
        assert!((fit(0.5, 0.0, 1.0, 10.0, 20.0) - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_degenerate_window() {
        assert_eq!(fit(0.4, 0.5, 0.5, 0.0, 1.0), 0.0);
        assert_eq!(fit(0.5, 0.5, 0.5, 0.0, 1.0), 1.0);
    }

    #[test]
    fn test_ease_endpoints_and_symmetry() {
        for power in [1.0, 1.5, 2.5, 3.4] {
            assert_eq!(ease_in_out_pow(0.0, power), 0.0);
            assert!((ease_in_out_pow(1.0, power) - 1.0).abs() < 1e-6);
            assert!((ease_in_out_pow(0.5, power) - 0.5).abs() < 1e-6);
            let a = ease_in_out_pow(0.2, power);
            let b = ease_in_out_pow(0.8, power);
            assert!((a + b - 1.0).abs() < 1e-5);
        }
    }
}
