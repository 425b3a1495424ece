//! Deterministic simulation module
//!
//! All swarm logic lives here. This module must be pure and deterministic:
//! - Caller-supplied frame delta only
//! - Seeded RNG only
//! - Stable iteration order (by tile and block id)
//! - No rendering or platform dependencies

pub mod animation;
pub mod block;
pub mod context;
pub mod signal;
pub mod state;
pub mod tick;
pub mod tile;

pub use animation::{CompleteAnimation, ErrorAnimation, ResultSequencer, StopAnimation};
pub use block::Block;
pub use context::SwarmContext;
pub use signal::{ResultAnimationKind, Signal, Signals, StateChange};
pub use state::{Command, GameResult, GameStateManager, Intent, Status};
pub use tick::{BlockSnapshot, BlocksManager, SwarmSnapshot};
pub use tile::{Tile, TileGrid, TileId};
