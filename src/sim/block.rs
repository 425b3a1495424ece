//! Pooled block entities
//!
//! A block owns exactly one tile once spawned (`current_tile`) and reserves
//! at most one more while moving (`target_tile`). Ownership moves over in a
//! single step when the move animation ends.

use glam::{IVec2, Vec2};
use rand::Rng;

use super::context::SwarmContext;
use super::state::Status;
use super::tile::{TileGrid, TileId};
use crate::consts::GRID_RADIUS;
use crate::settings::Properties;
use crate::{clamp01, ease_in_out_pow};

/// Range of the per-block easing exponent, re-rolled every cycle
const EASING_POWER_MIN: f32 = 1.5;
const EASING_POWER_MAX: f32 = 3.5;

/// A movable entity bound to a tile
#[derive(Debug, Clone)]
pub struct Block {
    /// Stable pool slot (maps to a GPU instance)
    pub id: usize,
    /// Slot is in use (spawned and not recycled)
    pub is_active: bool,

    pub current_tile: Option<TileId>,
    pub target_tile: Option<TileId>,
    pub is_moving: bool,
    pub has_been_spawned: bool,
    pub has_animation_ended: bool,
    /// Path already computed this cycle
    pub has_been_evaluated: bool,
    /// Cycles since the spawn animation finished
    pub life_cycle: u32,

    pub spawn_animation_ratio_unclamped: f32,
    pub spawn_animation_ratio: f32,
    pub move_animation_ratio: f32,
    pub eased_animation_ratio: f32,
    pub easing_power: f32,

    pub is_error_block: bool,
    pub error_life_cycle: u32,
    pub error_pre_fall_animation_time: f32,
    pub error_fall_animation_time: f32,
    /// Board direction the error block falls towards
    pub error_direction: IVec2,
}

impl Block {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            is_active: false,
            current_tile: None,
            target_tile: None,
            is_moving: false,
            has_been_spawned: false,
            has_animation_ended: false,
            has_been_evaluated: false,
            life_cycle: 0,
            spawn_animation_ratio_unclamped: 0.0,
            spawn_animation_ratio: 0.0,
            move_animation_ratio: 0.0,
            eased_animation_ratio: 0.0,
            easing_power: 2.0,
            is_error_block: false,
            error_life_cycle: 0,
            error_pre_fall_animation_time: 0.0,
            error_fall_animation_time: 0.0,
            error_direction: IVec2::ZERO,
        }
    }

    /// Take a pool slot and start spawning on `tile`.
    ///
    /// `spawn_offset` (>= 0) is subtracted from the spawn ratio so that
    /// blocks spawned together do not pop in at the same instant.
    pub fn init(&mut self, tile: TileId, spawn_offset: f32, grid: &mut TileGrid, ctx: &mut SwarmContext) {
        self.reset();
        self.is_active = true;
        self.current_tile = Some(tile);
        self.spawn_animation_ratio_unclamped = -spawn_offset;
        self.roll_easing(&mut ctx.rng);
        grid.tile_mut(tile).is_occupied = true;
    }

    /// Back to the pool state (tiles are not touched, see [`Block::release_tiles`])
    pub fn reset(&mut self) {
        *self = Self::new(self.id);
    }

    /// Drop occupancy of the current tile and the reservation of the target
    pub fn release_tiles(&mut self, grid: &mut TileGrid) {
        if let Some(current) = self.current_tile {
            grid.tile_mut(current).is_occupied = false;
        }
        if let Some(target) = self.target_tile.take() {
            grid.tile_mut(target).will_be_occupied = false;
        }
        self.is_moving = false;
    }

    fn roll_easing<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.easing_power = rng.random_range(EASING_POWER_MIN..EASING_POWER_MAX);
    }

    /// Pick and reserve the next tile for this cycle.
    ///
    /// With `allow_any_direction` the first available neighbour in shuffled
    /// order wins; otherwise only neighbours at least as central as the
    /// current tile are considered, most central first. The main tile is
    /// never a target. Returns true if a move was started.
    pub fn move_to_next_tile(
        &mut self,
        allow_any_direction: bool,
        start_delay: f32,
        grid: &mut TileGrid,
        ctx: &mut SwarmContext,
    ) -> bool {
        self.has_been_evaluated = true;
        let Some(current) = self.current_tile else {
            self.has_animation_ended = true;
            return false;
        };
        if self.is_moving {
            return true;
        }

        grid.shuffle_neighbours(current, &mut ctx.rng);

        let tile = grid.tile(current);
        if tile.is_main && ctx.rng.random::<f32>() >= ctx.properties.main_tile_move_chance {
            self.has_animation_ended = true;
            return false;
        }

        let next = if allow_any_direction {
            tile.reachable_neighbours
                .iter()
                .copied()
                .find(|id| grid.is_available(*id))
        } else {
            tile.priority_sorted_reachable_neighbours
                .iter()
                .copied()
                .find(|id| {
                    grid.is_available(*id)
                        && (tile.is_main || grid.tile(*id).priority >= tile.priority)
                })
        };

        match next {
            Some(target) => {
                grid.tile_mut(target).will_be_occupied = true;
                self.target_tile = Some(target);
                self.is_moving = true;
                self.has_animation_ended = false;
                self.move_animation_ratio = -start_delay;
                self.eased_animation_ratio = 0.0;
                true
            }
            None => {
                self.has_animation_ended = true;
                false
            }
        }
    }

    /// Advance spawn/move/error ratios and write tile intensities
    pub fn update(&mut self, dt: f32, speed: f32, grid: &mut TileGrid, properties: &Properties) {
        if !self.is_active {
            return;
        }
        let Some(current) = self.current_tile else {
            return;
        };

        if self.is_error_block {
            if self.error_pre_fall_animation_time < properties.error_pre_fall_duration {
                self.error_pre_fall_animation_time =
                    (self.error_pre_fall_animation_time + dt).min(properties.error_pre_fall_duration);
            } else {
                self.error_fall_animation_time =
                    (self.error_fall_animation_time + dt).min(properties.error_fall_duration);
            }
        }

        if !self.has_been_spawned {
            self.spawn_animation_ratio_unclamped += speed * dt;
            self.spawn_animation_ratio = clamp01(self.spawn_animation_ratio_unclamped);
            if self.spawn_animation_ratio_unclamped >= 1.0 {
                self.has_been_spawned = true;
            }
            write_active(grid, current, self.spawn_animation_ratio);
            return;
        }

        if self.is_moving {
            self.move_animation_ratio += speed * dt;
            self.eased_animation_ratio =
                ease_in_out_pow(clamp01(self.move_animation_ratio), self.easing_power);
            write_active(grid, current, 1.0 - self.eased_animation_ratio);
            if let Some(target) = self.target_tile {
                write_active(grid, target, self.eased_animation_ratio);
            }
            if self.move_animation_ratio >= 1.0 {
                self.on_movement_end(grid);
            }
        } else {
            let intensity = if self.is_error_block {
                1.0 - self.error_fall_ratio(properties)
            } else {
                1.0
            };
            write_active(grid, current, intensity);
        }
    }

    /// Hand the target tile over to this block
    fn on_movement_end(&mut self, grid: &mut TileGrid) {
        if let Some(target) = self.target_tile.take() {
            if let Some(current) = self.current_tile {
                grid.tile_mut(current).is_occupied = false;
            }
            let tile = grid.tile_mut(target);
            tile.is_occupied = true;
            tile.will_be_occupied = false;
            self.current_tile = Some(target);
        }
        self.is_moving = false;
        self.move_animation_ratio = 1.0;
        self.eased_animation_ratio = 1.0;
        self.has_animation_ended = true;
    }

    /// Close out a cycle: commit any move in flight, re-roll easing, age the block.
    ///
    /// In the free state an idle border block may become the grid's error
    /// block. Returns true if that happened.
    pub fn reset_after_cycle(&mut self, grid: &mut TileGrid, ctx: &mut SwarmContext, status: Status) -> bool {
        if !self.is_active {
            return false;
        }
        if self.target_tile.is_some() {
            self.on_movement_end(grid);
        }
        self.is_moving = false;
        self.has_been_evaluated = false;
        self.has_animation_ended = false;
        self.move_animation_ratio = 0.0;
        self.eased_animation_ratio = 0.0;
        self.roll_easing(&mut ctx.rng);

        if !self.has_been_spawned {
            return false;
        }
        self.life_cycle += 1;

        if self.is_error_block {
            self.error_life_cycle += 1;
            return false;
        }

        let on_border = self
            .current_tile
            .map(|id| grid.tile(id).is_border)
            .unwrap_or(false);
        if status == Status::Free
            && ctx.error_block.is_none()
            && on_border
            && ctx.rng.random::<f32>() < ctx.properties.error_block_chance
        {
            return self.flag_as_error(grid, ctx);
        }
        false
    }

    /// Make this block the grid's error block (no-op if one already exists)
    pub fn flag_as_error(&mut self, grid: &TileGrid, ctx: &mut SwarmContext) -> bool {
        if ctx.error_block.is_some() || !self.is_active || self.is_moving {
            return false;
        }
        let Some(current) = self.current_tile else {
            return false;
        };
        let tile = grid.tile(current);
        let (row, col) = (tile.row, tile.col);

        self.error_direction = if row.abs() == GRID_RADIUS && col.abs() == GRID_RADIUS {
            // Corner: fall off either edge
            if ctx.rng.random::<bool>() {
                IVec2::new(col.signum(), 0)
            } else {
                IVec2::new(0, row.signum())
            }
        } else if col != 0 && col.abs() >= row.abs() {
            IVec2::new(col.signum(), 0)
        } else if row != 0 {
            IVec2::new(0, row.signum())
        } else {
            IVec2::Y
        };

        self.is_error_block = true;
        self.error_life_cycle = 0;
        self.error_pre_fall_animation_time = 0.0;
        self.error_fall_animation_time = 0.0;
        ctx.error_block = Some(self.id);
        log::info!("Block {} flagged as error block at ({}, {})", self.id, row, col);
        true
    }

    pub fn error_pre_fall_ratio(&self, properties: &Properties) -> f32 {
        clamp01(self.error_pre_fall_animation_time / properties.error_pre_fall_duration)
    }

    pub fn error_fall_ratio(&self, properties: &Properties) -> f32 {
        clamp01(self.error_fall_animation_time / properties.error_fall_duration)
    }

    pub fn has_error_fall_ended(&self, properties: &Properties) -> bool {
        self.is_error_block && self.error_fall_animation_time >= properties.error_fall_duration
    }

    /// Error block has run its course and can go back to the pool
    pub fn is_error_done(&self, properties: &Properties, max_life_cycle: u32) -> bool {
        self.is_error_block
            && (self.error_life_cycle >= max_life_cycle || self.has_error_fall_ended(properties))
    }

    /// Board coordinates of the owned tile
    pub fn coords(&self, grid: &TileGrid) -> Option<IVec2> {
        self.current_tile.map(|id| grid.tile(id).coords())
    }

    /// Unit step towards the target tile (or the fall edge for error blocks)
    pub fn direction(&self, grid: &TileGrid) -> Vec2 {
        if self.is_error_block {
            return self.error_direction.as_vec2();
        }
        match (self.current_tile, self.target_tile) {
            (Some(current), Some(target)) => {
                (grid.tile(target).coords() - grid.tile(current).coords()).as_vec2()
            }
            _ => Vec2::ZERO,
        }
    }
}

fn write_active(grid: &mut TileGrid, id: TileId, value: f32) {
    let tile = grid.tile_mut(id);
    tile.active_ratio = tile.active_ratio.max(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Properties;

    fn setup(seed: u64) -> (TileGrid, SwarmContext) {
        (TileGrid::new(), SwarmContext::new(seed, Properties::default()))
    }

    fn spawned_at(row: i32, col: i32, grid: &mut TileGrid, ctx: &mut SwarmContext) -> Block {
        let mut block = Block::new(0);
        let id = grid.tile_id(row, col).unwrap();
        block.init(id, 0.0, grid, ctx);
        block.has_been_spawned = true;
        block
    }

    #[test]
    fn test_init_occupies_tile() {
        let (mut grid, mut ctx) = setup(1);
        let mut block = Block::new(4);
        block.init(grid.main_tile, 0.3, &mut grid, &mut ctx);
        assert!(block.is_active);
        assert!(grid.main_tile().is_occupied);
        assert!((block.spawn_animation_ratio_unclamped + 0.3).abs() < 1e-6);
        assert!((EASING_POWER_MIN..EASING_POWER_MAX).contains(&block.easing_power));
        assert_eq!(block.id, 4);
    }

    #[test]
    fn test_spawn_ratio_advances_until_spawned() {
        let (mut grid, mut ctx) = setup(1);
        let props = Properties::default();
        let mut block = Block::new(0);
        block.init(grid.main_tile, 0.0, &mut grid, &mut ctx);

        block.update(0.5, 1.0, &mut grid, &props);
        assert!(!block.has_been_spawned);
        assert!((block.spawn_animation_ratio - 0.5).abs() < 1e-6);
        assert!((grid.main_tile().active_ratio - 0.5).abs() < 1e-6);

        block.update(0.5, 1.0, &mut grid, &props);
        assert!(block.has_been_spawned);
        assert_eq!(block.spawn_animation_ratio, 1.0);
    }

    #[test]
    fn test_move_reserves_then_transfers_ownership() {
        let (mut grid, mut ctx) = setup(3);
        let props = Properties::default();
        let mut block = spawned_at(1, 0, &mut grid, &mut ctx);
        let start = block.current_tile.unwrap();

        assert!(block.move_to_next_tile(true, 0.4, &mut grid, &mut ctx));
        let target = block.target_tile.unwrap();
        assert!(grid.tile(target).will_be_occupied);
        assert!(!grid.tile(target).is_occupied);
        assert!(!grid.tile(target).is_main);
        assert!((block.move_animation_ratio + 0.4).abs() < 1e-6);
        assert_eq!(block.direction(&grid).length(), 1.0);

        let mut guard = 0;
        while block.is_moving && guard < 1000 {
            block.update(0.05, 1.0, &mut grid, &props);
            guard += 1;
        }
        assert!(block.has_animation_ended);
        assert_eq!(block.current_tile, Some(target));
        assert!(grid.tile(target).is_occupied);
        assert!(!grid.tile(target).will_be_occupied);
        assert!(!grid.tile(start).is_occupied);
    }

    #[test]
    fn test_blocked_block_stays_put() {
        let (mut grid, mut ctx) = setup(5);
        let mut block = spawned_at(2, 2, &mut grid, &mut ctx);
        grid.get_tile_mut(1, 2).unwrap().is_occupied = true;
        grid.get_tile_mut(2, 1).unwrap().will_be_occupied = true;

        assert!(!block.move_to_next_tile(true, 0.0, &mut grid, &mut ctx));
        assert!(block.has_animation_ended);
        assert!(block.has_been_evaluated);
        assert!(block.target_tile.is_none());
    }

    #[test]
    fn test_strict_mode_moves_inward() {
        let (mut grid, mut ctx) = setup(9);
        let mut block = spawned_at(2, 0, &mut grid, &mut ctx);
        assert!(block.move_to_next_tile(false, 0.0, &mut grid, &mut ctx));
        let target = grid.tile(block.target_tile.unwrap());
        assert_eq!((target.row, target.col), (1, 0));
    }

    #[test]
    fn test_strict_mode_never_moves_outward() {
        let (mut grid, mut ctx) = setup(11);
        // (1, 0) only has the main tile above it in priority
        let mut block = spawned_at(1, 0, &mut grid, &mut ctx);
        for _ in 0..20 {
            block.has_animation_ended = false;
            assert!(!block.move_to_next_tile(false, 0.0, &mut grid, &mut ctx));
        }
    }

    #[test]
    fn test_main_tile_is_never_a_target() {
        for seed in 0..30 {
            let (mut grid, mut ctx) = setup(seed);
            let mut block = spawned_at(0, 1, &mut grid, &mut ctx);
            if block.move_to_next_tile(true, 0.0, &mut grid, &mut ctx) {
                assert_ne!(block.target_tile, Some(grid.main_tile));
            }
        }
    }

    #[test]
    fn test_main_tile_block_sometimes_holds() {
        let mut moved = 0;
        let mut held = 0;
        for seed in 0..200 {
            let (mut grid, mut ctx) = setup(seed);
            let mut block = spawned_at(0, 0, &mut grid, &mut ctx);
            if block.move_to_next_tile(false, 0.0, &mut grid, &mut ctx) {
                moved += 1;
            } else {
                held += 1;
            }
        }
        assert!(moved > held);
        assert!(held > 0);
    }

    #[test]
    fn test_reset_after_cycle_commits_move_in_flight() {
        let (mut grid, mut ctx) = setup(13);
        let mut block = spawned_at(0, 1, &mut grid, &mut ctx);
        assert!(block.move_to_next_tile(true, 0.0, &mut grid, &mut ctx));
        let target = block.target_tile.unwrap();

        block.reset_after_cycle(&mut grid, &mut ctx, Status::Result);
        assert_eq!(block.current_tile, Some(target));
        assert!(grid.tile(target).is_occupied);
        assert!(!block.is_moving);
        assert!(!block.has_been_evaluated);
        assert_eq!(block.life_cycle, 1);
        assert_eq!(grid.tiles.iter().filter(|t| t.is_occupied).count(), 1);
    }

    #[test]
    fn test_unspawned_block_does_not_age() {
        let (mut grid, mut ctx) = setup(13);
        let mut block = Block::new(0);
        block.init(grid.main_tile, 0.5, &mut grid, &mut ctx);
        block.reset_after_cycle(&mut grid, &mut ctx, Status::Free);
        assert_eq!(block.life_cycle, 0);
    }

    #[test]
    fn test_error_flag_only_on_free_border() {
        let (mut grid, mut ctx) = setup(17);
        ctx.properties.error_block_chance = 1.0;

        let mut inner = spawned_at(1, 1, &mut grid, &mut ctx);
        assert!(!inner.reset_after_cycle(&mut grid, &mut ctx, Status::Free));

        let mut border = spawned_at(2, -1, &mut grid, &mut ctx);
        assert!(!border.reset_after_cycle(&mut grid, &mut ctx, Status::Result));
        assert!(border.reset_after_cycle(&mut grid, &mut ctx, Status::Free));
        assert!(border.is_error_block);
        assert_eq!(ctx.error_block, Some(border.id));
        assert_eq!(border.error_direction, IVec2::new(0, 1));

        // Singleton: a second candidate is refused
        let mut other = Block::new(1);
        other.init(grid.tile_id(-2, 0).unwrap(), 0.0, &mut grid, &mut ctx);
        other.has_been_spawned = true;
        assert!(!other.reset_after_cycle(&mut grid, &mut ctx, Status::Free));
        assert!(!other.is_error_block);
    }

    #[test]
    fn test_error_timers_and_done() {
        let (mut grid, mut ctx) = setup(19);
        let props = Properties::default();
        let mut block = spawned_at(0, 2, &mut grid, &mut ctx);
        assert!(block.flag_as_error(&grid, &mut ctx));
        assert_eq!(block.direction(&grid), Vec2::X);

        block.update(props.error_pre_fall_duration, 1.0, &mut grid, &props);
        assert_eq!(block.error_pre_fall_ratio(&props), 1.0);
        assert_eq!(block.error_fall_ratio(&props), 0.0);
        assert!(!block.is_error_done(&props, 6));

        block.error_life_cycle = 6;
        assert!(block.is_error_done(&props, 6));

        block.error_life_cycle = 0;
        block.update(props.error_fall_duration, 1.0, &mut grid, &props);
        assert!(block.has_error_fall_ended(&props));
        assert!(block.is_error_done(&props, 6));
    }

    #[test]
    fn test_release_and_reset() {
        let (mut grid, mut ctx) = setup(21);
        let mut block = spawned_at(-1, 0, &mut grid, &mut ctx);
        assert!(block.move_to_next_tile(true, 0.0, &mut grid, &mut ctx));
        let (current, target) = (block.current_tile.unwrap(), block.target_tile.unwrap());

        block.release_tiles(&mut grid);
        block.reset();
        assert!(!grid.tile(current).is_occupied);
        assert!(!grid.tile(target).will_be_occupied);
        assert!(!block.is_active);
        assert!(block.current_tile.is_none());
    }
}
