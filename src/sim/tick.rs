//! Per-frame orchestration
//!
//! [`BlocksManager`] owns every piece of simulation state and is the only
//! caller of the state machine and the result sequencers. One `update(dt)`
//! per rendered frame:
//!
//! 1. result sequencers advance
//! 2. (at a cycle boundary) the state machine drains one command
//! 3. the grid zeroes its per-frame fields
//! 4. blocks advance and may hand tiles over
//! 5. the grid post-update runs
//! 6. if the cycle is complete, the next one starts in the same tick

use glam::IVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::animation::{CompleteAnimation, ErrorAnimation, ResultSequencer, StopAnimation};
use super::block::Block;
use super::context::SwarmContext;
use super::signal::{ResultAnimationKind, Signals, StateChange};
use super::state::{GameResult, GameStateManager, Status};
use super::tile::TileGrid;
use crate::consts::*;
use crate::instance::{BlockInstance, TileInstance};
use crate::settings::Properties;

/// Serializable view of the board used for debugging and tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmSnapshot {
    pub status: Status,
    pub result: GameResult,
    pub cycle_index: u64,
    pub occupied: Vec<IVec2>,
    pub reserved: Vec<IVec2>,
    pub blocks: Vec<BlockSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub id: usize,
    pub coords: Option<IVec2>,
    pub target: Option<IVec2>,
    pub life_cycle: u32,
    pub is_error_block: bool,
}

/// Top-level simulation orchestrator
#[derive(Debug)]
pub struct BlocksManager {
    pub ctx: SwarmContext,
    pub grid: TileGrid,
    /// Fixed pool; slots are recycled, never reallocated
    pub blocks: Vec<Block>,
    pub state: GameStateManager,
    pub complete_animation: CompleteAnimation,
    pub stop_animation: StopAnimation,
    pub error_animation: ErrorAnimation,
    pub signals: Signals,
    /// Live blocks taking part in path assignment (ids into `blocks`)
    active: Vec<usize>,
    /// Block spawned on the main tile this cycle, promoted next cycle
    pending: Option<usize>,
    cycle_index: u64,
    speed_multiplier: f32,
    allow_any_direction: bool,
}

impl BlocksManager {
    pub fn new(seed: u64, properties: Properties) -> Self {
        let mut manager = Self {
            ctx: SwarmContext::new(seed, properties),
            grid: TileGrid::new(),
            blocks: (0..BLOCK_POOL_SIZE).map(Block::new).collect(),
            state: GameStateManager::new(),
            complete_animation: CompleteAnimation::default(),
            stop_animation: StopAnimation::default(),
            error_animation: ErrorAnimation::default(),
            signals: Signals::default(),
            active: Vec::with_capacity(BOARD_CAPACITY),
            pending: None,
            cycle_index: 0,
            speed_multiplier: 1.0,
            allow_any_direction: false,
        };
        manager.reset();
        log::info!("Block swarm initialized with seed: {}", seed);
        manager
    }

    // === Host control surface ===

    /// Queue a host intent (`start`, `success2`, `fail`, `pause`, ...)
    pub fn set(&mut self, name: &str, flag: bool) -> crate::Result<()> {
        self.state.set(name, flag, &self.ctx.properties)
    }

    /// Apply `[{ "property": ..., "value": ... }]` overrides
    pub fn set_properties(&mut self, json: &str) -> crate::Result<()> {
        self.ctx.properties.apply_json(json)
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }

    pub fn result(&self) -> GameResult {
        self.state.result()
    }

    /// Set once the host sends `showVisual`
    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }

    pub fn cycle_index(&self) -> u64 {
        self.cycle_index
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Direction mode used by the most recent path assignment
    pub fn allow_any_direction(&self) -> bool {
        self.allow_any_direction
    }

    pub fn pending_block(&self) -> Option<usize> {
        self.pending
    }

    pub fn active_blocks(&self) -> &[usize] {
        &self.active
    }

    /// Ids of every spawned, not yet recycled block
    pub fn live_block_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.active.iter().copied().chain(self.pending)
    }

    pub fn live_count(&self) -> usize {
        self.active.len() + usize::from(self.pending.is_some())
    }

    // === Frame update ===

    pub fn update(&mut self, dt: f32) {
        if self.state.is_paused() {
            return;
        }

        self.state.advance_clock(dt);
        self.update_speed(dt);
        self.update_sequencers(dt);

        match self.state.status() {
            Status::NotStarted => self.start_new_cycle(),
            Status::Restart => self.reset(),
            _ => {
                self.recycle_error_block();

                self.grid.pre_update(dt);
                let speed = self.ctx.properties.animation_speed * self.speed_multiplier;
                for &id in self.active.iter().chain(self.pending.iter()) {
                    self.blocks[id].update(dt, speed, &mut self.grid, &self.ctx.properties);
                }
                self.grid.update(dt);

                if self.check_cycle_completion() {
                    log::trace!("Cycle {} complete", self.cycle_index);
                    self.signals.end_cycle.dispatch(&self.cycle_index);
                    self.start_new_cycle();
                }
            }
        }
    }

    fn update_speed(&mut self, dt: f32) {
        let properties = &self.ctx.properties;
        let target = if self.state.result().is_success() {
            properties.result_speed_multiplier
        } else {
            1.0
        };
        let t = (properties.speed_ramp_rate * dt).min(1.0);
        self.speed_multiplier += (target - self.speed_multiplier) * t;
    }

    fn update_sequencers(&mut self, dt: f32) {
        if self.complete_animation.update(dt) {
            self.signals
                .animation_end
                .dispatch(&ResultAnimationKind::Complete);
        }
        if self.stop_animation.update(dt) {
            self.state.set_restart_animation();
            self.signals.animation_end.dispatch(&ResultAnimationKind::Stop);
        }
        if self.error_animation.update(dt) {
            self.state.set_restart_animation();
            self.signals.animation_end.dispatch(&ResultAnimationKind::Error);
        }
    }

    // === Cycles ===

    fn start_new_cycle(&mut self) {
        self.recycle_error_block();
        let hold = self.error_hold();
        self.state.update_after_cycle(hold);
        self.handle_transitions();

        let status = self.state.status();
        if matches!(
            status,
            Status::NotStarted | Status::RestartAnimation | Status::Restart | Status::Started
        ) {
            return;
        }

        if let Some(id) = self.pending.take() {
            self.active.push(id);
        }
        for &id in &self.active {
            self.blocks[id].reset_after_cycle(&mut self.grid, &mut self.ctx, status);
        }
        self.cycle_index += 1;

        self.spawn_block();
        self.calculate_paths();
    }

    /// React to committed transitions, then tell the host
    fn handle_transitions(&mut self) {
        for change in self.state.take_transitions() {
            match change.status {
                Status::ResultAnimation => match change.result {
                    GameResult::Completed | GameResult::Replay => self
                        .complete_animation
                        .start(change.level, &self.ctx.properties),
                    GameResult::Failed => self.error_animation.start(&self.ctx.properties),
                    GameResult::Stop => self.stop_animation.start(&self.ctx.properties),
                    GameResult::None | GameResult::Pause => {}
                },
                Status::RestartAnimation => self.state.set_restart(),
                _ => {}
            }
            self.signals.state.dispatch(&change);
        }
    }

    /// An error block that has not finished falling holds all transitions
    fn error_hold(&self) -> bool {
        self.ctx
            .error_block
            .map(|id| !self.blocks[id].has_error_fall_ended(&self.ctx.properties))
            .unwrap_or(false)
    }

    /// Result animations run regardless of where individual blocks are
    pub fn check_cycle_completion(&self) -> bool {
        if self.state.status() == Status::ResultAnimation
            || matches!(self.state.result(), GameResult::Failed | GameResult::Stop)
        {
            return true;
        }
        self.live_block_ids().all(|id| {
            let block = &self.blocks[id];
            (block.life_cycle == 0 && block.has_been_spawned)
                || (block.has_been_evaluated && block.has_animation_ended)
        })
    }

    // === Spawning ===

    fn should_prevent_spawn(&self) -> bool {
        self.live_count() >= BOARD_CAPACITY
            || self.grid.free_tile_count() == 0
            || matches!(
                self.state.result(),
                GameResult::Failed | GameResult::Stop | GameResult::Pause
            )
    }

    fn spawn_block(&mut self) {
        if self.should_prevent_spawn() {
            log::trace!("Spawn prevented");
            return;
        }
        if self.state.result().is_success() {
            self.spawn_multiple_blocks();
        } else {
            self.spawn_single_block();
        }
    }

    fn acquire_block(&self) -> Option<usize> {
        self.blocks.iter().position(|b| !b.is_active)
    }

    /// At most one block per cycle, always on the main tile
    fn spawn_single_block(&mut self) {
        let main = self.grid.main_tile;
        if self.pending.is_some() || !self.grid.tile(main).is_free() {
            return;
        }
        let Some(id) = self.acquire_block() else {
            return;
        };
        let offset = self.ctx.rng.random::<f32>();
        self.blocks[id].init(main, offset, &mut self.grid, &mut self.ctx);
        self.pending = Some(id);
        log::debug!("Spawned block {} on main tile", id);
        self.signals.spawn.dispatch(&id);
    }

    /// Fill every free tile, used while a success result plays
    fn spawn_multiple_blocks(&mut self) {
        let mut spawned = 0;
        while self.live_count() < BOARD_CAPACITY {
            let Some(tile) = self.grid.get_random_free_tile(&mut self.ctx.rng) else {
                break;
            };
            let Some(id) = self.acquire_block() else {
                break;
            };
            let offset = self.ctx.rng.random::<f32>() * 0.5;
            self.blocks[id].init(tile, offset, &mut self.grid, &mut self.ctx);
            self.active.push(id);
            spawned += 1;
            self.signals.spawn.dispatch(&id);
        }
        if spawned > 0 {
            log::debug!("Burst spawned {} blocks", spawned);
        }
    }

    /// Give every idle block its move for this cycle.
    ///
    /// Free wandering in the free state and on odd cycles, centre-seeking
    /// otherwise. Blocks hold still while a result animation plays.
    fn calculate_paths(&mut self) {
        let status = self.state.status();
        self.allow_any_direction = status == Status::Free || self.cycle_index % 2 == 1;
        let freeze = status == Status::ResultAnimation
            || matches!(self.state.result(), GameResult::Failed | GameResult::Stop);
        let step = self.ctx.properties.path_start_delay_step;

        let mut moving = 0u32;
        for &id in &self.active {
            let block = &mut self.blocks[id];
            if block.has_been_evaluated || !block.has_been_spawned {
                continue;
            }
            if freeze || block.is_error_block {
                block.has_been_evaluated = true;
                block.has_animation_ended = true;
                continue;
            }
            let delay = moving as f32 * step;
            if block.move_to_next_tile(self.allow_any_direction, delay, &mut self.grid, &mut self.ctx) {
                moving += 1;
            }
        }
        log::trace!(
            "Cycle {}: {} moving, any direction: {}",
            self.cycle_index,
            moving,
            self.allow_any_direction
        );
    }

    /// Return a finished error block to the pool and free its slot
    fn recycle_error_block(&mut self) {
        let Some(id) = self.ctx.error_block else {
            return;
        };
        if !self.blocks[id].is_error_done(&self.ctx.properties, ERROR_BLOCK_MAX_LIFECYCLE) {
            return;
        }
        self.blocks[id].release_tiles(&mut self.grid);
        self.blocks[id].reset();
        self.active.retain(|b| *b != id);
        if self.pending == Some(id) {
            self.pending = None;
        }
        self.ctx.error_block = None;
        log::info!("Error block {} recycled", id);
    }

    /// Clear every block, the grid and counters, then start over from NOT_STARTED
    pub fn reset(&mut self) {
        let was = self.state.status();
        for block in &mut self.blocks {
            block.reset();
        }
        self.grid.reset();
        self.active.clear();
        self.pending = None;
        self.cycle_index = 0;
        self.speed_multiplier = 1.0;
        self.allow_any_direction = false;
        self.ctx.error_block = None;
        self.complete_animation.reset();
        self.stop_animation.reset();
        self.error_animation.reset();

        self.state.reset();
        if was != Status::NotStarted {
            log::info!("Swarm reset");
            self.signals.state.dispatch(&StateChange {
                status: Status::NotStarted,
                result: GameResult::None,
                level: 0,
            });
        }
        self.start_new_cycle();
    }

    // === Hooks (tests, debug tools) ===

    /// Place a fully spawned block on a free board tile
    pub fn spawn_block_at(&mut self, row: i32, col: i32) -> Option<usize> {
        let tile = self.grid.tile_id(row, col)?;
        if !self.grid.tile(tile).is_free() || self.live_count() >= BOARD_CAPACITY {
            return None;
        }
        let id = self.acquire_block()?;
        let block = &mut self.blocks[id];
        block.init(tile, 0.0, &mut self.grid, &mut self.ctx);
        block.has_been_spawned = true;
        block.spawn_animation_ratio_unclamped = 1.0;
        block.spawn_animation_ratio = 1.0;
        self.active.push(id);
        self.signals.spawn.dispatch(&id);
        Some(id)
    }

    /// Make a live block the error block
    pub fn force_error_block(&mut self, id: usize) -> bool {
        match self.blocks.get_mut(id) {
            Some(block) => block.flag_as_error(&self.grid, &mut self.ctx),
            None => false,
        }
    }

    // === Renderer outputs ===

    pub fn tile_instances(&self) -> Vec<TileInstance> {
        self.grid.tiles.iter().map(TileInstance::from_tile).collect()
    }

    pub fn block_instances(&self) -> Vec<BlockInstance> {
        self.live_block_ids()
            .map(|id| BlockInstance::from_block(&self.blocks[id], &self.grid, &self.ctx.properties))
            .collect()
    }

    pub fn snapshot(&self) -> SwarmSnapshot {
        let mut blocks: Vec<BlockSnapshot> = self
            .live_block_ids()
            .map(|id| {
                let block = &self.blocks[id];
                BlockSnapshot {
                    id,
                    coords: block.coords(&self.grid),
                    target: block.target_tile.map(|t| self.grid.tile(t).coords()),
                    life_cycle: block.life_cycle,
                    is_error_block: block.is_error_block,
                }
            })
            .collect();
        blocks.sort_by_key(|b| b.id);

        SwarmSnapshot {
            status: self.state.status(),
            result: self.state.result(),
            cycle_index: self.cycle_index,
            occupied: self
                .grid
                .tiles
                .iter()
                .filter(|t| t.is_occupied)
                .map(|t| t.coords())
                .collect(),
            reserved: self
                .grid
                .tiles
                .iter()
                .filter(|t| t.will_be_occupied)
                .map(|t| t.coords())
                .collect(),
            blocks,
        }
    }
}
