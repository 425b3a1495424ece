//! Board tiles and the padded grid that owns them
//!
//! Coordinates are signed with the origin at the board centre. The logical
//! board spans `-GRID_RADIUS..=GRID_RADIUS`; one extra padding ring makes
//! every board tile's orthogonal neighbourhood complete.

use glam::IVec2;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::consts::*;

/// Index of a tile inside [`TileGrid`]
pub type TileId = usize;

/// One grid cell
#[derive(Debug, Clone)]
pub struct Tile {
    pub id: TileId,
    pub row: i32,
    pub col: i32,
    /// Euclidean distance from the centre
    pub distance: f32,
    /// Path precedence, highest at the centre
    pub priority: f32,
    /// Chebyshev ring (0 = main tile, GRID_RADIUS = border, PADDED_RADIUS = padding)
    pub ring_index: i32,
    pub is_main: bool,
    pub is_border: bool,
    pub is_padding: bool,

    pub is_occupied: bool,
    /// Reserved by a block that is moving here this cycle
    pub will_be_occupied: bool,
    /// Visual intensity written by blocks each frame
    pub active_ratio: f32,

    /// Up to 8 surrounding tiles
    pub neighbours: Vec<TileId>,
    /// Orthogonal neighbours only
    pub reachable_neighbours: Vec<TileId>,
    /// `reachable_neighbours` ordered most central first
    pub priority_sorted_reachable_neighbours: Vec<TileId>,
}

impl Tile {
    fn new(id: TileId, row: i32, col: i32) -> Self {
        let distance = ((row * row + col * col) as f32).sqrt();
        let ring_index = row.abs().max(col.abs());
        Self {
            id,
            row,
            col,
            distance,
            priority: 1.0 / (1.0 + distance),
            ring_index,
            is_main: row == 0 && col == 0,
            is_border: ring_index == GRID_RADIUS,
            is_padding: ring_index > GRID_RADIUS,
            is_occupied: false,
            will_be_occupied: false,
            active_ratio: 0.0,
            neighbours: Vec::with_capacity(8),
            reachable_neighbours: Vec::with_capacity(4),
            priority_sorted_reachable_neighbours: Vec::with_capacity(4),
        }
    }

    #[inline]
    pub fn coords(&self) -> IVec2 {
        IVec2::new(self.col, self.row)
    }

    /// On-board and neither occupied nor reserved
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.is_padding && !self.is_occupied && !self.will_be_occupied
    }

    fn reset(&mut self) {
        self.is_occupied = false;
        self.will_be_occupied = false;
        self.active_ratio = 0.0;
    }
}

/// Owns every tile of the padded board
#[derive(Debug, Clone)]
pub struct TileGrid {
    pub tiles: Vec<Tile>,
    pub main_tile: TileId,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl TileGrid {
    /// Build all tiles and their neighbour lists
    pub fn new() -> Self {
        let mut tiles = Vec::with_capacity(TILE_COUNT);
        for row in -PADDED_RADIUS..=PADDED_RADIUS {
            for col in -PADDED_RADIUS..=PADDED_RADIUS {
                tiles.push(Tile::new(tiles.len(), row, col));
            }
        }

        let mut grid = Self {
            tiles,
            main_tile: tile_index(0, 0),
        };
        grid.init();
        grid
    }

    fn init(&mut self) {
        for id in 0..self.tiles.len() {
            let (row, col) = (self.tiles[id].row, self.tiles[id].col);
            let mut neighbours = Vec::with_capacity(8);
            let mut reachable = Vec::with_capacity(4);
            for dr in -1..=1 {
                for dc in -1..=1 {
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    if let Some(n) = self.tile_id(row + dr, col + dc) {
                        neighbours.push(n);
                        if dr == 0 || dc == 0 {
                            reachable.push(n);
                        }
                    }
                }
            }
            let sorted = self.sorted_by_priority(&reachable);
            let tile = &mut self.tiles[id];
            tile.neighbours = neighbours;
            tile.reachable_neighbours = reachable;
            tile.priority_sorted_reachable_neighbours = sorted;
        }
    }

    /// Bounds-checked id lookup over the padded range
    pub fn tile_id(&self, row: i32, col: i32) -> Option<TileId> {
        if row.abs() > PADDED_RADIUS || col.abs() > PADDED_RADIUS {
            return None;
        }
        Some(tile_index(row, col))
    }

    pub fn get_tile(&self, row: i32, col: i32) -> Option<&Tile> {
        self.tile_id(row, col).map(|id| &self.tiles[id])
    }

    pub fn get_tile_mut(&mut self, row: i32, col: i32) -> Option<&mut Tile> {
        self.tile_id(row, col).map(move |id| &mut self.tiles[id])
    }

    #[inline]
    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id]
    }

    #[inline]
    pub fn tile_mut(&mut self, id: TileId) -> &mut Tile {
        &mut self.tiles[id]
    }

    pub fn main_tile(&self) -> &Tile {
        &self.tiles[self.main_tile]
    }

    /// A block may move onto this tile right now
    #[inline]
    pub fn is_available(&self, id: TileId) -> bool {
        let tile = &self.tiles[id];
        tile.is_free() && !tile.is_main
    }

    /// Uniform pick among free board tiles, `None` when the board is full
    pub fn get_random_free_tile<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<TileId> {
        let free: Vec<TileId> = self
            .tiles
            .iter()
            .filter(|t| t.is_free())
            .map(|t| t.id)
            .collect();
        if free.is_empty() {
            None
        } else {
            Some(free[rng.random_range(0..free.len())])
        }
    }

    pub fn free_tile_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_free()).count()
    }

    /// Shuffle a tile's reachable neighbours and rebuild its priority order
    pub fn shuffle_neighbours<R: Rng + ?Sized>(&mut self, id: TileId, rng: &mut R) {
        let mut reachable = std::mem::take(&mut self.tiles[id].reachable_neighbours);
        reachable.shuffle(rng);
        let sorted = self.sorted_by_priority(&reachable);
        let tile = &mut self.tiles[id];
        tile.reachable_neighbours = reachable;
        tile.priority_sorted_reachable_neighbours = sorted;
    }

    /// Stable sort, so equal priorities keep their shuffled order
    fn sorted_by_priority(&self, ids: &[TileId]) -> Vec<TileId> {
        let mut sorted = ids.to_vec();
        sorted.sort_by(|a, b| self.tiles[*b].priority.total_cmp(&self.tiles[*a].priority));
        sorted
    }

    /// Clear occupancy between runs
    pub fn reset(&mut self) {
        for tile in &mut self.tiles {
            tile.reset();
        }
    }

    /// Zero per-frame fields before blocks write into them
    pub fn pre_update(&mut self, _dt: f32) {
        for tile in &mut self.tiles {
            tile.active_ratio = 0.0;
        }
    }

    /// Per-tile hook after blocks have written this frame
    pub fn update(&mut self, _dt: f32) {
        for tile in &mut self.tiles {
            tile.active_ratio = tile.active_ratio.clamp(0.0, 1.0);
        }
    }

    /// Board tiles (padding excluded)
    pub fn board_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(|t| !t.is_padding)
    }
}

#[inline]
fn tile_index(row: i32, col: i32) -> TileId {
    ((row + PADDED_RADIUS) as usize) * PADDED_SIZE + (col + PADDED_RADIUS) as usize
}
