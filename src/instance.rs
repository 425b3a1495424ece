//! Per-frame records for the renderer
//!
//! Plain `Pod` structs so a host can upload them straight into an
//! instanced vertex buffer. Coordinates are board units (x = col, y = row).

use bytemuck::{Pod, Zeroable};

use crate::settings::Properties;
use crate::sim::{Block, Tile, TileGrid};

pub const TILE_FLAG_MAIN: u32 = 1;
pub const TILE_FLAG_BORDER: u32 = 1 << 1;
pub const TILE_FLAG_PADDING: u32 = 1 << 2;
pub const TILE_FLAG_OCCUPIED: u32 = 1 << 3;

pub const BLOCK_FLAG_SPAWNED: u32 = 1;
pub const BLOCK_FLAG_MOVING: u32 = 1 << 1;
pub const BLOCK_FLAG_ERROR: u32 = 1 << 2;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TileInstance {
    pub coords: [f32; 2],
    pub active_ratio: f32,
    pub flags: u32,
}

impl TileInstance {
    pub fn from_tile(tile: &Tile) -> Self {
        let mut flags = 0;
        if tile.is_main {
            flags |= TILE_FLAG_MAIN;
        }
        if tile.is_border {
            flags |= TILE_FLAG_BORDER;
        }
        if tile.is_padding {
            flags |= TILE_FLAG_PADDING;
        }
        if tile.is_occupied {
            flags |= TILE_FLAG_OCCUPIED;
        }
        Self {
            coords: tile.coords().as_vec2().to_array(),
            active_ratio: tile.active_ratio,
            flags,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlockInstance {
    /// Owned tile
    pub coords: [f32; 2],
    /// Step towards the target tile, or the fall edge for the error block
    pub direction: [f32; 2],
    pub spawn_ratio: f32,
    /// Eased move progress along `direction`
    pub move_ratio: f32,
    pub error_pre_fall_ratio: f32,
    pub error_fall_ratio: f32,
    /// Stable pool slot
    pub id: u32,
    pub flags: u32,
}

impl BlockInstance {
    pub fn from_block(block: &Block, grid: &TileGrid, properties: &Properties) -> Self {
        let mut flags = 0;
        if block.has_been_spawned {
            flags |= BLOCK_FLAG_SPAWNED;
        }
        if block.is_moving {
            flags |= BLOCK_FLAG_MOVING;
        }
        if block.is_error_block {
            flags |= BLOCK_FLAG_ERROR;
        }
        let coords = block.coords(grid).unwrap_or_default();
        Self {
            coords: coords.as_vec2().to_array(),
            direction: block.direction(grid).to_array(),
            spawn_ratio: block.spawn_animation_ratio,
            move_ratio: if block.is_moving {
                block.eased_animation_ratio
            } else {
                0.0
            },
            error_pre_fall_ratio: block.error_pre_fall_ratio(properties),
            error_fall_ratio: block.error_fall_ratio(properties),
            id: block.id as u32,
            flags,
        }
    }
}
