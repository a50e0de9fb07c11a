//! Brick layout
//!
//! Bricks fill a fixed-width grid row by row from the top of the field. The
//! last row may be partial. A random subset of cells is promoted to special
//! kinds.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;

use super::state::{BrickId, BrickKind};
use crate::Rect;
use crate::consts::*;
use crate::error::ConfigError;
use crate::settings::Settings;

/// Grid geometry for a given brick count and field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrickGrid {
    pub rows: u16,
    pub columns: u16,
    /// Number of occupied cells (row-major from the top-left)
    pub bricks: u32,
    pub brick_size: Vec2,
}

impl BrickGrid {
    /// Counts beyond what a `u16` row index can address are cut to the
    /// cells that exist, so `bricks` always matches `cells().count()`.
    pub fn for_field(total_bricks: u32, field: &Rect) -> Self {
        let columns = BRICK_COLUMNS;
        let rows = u16::try_from(total_bricks.div_ceil(columns as u32)).unwrap_or(u16::MAX);
        let width = (field.width() - BRICK_GAP * (columns as f32 + 1.0)) / columns as f32;
        Self {
            rows,
            columns,
            bricks: total_bricks.min(rows as u32 * columns as u32),
            brick_size: Vec2::new(width.max(0.0), BRICK_HEIGHT),
        }
    }

    /// Row-major index of a cell
    pub fn cell_index(&self, id: BrickId) -> u32 {
        id.row as u32 * self.columns as u32 + id.column as u32
    }

    /// Whether the cell holds a brick
    pub fn is_occupied(&self, id: BrickId) -> bool {
        id.row < self.rows && id.column < self.columns && self.cell_index(id) < self.bricks
    }

    /// Occupied cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = BrickId> + '_ {
        (0..self.rows)
            .flat_map(move |row| (0..self.columns).map(move |column| BrickId::new(row, column)))
            .filter(move |id| self.is_occupied(*id))
    }

    /// Frame of a cell; row 0 sits `BRICK_TOP_OFFSET` below the top edge
    pub fn frame(&self, id: BrickId, field: &Rect) -> Rect {
        let step = self.brick_size + Vec2::splat(BRICK_GAP);
        let left = field.min.x + BRICK_GAP + step.x * id.column as f32;
        let top = field.max.y - BRICK_TOP_OFFSET - step.y * id.row as f32;
        Rect::new(
            Vec2::new(left, top - self.brick_size.y),
            Vec2::new(left + self.brick_size.x, top),
        )
    }
}

/// Choose `special` distinct occupied cells
///
/// Rejection sampling over random (row, column) pairs; the count is checked
/// up front so the loop always terminates.
pub fn pick_special_cells<R: Rng>(
    rng: &mut R,
    grid: &BrickGrid,
    special: u32,
) -> Result<BTreeSet<BrickId>, ConfigError> {
    let total = grid.cells().count() as u32;
    if special > total {
        return Err(ConfigError::TooManySpecialBricks { special, total });
    }

    let mut picked = BTreeSet::new();
    while (picked.len() as u32) < special {
        let id = BrickId::new(
            rng.random_range(0..grid.rows),
            rng.random_range(0..grid.columns),
        );
        if grid.is_occupied(id) {
            picked.insert(id);
        }
    }
    Ok(picked)
}

/// A brick to be placed on reset
#[derive(Debug, Clone, PartialEq)]
pub struct BrickSpec {
    pub id: BrickId,
    pub kind: BrickKind,
    pub frame: Rect,
}

/// Build the full brick layout for the current settings
pub fn build_bricks<R: Rng>(
    rng: &mut R,
    settings: &Settings,
    field: &Rect,
) -> Result<Vec<BrickSpec>, ConfigError> {
    settings.validate()?;
    let grid = BrickGrid::for_field(settings.total_bricks, field);

    let kinds = settings.enabled_special_kinds();
    let special = if kinds.is_empty() {
        if settings.special_bricks > 0 {
            log::warn!(
                "{} special bricks requested but no special types enabled, all bricks regular",
                settings.special_bricks
            );
        }
        BTreeSet::new()
    } else {
        pick_special_cells(rng, &grid, settings.special_bricks)?
    };

    let specs = grid
        .cells()
        .map(|id| {
            let kind = if special.contains(&id) {
                kinds[rng.random_range(0..kinds.len())]
            } else {
                BrickKind::Regular
            };
            BrickSpec {
                id,
                kind,
                frame: grid.frame(id, field),
            }
        })
        .collect();
    Ok(specs)
}
