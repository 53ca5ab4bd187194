use std::collections::{BTreeSet, HashSet};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::Position;

bitflags! {
    /// Per-tile classification bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TileFlags: u8 {
        const GROUND = 0b0000_0001;
        const RIVER = 0b0000_0010;
        const BLOCKING = 0b0000_0100;
    }
}

impl TileFlags {
    pub fn glyph(self) -> char {
        if self.contains(TileFlags::RIVER) {
            '~'
        } else if self.contains(TileFlags::BLOCKING) {
            '#'
        } else if self.contains(TileFlags::GROUND) {
            '.'
        } else {
            ' '
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '~' => Some(TileFlags::RIVER),
            '.' => Some(TileFlags::GROUND),
            '#' => Some(TileFlags::GROUND | TileFlags::BLOCKING),
            ' ' | '_' => Some(TileFlags::empty()),
            _ => None,
        }
    }
}

/// Terrain queries the flood engine needs from its host.
pub trait TerrainClassifier {
    fn in_bounds(&self, position: Position) -> bool;
    fn is_river(&self, position: Position) -> bool;
    /// Has ground and is not a river tile.
    fn is_land(&self, position: Position) -> bool;
    /// Raw obstacle tiles used to build the [`TerrainBlockIndex`].
    fn blocking_positions(&self) -> Vec<Position>;
}

/// Largest accepted grid side; keeps cell indices within `i32`.
pub const MAX_GRID_SIDE: u32 = 16_384;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TerrainParseError {
    #[error("terrain map has no rows")]
    Empty,
    #[error("terrain map is {width}x{height}, sides are limited to {max}", max = MAX_GRID_SIDE)]
    TooLarge { width: usize, height: usize },
    #[error("row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown terrain glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
}

/// Dense rectangular terrain backed by [`TileFlags`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainGrid {
    width: u32,
    height: u32,
    tiles: Vec<TileFlags>,
}

impl TerrainGrid {
    /// Grid of plain land.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TileFlags::GROUND)
    }

    /// Sides beyond [`MAX_GRID_SIDE`] are clamped to it.
    pub fn filled(width: u32, height: u32, flags: TileFlags) -> Self {
        let width = width.min(MAX_GRID_SIDE);
        let height = height.min(MAX_GRID_SIDE);
        Self {
            width,
            height,
            tiles: vec![flags; width as usize * height as usize],
        }
    }

    /// Parses rows of `~` (river), `.` (land), `#` (obstacle) and ` `/`_` (open).
    pub fn from_ascii<S: AsRef<str>>(rows: &[S]) -> Result<Self, TerrainParseError> {
        let first = rows.first().ok_or(TerrainParseError::Empty)?;
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(TerrainParseError::Empty);
        }
        let limit = MAX_GRID_SIDE as usize;
        if width > limit || rows.len() > limit {
            return Err(TerrainParseError::TooLarge {
                width,
                height: rows.len(),
            });
        }

        let mut tiles = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != width {
                return Err(TerrainParseError::RaggedRow {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let flags = TileFlags::from_glyph(glyph)
                    .ok_or(TerrainParseError::UnknownGlyph { glyph, x, y })?;
                tiles.push(flags);
            }
        }

        Ok(Self {
            width: width as u32,
            height: rows.len() as u32,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn index(&self, position: Position) -> Option<usize> {
        if position.x < 0 || position.y < 0 {
            return None;
        }
        let (x, y) = (position.x as u32, position.y as u32);
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Flags at `position`; empty when out of bounds.
    pub fn flags(&self, position: Position) -> TileFlags {
        self.index(position)
            .map(|idx| self.tiles[idx])
            .unwrap_or_default()
    }

    pub fn set(&mut self, position: Position, flags: TileFlags) -> bool {
        match self.index(position) {
            Some(idx) => {
                self.tiles[idx] = flags;
                true
            }
            None => false,
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let width = self.width as usize;
        (0..self.tiles.len())
            .map(move |idx| Position::new((idx % width) as i32, (idx / width) as i32))
    }

    pub fn river_positions(&self) -> Vec<Position> {
        self.positions().filter(|&p| self.is_river(p)).collect()
    }

    /// Renders the grid, drawing flooded tiles as `W`.
    pub fn render_ascii(&self, flooded: &BTreeSet<Position>) -> String {
        let mut out = String::with_capacity((self.width as usize + 1) * self.height as usize);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let position = Position::new(x, y);
                if flooded.contains(&position) {
                    out.push('W');
                } else {
                    out.push(self.flags(position).glyph());
                }
            }
            out.push('\n');
        }
        out
    }
}

impl TerrainClassifier for TerrainGrid {
    fn in_bounds(&self, position: Position) -> bool {
        self.index(position).is_some()
    }

    fn is_river(&self, position: Position) -> bool {
        self.flags(position).contains(TileFlags::RIVER)
    }

    fn is_land(&self, position: Position) -> bool {
        let flags = self.flags(position);
        flags.contains(TileFlags::GROUND) && !flags.contains(TileFlags::RIVER)
    }

    fn blocking_positions(&self) -> Vec<Position> {
        self.positions()
            .filter(|&p| self.flags(p).contains(TileFlags::BLOCKING))
            .collect()
    }
}

/// Positions where flood spread is suppressed: the square (Chebyshev)
/// neighbourhood of every blocking tile. Rebuilt wholesale on terrain change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerrainBlockIndex {
    blocked: HashSet<Position>,
}

impl TerrainBlockIndex {
    pub fn build<I>(blocking_positions: I, radius: i32) -> Self
    where
        I: IntoIterator<Item = Position>,
    {
        let mut blocked = HashSet::new();
        if radius < 0 {
            return Self { blocked };
        }
        for origin in blocking_positions {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    blocked.insert(origin.offset(dx, dy));
                }
            }
        }
        Self { blocked }
    }

    pub fn from_terrain<T: TerrainClassifier + ?Sized>(terrain: &T, radius: i32) -> Self {
        Self::build(terrain.blocking_positions(), radius)
    }

    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        self.blocked.contains(&position)
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.blocked.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trip_classifies_tiles() {
        let grid = TerrainGrid::from_ascii(&["~.#", "_.."]).expect("valid map");
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert!(grid.is_river(Position::new(0, 0)));
        assert!(!grid.is_land(Position::new(0, 0)));
        assert!(grid.is_land(Position::new(1, 0)));
        assert!(grid.is_land(Position::new(2, 0)));
        assert!(!grid.is_land(Position::new(0, 1)));
        assert!(!grid.is_river(Position::new(0, 1)));
        assert_eq!(grid.blocking_positions(), vec![Position::new(2, 0)]);
        assert_eq!(grid.render_ascii(&BTreeSet::new()), "~.#\n ..\n");
    }

    #[test]
    fn ascii_rejects_ragged_rows_and_unknown_glyphs() {
        assert_eq!(
            TerrainGrid::from_ascii(&["...", ".."]),
            Err(TerrainParseError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            TerrainGrid::from_ascii(&[".x"]),
            Err(TerrainParseError::UnknownGlyph {
                glyph: 'x',
                x: 1,
                y: 0
            })
        );
        let empty: [&str; 0] = [];
        assert_eq!(TerrainGrid::from_ascii(&empty), Err(TerrainParseError::Empty));
    }

    #[test]
    fn oversized_grids_are_clamped_or_rejected() {
        let grid = TerrainGrid::new(MAX_GRID_SIDE + 1, 2);
        assert_eq!(grid.width(), MAX_GRID_SIDE);
        assert!(grid.in_bounds(Position::new(MAX_GRID_SIDE as i32 - 1, 1)));
        assert!(!grid.in_bounds(Position::new(MAX_GRID_SIDE as i32, 1)));

        let wide = ".".repeat(MAX_GRID_SIDE as usize + 1);
        assert_eq!(
            TerrainGrid::from_ascii(&[wide.as_str()]),
            Err(TerrainParseError::TooLarge {
                width: MAX_GRID_SIDE as usize + 1,
                height: 1
            })
        );
    }

    #[test]
    fn bounds_reject_negative_and_overflowing_positions() {
        let grid = TerrainGrid::new(4, 3);
        assert!(grid.in_bounds(Position::new(3, 2)));
        assert!(!grid.in_bounds(Position::new(4, 2)));
        assert!(!grid.in_bounds(Position::new(0, 3)));
        assert!(!grid.in_bounds(Position::new(-1, 0)));
        assert!(grid.flags(Position::new(-1, 0)).is_empty());
    }

    #[test]
    fn block_index_covers_chebyshev_square() {
        let index = TerrainBlockIndex::build([Position::new(5, 5)], 1);
        assert_eq!(index.len(), 9);
        assert!(index.contains(Position::new(4, 4)));
        assert!(index.contains(Position::new(6, 6)));
        assert!(index.contains(Position::new(5, 5)));
        assert!(!index.contains(Position::new(7, 5)));

        let radius_two = TerrainBlockIndex::build([Position::new(0, 0)], 2);
        assert_eq!(radius_two.len(), 25);
        assert!(radius_two.iter().all(|p| p.chebyshev_distance(Position::new(0, 0)) <= 2));
    }

    #[test]
    fn block_index_radius_zero_is_just_the_obstacles() {
        let index = TerrainBlockIndex::build([Position::new(1, 1), Position::new(1, 2)], 0);
        assert_eq!(index.len(), 2);
        assert!(!index.contains(Position::new(0, 1)));
    }

    #[test]
    fn block_index_overlapping_obstacles_deduplicate() {
        let index = TerrainBlockIndex::build([Position::new(0, 0), Position::new(1, 0)], 1);
        assert_eq!(index.len(), 12);
    }

    #[test]
    fn block_index_from_terrain_uses_blocking_tiles() {
        let grid = TerrainGrid::from_ascii(&[".....", "..#..", "....."]).expect("valid map");
        let index = TerrainBlockIndex::from_terrain(&grid, 1);
        assert_eq!(index.len(), 9);
        assert!(index.contains(Position::new(1, 0)));
        assert!(!index.contains(Position::new(0, 0)));
    }

    #[test]
    fn negative_radius_builds_empty_index() {
        let index = TerrainBlockIndex::build([Position::new(0, 0)], -1);
        assert!(index.is_empty());
    }
}
