use std::collections::VecDeque;

use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

use crate::{
    position::{Position, CARDINAL_OFFSETS},
    terrain::{TerrainGrid, TileFlags},
};

/// Land with a meandering north-south river, scattered rock outcrops and a
/// few open marsh pockets next to the river.
pub fn build_demo_terrain(width: u32, height: u32, seed: u64) -> TerrainGrid {
    let mut grid = TerrainGrid::new(width, height);
    if width == 0 || height == 0 {
        return grid;
    }
    let mut rng = SmallRng::seed_from_u64(seed ^ 0x7f1a_d00d);

    let river = carve_river(&mut grid, &mut rng);
    place_marshes(&mut grid, &mut rng, &river);
    place_outcrops(&mut grid, &mut rng);
    grid
}

fn carve_river(grid: &mut TerrainGrid, rng: &mut SmallRng) -> Vec<Position> {
    let width = grid.width() as i32;
    let height = grid.height() as i32;
    let mut x = width / 2;
    let mut path = Vec::with_capacity(height as usize);
    for y in 0..height {
        let drift = rng.gen_range(-1..=1);
        x = (x + drift).clamp(0, width - 1);
        let position = Position::new(x, y);
        grid.set(position, TileFlags::RIVER);
        path.push(position);
        // Wider stretches where the bank erodes.
        if width > 4 && rng.gen_bool(0.3) {
            grid.set(position.offset(1, 0), TileFlags::RIVER);
        }
    }
    path
}

fn place_marshes(grid: &mut TerrainGrid, rng: &mut SmallRng, river: &[Position]) {
    const MARSH_CELLS: usize = 5;
    let pockets = (river.len() / 12).max(1);
    for _ in 0..pockets {
        let Some(&anchor) = river.get(rng.gen_range(0..river.len())) else {
            continue;
        };
        let side = if rng.gen_bool(0.5) { -2 } else { 2 };
        let start = anchor.offset(side, 0);
        grow_patch(grid, rng, start, MARSH_CELLS, TileFlags::empty());
    }
}

fn place_outcrops(grid: &mut TerrainGrid, rng: &mut SmallRng) {
    const OUTCROP_CELLS: usize = 3;
    let land: Vec<Position> = grid
        .positions()
        .filter(|&p| grid.flags(p) == TileFlags::GROUND)
        .collect();
    let outcrops = (land.len() / 150).max(1);
    for _ in 0..outcrops {
        let Some(&start) = land.choose(rng) else {
            return;
        };
        grow_patch(
            grid,
            rng,
            start,
            OUTCROP_CELLS,
            TileFlags::GROUND | TileFlags::BLOCKING,
        );
    }
}

/// Breadth-first blob over plain land tiles. Never overwrites the river and
/// never leaves the grid, since out-of-bounds flags are empty.
fn grow_patch(
    grid: &mut TerrainGrid,
    rng: &mut SmallRng,
    start: Position,
    cells: usize,
    flags: TileFlags,
) {
    let mut queue = VecDeque::new();
    queue.push_back(start);
    let mut placed = 0usize;
    while let Some(position) = queue.pop_front() {
        if placed >= cells {
            break;
        }
        if grid.flags(position) != TileFlags::GROUND {
            continue;
        }
        grid.set(position, flags);
        placed += 1;
        let (dx, dy) = CARDINAL_OFFSETS[rng.gen_range(0..CARDINAL_OFFSETS.len())];
        queue.push_back(position.offset(dx, dy));
        for (dx, dy) in CARDINAL_OFFSETS {
            if rng.gen_bool(0.4) {
                queue.push_back(position.offset(dx, dy));
            }
        }
    }
}
