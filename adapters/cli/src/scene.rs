//! Demo terrain the headless simulation runs on.

use blight_core::{Material, Position};
use blight_world::GridTerrain;

const TRUNK_HEIGHT: i32 = 4;

/// Builds a square meadow of the given half extent with its surface at height zero.
///
/// Grass over dirt over stone on a bedrock floor, with a small pond and a
/// few oak trees.
pub(crate) fn meadow(half: i32) -> GridTerrain {
    let half = half.max(4);
    let terrain = GridTerrain::new();
    let layers = [
        (-6, -6, Material::Bedrock),
        (-5, -4, Material::Stone),
        (-3, -1, Material::Dirt),
        (0, 0, Material::GrassBlock),
    ];
    for (bottom, top, material) in layers {
        terrain.fill(
            Position::at(-half, bottom, -half),
            Position::at(half, top, half),
            material,
        );
    }

    let pond = half / 2;
    terrain.fill(
        Position::at(pond, -1, -pond - 2),
        Position::at(pond + 2, 0, -pond),
        Material::Water,
    );

    for (x, z) in [(-pond, -pond), (-pond, pond), (pond, pond), (2, -pond)] {
        plant_oak(&terrain, Position::at(x, 0, z));
    }
    terrain
}

fn plant_oak(terrain: &GridTerrain, ground: Position) {
    terrain.fill(
        ground.offset(0, 1, 0),
        ground.offset(0, TRUNK_HEIGHT, 0),
        Material::OakLog,
    );
    for dx in -2..=2_i32 {
        for dz in -2..=2_i32 {
            for dy in TRUNK_HEIGHT - 1..=TRUNK_HEIGHT + 1 {
                if dx.abs() == 2 && dz.abs() == 2 {
                    continue;
                }
                let leaf = ground.offset(dx, dy, dz);
                if terrain.peek(leaf).is_empty() {
                    terrain.place(leaf, Material::OakLeaves);
                }
            }
        }
    }
}
