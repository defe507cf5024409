//! Terrain materials and the static spread susceptibility table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Terrain-type identifier of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    /// Empty space; also the original value recorded for cells grown from nothing.
    Air,
    /// Liquid water.
    Water,
    /// Liquid lava.
    Lava,
    /// Loose sand.
    Sand,
    /// Indestructible floor.
    Bedrock,
    /// Volcanic glass.
    Obsidian,
    /// Grass-covered soil.
    GrassBlock,
    /// Bare soil.
    Dirt,
    /// Gravelly soil.
    CoarseDirt,
    /// Forest floor soil.
    Podzol,
    /// Fungal soil.
    Mycelium,
    /// Moss carpet block.
    MossBlock,
    /// Soil threaded with roots.
    RootedDirt,
    /// Oak trunk.
    OakLog,
    /// Birch trunk.
    BirchLog,
    /// Spruce trunk.
    SpruceLog,
    /// Jungle trunk.
    JungleLog,
    /// Acacia trunk.
    AcaciaLog,
    /// Dark oak trunk.
    DarkOakLog,
    /// Cherry trunk.
    CherryLog,
    /// Mangrove trunk.
    MangroveLog,
    /// Oak bark block.
    OakWood,
    /// Birch bark block.
    BirchWood,
    /// Spruce bark block.
    SpruceWood,
    /// Jungle bark block.
    JungleWood,
    /// Acacia bark block.
    AcaciaWood,
    /// Dark oak bark block.
    DarkOakWood,
    /// Oak foliage.
    OakLeaves,
    /// Birch foliage.
    BirchLeaves,
    /// Spruce foliage.
    SpruceLeaves,
    /// Jungle foliage.
    JungleLeaves,
    /// Acacia foliage.
    AcaciaLeaves,
    /// Dark oak foliage.
    DarkOakLeaves,
    /// Cherry foliage.
    CherryLeaves,
    /// Mangrove foliage.
    MangroveLeaves,
    /// Azalea foliage.
    AzaleaLeaves,
    /// Flowering azalea foliage.
    FloweringAzaleaLeaves,
    /// Plain stone.
    Stone,
    /// Broken stone.
    Cobblestone,
    /// Overgrown broken stone.
    MossyCobblestone,
    /// Dressed stone.
    StoneBricks,
    /// Overgrown dressed stone.
    MossyStoneBricks,
    /// Andesite.
    Andesite,
    /// Diorite.
    Diorite,
    /// Granite.
    Granite,
    /// Deep stone.
    Deepslate,
    /// Volcanic tuff.
    Tuff,
    /// Calcite.
    Calcite,
    /// Tilled soil.
    Farmland,
    /// Trodden path.
    DirtPath,
    /// Wet mud.
    Mud,
    /// Dried mud.
    PackedMud,
    /// Mangrove roots sunk in mud.
    MuddyMangroveRoots,
    /// Base corruption written over converted cells.
    Blight,
    /// Creeping surface growth.
    BlightVein,
    /// Listening growth.
    BlightSensor,
    /// Screaming growth.
    BlightAlarm,
    /// Host material the engine has no dedicated variant for.
    Other(u16),
}

impl Material {
    /// Reports whether the material is empty space.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Reports whether the material is one of the corruption materials.
    #[must_use]
    pub const fn is_blight(self) -> bool {
        matches!(
            self,
            Self::Blight | Self::BlightVein | Self::BlightSensor | Self::BlightAlarm
        )
    }

    /// Default solidity used when hosts do not override it.
    ///
    /// Liquids, empty space and veins do not obstruct growth; unknown host
    /// materials are treated as solid.
    #[must_use]
    pub const fn is_solid(self) -> bool {
        !matches!(self, Self::Air | Self::Water | Self::Lava | Self::BlightVein)
    }
}

/// Base susceptibility weight of every spreadable material.
const fn builtin_weight(material: Material) -> Option<f64> {
    let weight = match material {
        Material::GrassBlock => 1.4,
        Material::Dirt => 1.3,
        Material::CoarseDirt => 1.2,
        Material::Podzol => 1.5,
        Material::Mycelium => 1.6,
        Material::MossBlock => 1.8,
        Material::RootedDirt => 1.4,

        Material::OakLog
        | Material::BirchLog
        | Material::SpruceLog
        | Material::AcaciaLog => 1.5,
        Material::JungleLog => 1.6,
        Material::DarkOakLog => 1.7,
        Material::CherryLog => 1.4,
        Material::MangroveLog => 1.8,
        Material::OakWood | Material::BirchWood | Material::SpruceWood | Material::AcaciaWood => {
            1.4
        }
        Material::JungleWood => 1.5,
        Material::DarkOakWood => 1.6,

        Material::OakLeaves
        | Material::BirchLeaves
        | Material::SpruceLeaves
        | Material::AcaciaLeaves => 1.8,
        Material::JungleLeaves | Material::DarkOakLeaves | Material::AzaleaLeaves => 1.9,
        Material::CherryLeaves => 1.7,
        Material::MangroveLeaves | Material::FloweringAzaleaLeaves => 2.0,

        Material::Stone | Material::Calcite => 0.8,
        Material::Cobblestone => 0.9,
        Material::MossyCobblestone => 1.2,
        Material::StoneBricks | Material::Tuff => 0.7,
        Material::MossyStoneBricks => 1.1,
        Material::Andesite | Material::Diorite | Material::Granite => 0.6,
        Material::Deepslate => 0.5,

        Material::Farmland => 1.6,
        Material::DirtPath => 1.4,
        Material::Mud => 1.7,
        Material::PackedMud => 1.5,
        Material::MuddyMangroveRoots => 1.8,

        _ => return None,
    };
    Some(weight)
}

/// Mapping from material to base spread susceptibility.
///
/// Materials absent from the table are never queued for conversion. Overrides
/// replace the built-in weight; a non-positive override removes the material
/// from the table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpreadWeights {
    overrides: BTreeMap<Material, f64>,
}

impl SpreadWeights {
    /// Creates the built-in table without overrides.
    #[must_use]
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Creates a table applying the provided per-material overrides.
    #[must_use]
    pub fn with_overrides<I>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (Material, f64)>,
    {
        Self {
            overrides: overrides.into_iter().collect(),
        }
    }

    /// Base weight of the material, or `None` when it cannot be corrupted.
    #[must_use]
    pub fn weight(&self, material: Material) -> Option<f64> {
        let weight = match self.overrides.get(&material) {
            Some(weight) => Some(*weight),
            None => builtin_weight(material),
        }?;
        (weight > 0.0).then_some(weight)
    }

    /// Reports whether the material appears in the table.
    #[must_use]
    pub fn is_spreadable(&self, material: Material) -> bool {
        self.weight(material).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{Material, SpreadWeights};

    #[test]
    fn organic_materials_outweigh_stone() {
        let weights = SpreadWeights::builtin();
        let grass = weights.weight(Material::GrassBlock).expect("grass spreads");
        let deepslate = weights.weight(Material::Deepslate).expect("deepslate spreads");
        assert!(grass > deepslate);
    }

    #[test]
    fn corruption_and_empty_space_are_not_spreadable() {
        let weights = SpreadWeights::builtin();
        for material in [
            Material::Air,
            Material::Blight,
            Material::BlightVein,
            Material::Bedrock,
            Material::Other(42),
        ] {
            assert!(!weights.is_spreadable(material), "{material:?}");
        }
    }

    #[test]
    fn overrides_replace_and_remove_entries() {
        let weights =
            SpreadWeights::with_overrides([(Material::Sand, 0.4), (Material::GrassBlock, 0.0)]);
        assert_eq!(weights.weight(Material::Sand), Some(0.4));
        assert!(!weights.is_spreadable(Material::GrassBlock));
        assert_eq!(weights.weight(Material::Dirt), Some(1.3));
    }

    #[test]
    fn veins_do_not_obstruct() {
        assert!(!Material::BlightVein.is_solid());
        assert!(Material::Blight.is_solid());
        assert!(Material::Blight.is_blight());
        assert!(!Material::Stone.is_blight());
    }
}
