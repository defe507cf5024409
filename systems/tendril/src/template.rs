//! Predefined tendril shapes and the transforms applied when stamping them.

use blight_core::{Material, Position};
use blight_world::TerrainError;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Failure while loading, validating or stamping a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The library holds no template.
    #[error("template library is empty")]
    NoTemplates,
    /// A template without any non-empty cell.
    #[error("template `{0}` has no cells")]
    Empty(String),
    /// A template cell at or below the anchor.
    #[error("template `{name}` places a cell at height {y}; cells must sit above the anchor")]
    BelowAnchor {
        /// Template name.
        name: String,
        /// Offending height.
        y: i32,
    },
    /// Two templates share a name.
    #[error("duplicate template `{0}`")]
    Duplicate(String),
    /// The bounding volume over the anchor holds an obstruction.
    #[error("template `{name}` is obstructed at {position}")]
    Obstructed {
        /// Template name.
        name: String,
        /// First obstructed cell.
        position: Position,
    },
    /// The host refused a write while stamping.
    #[error("failed to stamp template `{name}`: {source}")]
    Write {
        /// Template name.
        name: String,
        /// Host failure.
        #[source]
        source: TerrainError,
    },
    /// The manifest declares a version this build cannot read.
    #[error("unsupported template manifest version {found}; expected {expected}")]
    UnsupportedVersion {
        /// Version found in the manifest.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
    /// A TOML manifest failed to parse.
    #[error("failed to parse template manifest toml: {0}")]
    Toml(#[from] toml::de::Error),
    /// A JSON manifest failed to parse.
    #[error("failed to parse template manifest json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Single cell of a template, relative to the anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCell {
    /// East-west offset.
    pub x: i32,
    /// Height above the anchor; at least one.
    pub y: i32,
    /// North-south offset.
    pub z: i32,
    /// Material written into the cell.
    pub material: Material,
}

impl TemplateCell {
    /// Creates a cell at the provided offset.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32, material: Material) -> Self {
        Self { x, y, z, material }
    }
}

/// Quarter-turn rotation around the vertical axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// No rotation.
    None,
    /// A quarter turn clockwise seen from above.
    Clockwise90,
    /// A half turn.
    Clockwise180,
    /// A quarter turn counter-clockwise seen from above.
    CounterClockwise90,
}

impl Rotation {
    const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::CounterClockwise90,
    ];

    fn apply(self, x: i32, z: i32) -> (i32, i32) {
        match self {
            Self::None => (x, z),
            Self::Clockwise90 => (-z, x),
            Self::Clockwise180 => (-x, -z),
            Self::CounterClockwise90 => (z, -x),
        }
    }
}

/// Reflection applied before rotating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mirror {
    /// No reflection.
    None,
    /// Reflects across the east-west axis.
    LeftRight,
}

/// Orientation of a stamped template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Transform {
    /// Reflection applied first.
    pub mirror: Mirror,
    /// Rotation applied second.
    pub rotation: Rotation,
}

impl Transform {
    /// Orientation that leaves templates unchanged.
    pub const IDENTITY: Transform = Transform {
        mirror: Mirror::None,
        rotation: Rotation::None,
    };

    /// Draws a random rotation and mirror.
    pub fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let rotation = Rotation::ALL[rng.gen_range(0..Rotation::ALL.len())];
        let mirror = if rng.gen_bool(0.5) {
            Mirror::None
        } else {
            Mirror::LeftRight
        };
        Self { mirror, rotation }
    }

    /// Maps a horizontal offset through the mirror and the rotation.
    #[must_use]
    pub fn apply(self, x: i32, z: i32) -> (i32, i32) {
        let z = match self.mirror {
            Mirror::None => z,
            Mirror::LeftRight => -z,
        };
        self.rotation.apply(x, z)
    }
}

/// Named collection of cells grown above an anchor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTemplate")]
pub struct Template {
    name: String,
    cells: Vec<TemplateCell>,
}

#[derive(Deserialize)]
struct RawTemplate {
    name: String,
    cells: Vec<TemplateCell>,
}

impl TryFrom<RawTemplate> for Template {
    type Error = TemplateError;

    fn try_from(raw: RawTemplate) -> Result<Self, Self::Error> {
        Template::new(raw.name, raw.cells)
    }
}

impl Template {
    /// Creates a template, rejecting shapes that are empty or reach below the anchor.
    ///
    /// Cells holding [`Material::Air`] are dropped.
    pub fn new(name: impl Into<String>, cells: Vec<TemplateCell>) -> Result<Self, TemplateError> {
        let name = name.into();
        let cells: Vec<TemplateCell> = cells
            .into_iter()
            .filter(|cell| !cell.material.is_empty())
            .collect();
        if cells.is_empty() {
            return Err(TemplateError::Empty(name));
        }
        if let Some(cell) = cells.iter().find(|cell| cell.y < 1) {
            return Err(TemplateError::BelowAnchor { name, y: cell.y });
        }
        Ok(Self { name, cells })
    }

    /// Name of the template.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cells relative to the anchor, before any transform.
    #[must_use]
    pub fn cells(&self) -> &[TemplateCell] {
        &self.cells
    }

    /// Absolute placements of every cell above `anchor` in the given orientation.
    #[must_use]
    pub fn placements(&self, anchor: Position, transform: Transform) -> Vec<(Position, Material)> {
        self.cells
            .iter()
            .map(|cell| {
                let (x, z) = transform.apply(cell.x, cell.z);
                (anchor.offset(x, cell.y, z), cell.material)
            })
            .collect()
    }

    /// Every position of the axis-aligned box enclosing the oriented template.
    #[must_use]
    pub fn bounding_volume(&self, anchor: Position, transform: Transform) -> Vec<Position> {
        let placements = self.placements(anchor, transform);
        let Some((first, _)) = placements.first() else {
            return Vec::new();
        };

        let mut min = (first.x(), first.y(), first.z());
        let mut max = min;
        for (position, _) in &placements {
            min.0 = min.0.min(position.x());
            min.1 = min.1.min(position.y());
            min.2 = min.2.min(position.z());
            max.0 = max.0.max(position.x());
            max.1 = max.1.max(position.y());
            max.2 = max.2.max(position.z());
        }

        let mut volume = Vec::new();
        for x in min.0..=max.0 {
            for y in min.1..=max.1 {
                for z in min.2..=max.2 {
                    volume.push(Position::new(anchor.region(), x, y, z));
                }
            }
        }
        volume
    }
}

#[derive(Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default)]
    templates: Vec<Template>,
}

/// Templates available to tendril placement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    /// Creates a library without templates; placement then always grows procedurally.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a library holding the five built-in shapes.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            templates: builtin_templates(),
        }
    }

    /// Adds a template, rejecting duplicate names.
    pub fn insert(&mut self, template: Template) -> Result<(), TemplateError> {
        if self.get(template.name()).is_some() {
            return Err(TemplateError::Duplicate(template.name.clone()));
        }
        self.templates.push(template);
        Ok(())
    }

    /// Adds every template of a TOML manifest and returns how many were added.
    ///
    /// A manifest with any clashing name is rejected whole.
    pub fn extend_from_toml(&mut self, contents: &str) -> Result<usize, TemplateError> {
        let manifest: Manifest = toml::from_str(contents)?;
        self.extend_from_manifest(manifest)
    }

    /// Adds every template of a JSON manifest and returns how many were added.
    pub fn extend_from_json(&mut self, contents: &str) -> Result<usize, TemplateError> {
        let manifest: Manifest = serde_json::from_str(contents)?;
        self.extend_from_manifest(manifest)
    }

    fn extend_from_manifest(&mut self, manifest: Manifest) -> Result<usize, TemplateError> {
        if manifest.version != SUPPORTED_MANIFEST_VERSION {
            return Err(TemplateError::UnsupportedVersion {
                found: manifest.version,
                expected: SUPPORTED_MANIFEST_VERSION,
            });
        }

        for (index, template) in manifest.templates.iter().enumerate() {
            let earlier = &manifest.templates[..index];
            if self.get(template.name()).is_some()
                || earlier.iter().any(|other| other.name == template.name)
            {
                return Err(TemplateError::Duplicate(template.name.clone()));
            }
        }

        let added = manifest.templates.len();
        self.templates.extend(manifest.templates);
        Ok(added)
    }

    /// Looks a template up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|template| template.name == name)
    }

    /// Names of every template in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.templates.iter().map(Template::name).collect()
    }

    /// Picks a template uniformly at random.
    pub fn choose<R>(&self, rng: &mut R) -> Result<&Template, TemplateError>
    where
        R: Rng + ?Sized,
    {
        self.templates.choose(rng).ok_or(TemplateError::NoTemplates)
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Reports whether the library holds no template.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn trunk(cells: &mut Vec<TemplateCell>, x: i32, z: i32, from: i32, to: i32) {
    cells.extend((from..=to).map(|y| TemplateCell::new(x, y, z, Material::Blight)));
}

fn branch(cells: &mut Vec<TemplateCell>, y: i32, direction: (i32, i32), length: i32) {
    cells.extend((1..=length).map(|step| {
        TemplateCell::new(direction.0 * step, y, direction.1 * step, Material::Blight)
    }));
}

fn builtin_templates() -> Vec<Template> {
    let mut small = Vec::new();
    trunk(&mut small, 0, 0, 1, 5);
    small.push(TemplateCell::new(1, 1, 0, Material::BlightVein));
    small.push(TemplateCell::new(0, 6, 0, Material::BlightSensor));

    let mut medium = Vec::new();
    trunk(&mut medium, 0, 0, 1, 9);
    branch(&mut medium, 5, (1, 0), 2);
    branch(&mut medium, 7, (0, -1), 2);
    medium.push(TemplateCell::new(-1, 1, 0, Material::BlightVein));
    medium.push(TemplateCell::new(0, 1, 1, Material::BlightVein));
    medium.push(TemplateCell::new(0, 10, 0, Material::BlightAlarm));

    let mut large = Vec::new();
    for (x, z) in [(0, 0), (1, 0), (-1, 0), (0, 1), (0, -1)] {
        trunk(&mut large, x, z, 1, 2);
    }
    trunk(&mut large, 0, 0, 3, 14);
    branch(&mut large, 6, (1, 0), 3);
    branch(&mut large, 6, (-1, 0), 2);
    branch(&mut large, 10, (0, 1), 3);
    branch(&mut large, 10, (0, -1), 2);
    large.push(TemplateCell::new(3, 7, 0, Material::BlightSensor));
    large.push(TemplateCell::new(0, 11, 3, Material::BlightSensor));
    large.push(TemplateCell::new(0, 15, 0, Material::BlightAlarm));

    let mut twisted = Vec::new();
    let spiral = [(0, 0), (1, 0), (1, 1), (0, 1)];
    for y in 1..=11 {
        let (x, z) = spiral[usize::try_from(y / 3).unwrap_or(0) % spiral.len()];
        twisted.push(TemplateCell::new(x, y, z, Material::Blight));
    }
    twisted.push(TemplateCell::new(1, 12, 0, Material::BlightSensor));

    let mut branching = Vec::new();
    trunk(&mut branching, 0, 0, 1, 8);
    for (y, direction) in [(4, (1, 0)), (4, (-1, 0)), (6, (0, 1)), (6, (0, -1))] {
        branch(&mut branching, y, direction, 2);
        branching.push(TemplateCell::new(
            direction.0 * 2,
            y + 1,
            direction.1 * 2,
            Material::BlightSensor,
        ));
    }
    branching.push(TemplateCell::new(0, 9, 0, Material::BlightAlarm));

    [
        ("small", small),
        ("medium", medium),
        ("large", large),
        ("twisted", twisted),
        ("branching", branching),
    ]
    .into_iter()
    .filter_map(|(name, cells)| Template::new(name, cells).ok())
    .collect()
}
