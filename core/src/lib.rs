#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Blight corruption engine.
//!
//! This crate defines the value types and the message surface that connect the
//! host adapter, the shared session state, and the pure systems. Hosts submit
//! [`Command`] values describing lifecycle requests, the lifecycle coordinator
//! executes them and broadcasts [`Event`] values describing every observable
//! transition. Positions, materials and the corruption level are plain data
//! and carry no behaviour beyond arithmetic on themselves.

mod config;
mod material;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use config::{
    AmbientTuning, BlightConfig, Cadence, CureTuning, DetailTuning, EscalationTuning,
    JobCadence, PropagationTuning, RestorationTuning, TendrilTuning, WeightOverride,
};
pub use material::{Material, SpreadWeights};

/// Identifier of the world or dimension a position belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(u32);

impl RegionId {
    /// Region used when a host only exposes a single world.
    pub const PRIMARY: RegionId = RegionId(0);

    /// Creates a new region identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell inside a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    region: RegionId,
    x: i32,
    y: i32,
    z: i32,
}

impl Position {
    /// Creates a new grid position inside the provided region.
    #[must_use]
    pub const fn new(region: RegionId, x: i32, y: i32, z: i32) -> Self {
        Self { region, x, y, z }
    }

    /// Creates a position inside [`RegionId::PRIMARY`].
    #[must_use]
    pub const fn at(x: i32, y: i32, z: i32) -> Self {
        Self::new(RegionId::PRIMARY, x, y, z)
    }

    /// Region containing the position.
    #[must_use]
    pub const fn region(&self) -> RegionId {
        self.region
    }

    /// East-west coordinate.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical coordinate; larger values are higher.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// North-south coordinate.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Returns the position displaced by the provided deltas within the same region.
    #[must_use]
    pub const fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            region: self.region,
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// Position directly above this one.
    #[must_use]
    pub const fn above(&self) -> Self {
        self.offset(0, 1, 0)
    }

    /// Euclidean distance to `other`, or `None` when the regions differ.
    #[must_use]
    pub fn distance_to(&self, other: Position) -> Option<f64> {
        if self.region != other.region {
            return None;
        }

        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        let dz = f64::from(self.z) - f64::from(other.z);
        Some((dx * dx + dy * dy + dz * dz).sqrt())
    }

    /// Reports whether the position lies within `radius` of `center`.
    #[must_use]
    pub fn within(&self, center: Position, radius: f64) -> bool {
        self.distance_to(center)
            .map_or(false, |distance| distance <= radius)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}) in region {}",
            self.x,
            self.y,
            self.z,
            self.region.get()
        )
    }
}

/// Bounded corruption intensity in the inclusive range `1..=5`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorruptionLevel(u8);

impl CorruptionLevel {
    /// Level every session starts at.
    pub const MIN: CorruptionLevel = CorruptionLevel(1);
    /// Highest reachable level, including surges.
    pub const MAX: CorruptionLevel = CorruptionLevel(5);

    /// Creates a level, clamping the value into the supported range.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value < Self::MIN.0 {
            Self::MIN
        } else if value > Self::MAX.0 {
            Self::MAX
        } else {
            Self(value)
        }
    }

    /// Retrieves the numeric level.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }

    /// Returns the level raised by `steps`, saturating at [`CorruptionLevel::MAX`].
    #[must_use]
    pub const fn raised_by(&self, steps: u8) -> Self {
        Self::new(self.0.saturating_add(steps))
    }

    /// Reports whether the level reached the cap.
    #[must_use]
    pub const fn is_max(&self) -> bool {
        self.0 >= Self::MAX.0
    }

    /// Level expressed as a floating point multiplier input.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        f64::from(self.0)
    }
}

impl Default for CorruptionLevel {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for CorruptionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX.0)
    }
}

/// Opaque identity of whoever triggered a cure, passed through to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerId(u128);

impl TriggerId {
    /// Wraps the host-provided identity.
    #[must_use]
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Retrieves the raw identity.
    #[must_use]
    pub const fn get(&self) -> u128 {
        self.0
    }
}

/// Secondary decoration placed on top of corrupted cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Rare feature whose frequency rises sharply with the corruption level.
    Alarm,
    /// Uncommon listening feature.
    Sensor,
    /// Common creeping feature that may spread sideways.
    Vein,
}

impl FeatureKind {
    /// Material written into the world for the feature.
    #[must_use]
    pub const fn material(self) -> Material {
        match self {
            Self::Alarm => Material::BlightAlarm,
            Self::Sensor => Material::BlightSensor,
            Self::Vein => Material::BlightVein,
        }
    }
}

/// Strategy that produced a tendril.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TendrilStrategy {
    /// A predefined template was validated and stamped.
    Template,
    /// The procedural trunk-and-branch generator was used.
    Procedural,
}

/// Fire-and-forget visual or audio effects requested from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// The event began at the position.
    Awakening,
    /// A cell converted; `dramatic` asks for the louder variant.
    Conversion {
        /// Whether the loud variant should play.
        dramatic: bool,
    },
    /// A detail feature grew at the position.
    FeatureGrowth(FeatureKind),
    /// A tendril erupted from the anchor position.
    TendrilEruption(TendrilStrategy),
    /// Background particles around an active cell.
    Ambient,
    /// Background sound from an active cell.
    AmbientSound,
    /// A pulse re-seeded spreading from the position.
    Pulse,
    /// A cell was cured.
    Cured,
    /// A cell was restored when the event ended.
    Restored,
}

/// Lifecycle phase of the event session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No session is running and no restoration is pending.
    Idle,
    /// A session is spreading.
    Active,
    /// The session stopped and its cells are being restored in batches.
    Restoring,
}

/// Commands that express every permissible lifecycle request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Starts a new session centred on the provided position.
    StartEvent {
        /// Seed position of the corruption.
        center: Position,
    },
    /// Stops the running session and restores every affected cell.
    StopEvent,
    /// Re-seeds spreading from every active cell and begins a surge.
    ForceSpread,
    /// Cures the window around `origin`.
    Cure {
        /// Centre of the cure window.
        origin: Position,
        /// Identity reported to the cure observer.
        trigger: Option<TriggerId>,
    },
    /// Clears the permanently cured ledger.
    ResetLedger,
    /// Advances the scheduler by one tick.
    Tick,
}

/// Events broadcast after processing commands and scheduled jobs.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A session started and queued the provided number of seed candidates.
    EventStarted {
        /// Centre of the new session.
        center: Position,
        /// Number of candidates placed into the frontier.
        queued: usize,
    },
    /// A cell converted into corruption.
    CellCorrupted {
        /// Converted position.
        position: Position,
        /// Material captured before conversion.
        original: Material,
    },
    /// The frontier drained and was refilled from active cells.
    FrontierRefilled {
        /// Number of active cells sampled as origins.
        sampled: usize,
        /// Number of new candidates queued.
        queued: usize,
    },
    /// A detail feature was placed on top of a corrupted cell.
    DetailPlaced {
        /// Position of the feature.
        position: Position,
        /// Feature kind placed.
        feature: FeatureKind,
    },
    /// A tendril grew from an anchor cell.
    TendrilGrown {
        /// Anchor cell the tendril rose from.
        anchor: Position,
        /// Number of cells recorded for the tendril.
        cells: usize,
        /// Strategy that produced the tendril.
        strategy: TendrilStrategy,
    },
    /// The baseline corruption level escalated.
    LevelEscalated {
        /// Effective level after the escalation.
        level: CorruptionLevel,
    },
    /// A temporary surge raised the effective level.
    SurgeStarted {
        /// Effective level while the surge lasts.
        level: CorruptionLevel,
    },
    /// A surge expired.
    SurgeExpired {
        /// Effective level after the surge ended.
        level: CorruptionLevel,
    },
    /// A pulse re-seeded the frontier from every base cell.
    CorruptionPulse {
        /// Number of candidates queued by the pulse.
        queued: usize,
    },
    /// Cells around `origin` were cured.
    AreaCured {
        /// Centre of the cure window.
        origin: Position,
        /// Number of cells reverted.
        reverted: usize,
    },
    /// The ledger of cured positions was cleared.
    LedgerReset,
    /// The session stopped and restoration began.
    EventStopped {
        /// Number of cells awaiting restoration.
        pending: usize,
    },
    /// A restoration batch finished.
    RestorationProgress {
        /// Cells restored so far.
        restored: usize,
        /// Cells still awaiting restoration.
        remaining: usize,
    },
    /// Every recorded cell was restored and transient state cleared.
    RestorationCompleted {
        /// Total number of cells restored.
        restored: usize,
    },
}

/// Read-only snapshot of the session used for status queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventStatus {
    /// Current lifecycle phase.
    pub phase: Phase,
    /// Centre of the current or most recent session.
    pub center: Option<Position>,
    /// Number of active cells.
    pub active_cells: usize,
    /// Number of permanently cured positions.
    pub cured_positions: usize,
    /// Number of frontier candidates.
    pub frontier: usize,
    /// Number of cells belonging to tendrils.
    pub tracked_structures: usize,
    /// Effective corruption level.
    pub level: CorruptionLevel,
}
