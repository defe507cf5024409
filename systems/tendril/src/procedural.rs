//! Trunk-and-branch generator used when no template fits.
//!
//! Planning is pure: it only consults the random source and a probe closure
//! describing the cells around the anchor, so equal seeds over equal terrain
//! yield equal plans.

use blight_core::{Material, Position, TendrilTuning};
use rand::Rng;

/// What a planned cell currently holds, as far as growth is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellProbe {
    /// Empty space; tips may only grow here.
    Empty,
    /// Spreadable terrain or existing corruption the trunk may grow through.
    Passable,
    /// Anything else, including cured or unreadable cells.
    Blocked,
}

/// A single cell the stamp step should write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Absolute position of the cell.
    pub position: Position,
    /// Material to write.
    pub material: Material,
}

/// Plans a procedural tendril above `anchor`.
///
/// The trunk rises between `min_height` and `max_height` layers and drifts
/// sideways once it clears `drift_start`. Eligible layers may sprout a short
/// branch. The cell above the last trunk cell receives an alarm or sensor tip
/// when it is empty.
pub fn plan_procedural<R, F>(
    tuning: &TendrilTuning,
    rng: &mut R,
    anchor: Position,
    mut probe: F,
) -> Vec<Placement>
where
    R: Rng + ?Sized,
    F: FnMut(Position) -> CellProbe,
{
    let height = if tuning.max_height > tuning.min_height {
        rng.gen_range(tuning.min_height..tuning.max_height)
    } else {
        tuning.min_height
    };

    let mut plan: Vec<Placement> = Vec::new();
    let mut last_trunk = None;
    let mut drift = (0.0_f64, 0.0_f64);

    for layer in 1..=height {
        if layer > tuning.drift_start && rng.gen::<f64>() < tuning.drift_chance {
            drift.0 += (rng.gen::<f64>() - 0.5) * tuning.drift_step;
            drift.1 += (rng.gen::<f64>() - 0.5) * tuning.drift_step;
        }

        let position = anchor.offset(drift_offset(drift.0), layer, drift_offset(drift.1));
        if probe(position) == CellProbe::Blocked {
            continue;
        }
        push_unique(&mut plan, position, Material::Blight);
        last_trunk = Some(position);

        let sprouts = layer > tuning.branch_min_layer
            && tuning.branch_every > 0
            && layer % tuning.branch_every == 0
            && rng.gen::<f64>() < tuning.branch_chance;
        if sprouts {
            grow_branch(tuning, rng, position, &mut probe, &mut plan);
        }
    }

    if let Some(trunk_top) = last_trunk {
        let tip = trunk_top.above();
        if probe(tip) == CellProbe::Empty {
            let material = if rng.gen_bool(0.5) {
                Material::BlightAlarm
            } else {
                Material::BlightSensor
            };
            push_unique(&mut plan, tip, material);
        }
    }

    plan
}

fn grow_branch<R, F>(
    tuning: &TendrilTuning,
    rng: &mut R,
    start: Position,
    probe: &mut F,
    plan: &mut Vec<Placement>,
) where
    R: Rng + ?Sized,
    F: FnMut(Position) -> CellProbe,
{
    let length = if tuning.branch_max_len > tuning.branch_min_len {
        rng.gen_range(tuning.branch_min_len..=tuning.branch_max_len)
    } else {
        tuning.branch_min_len
    };
    let mut x_dir = rng.gen_range(-1..=1);
    let z_dir = rng.gen_range(-1..=1);
    if x_dir == 0 && z_dir == 0 {
        x_dir = 1;
    }

    for step in 1..=length {
        let dy = rng.gen_range(-1..=0);
        let position = start.offset(x_dir * step, dy, z_dir * step);
        if probe(position) != CellProbe::Blocked {
            push_unique(plan, position, Material::Blight);
        }
    }
}

fn push_unique(plan: &mut Vec<Placement>, position: Position, material: Material) {
    if plan.iter().all(|placement| placement.position != position) {
        plan.push(Placement { position, material });
    }
}

fn drift_offset(drift: f64) -> i32 {
    // Drift accumulates at most a few cells over any trunk height.
    drift.floor() as i32
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn open_sky_yields_a_trunk_with_a_tip() {
        let tuning = TendrilTuning::default();
        let anchor = Position::at(0, 0, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(12);

        let plan = plan_procedural(&tuning, &mut rng, anchor, |_| CellProbe::Empty);

        let trunk = plan
            .iter()
            .filter(|placement| placement.material == Material::Blight)
            .count();
        assert!(trunk >= usize::try_from(tuning.min_height).unwrap_or(0));
        let tip = plan.last().expect("plan is not empty");
        assert!(matches!(
            tip.material,
            Material::BlightAlarm | Material::BlightSensor
        ));
        assert!(plan.iter().all(|placement| placement.position.y() > anchor.y()));
    }

    #[test]
    fn equal_seeds_plan_equal_tendrils() {
        let tuning = TendrilTuning::default();
        let anchor = Position::at(4, 10, -4);
        let first = plan_procedural(
            &tuning,
            &mut ChaCha8Rng::seed_from_u64(77),
            anchor,
            |_| CellProbe::Empty,
        );
        let second = plan_procedural(
            &tuning,
            &mut ChaCha8Rng::seed_from_u64(77),
            anchor,
            |_| CellProbe::Empty,
        );
        assert_eq!(first, second);
    }

    #[test]
    fn blocked_cells_are_never_planned() {
        let tuning = TendrilTuning::default();
        let anchor = Position::at(0, 0, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let plan = plan_procedural(&tuning, &mut rng, anchor, |position| {
            if position.y() % 2 == 0 {
                CellProbe::Blocked
            } else {
                CellProbe::Passable
            }
        });

        assert!(!plan.is_empty());
        assert!(plan.iter().all(|placement| placement.position.y() % 2 != 0));
        assert!(plan
            .iter()
            .all(|placement| placement.material == Material::Blight));
    }

    #[test]
    fn fully_blocked_anchor_plans_nothing() {
        let tuning = TendrilTuning::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let plan = plan_procedural(&tuning, &mut rng, Position::at(0, 0, 0), |_| {
            CellProbe::Blocked
        });
        assert!(plan.is_empty());
    }

    #[test]
    fn branches_stay_beside_their_layer() {
        let tuning = TendrilTuning {
            branch_chance: 1.0,
            drift_chance: 0.0,
            ..TendrilTuning::default()
        };
        let anchor = Position::at(0, 0, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let plan = plan_procedural(&tuning, &mut rng, anchor, |_| CellProbe::Passable);

        let off_trunk: Vec<&Placement> = plan
            .iter()
            .filter(|placement| placement.position.x() != 0 || placement.position.z() != 0)
            .collect();
        assert!(!off_trunk.is_empty());
        for placement in off_trunk {
            let reach = placement.position.x().abs().max(placement.position.z().abs());
            assert!(reach <= tuning.branch_max_len);
            assert!(placement.position.y() >= tuning.branch_every - 1);
        }
    }
}
