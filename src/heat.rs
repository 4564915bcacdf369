//! Pure scoring functions: event weights, exponential decay, directory
//! aggregation, and the hot/cold threshold.
//!
//! Nothing in this module touches the tree or the clock directly -- every
//! function takes its inputs as plain values so the decay curve and
//! aggregation rule can be unit tested without any notion of a `Node`.

use crate::tree::EventKind;

/// Highest heat value a node can carry.
pub const MAX_HEAT: f64 = 100.0;

/// Heat at or above which a node is considered "hot".
pub const HOT_THRESHOLD: f64 = 20.0;

/// Milliseconds for a node's heat to halve with no further events.
pub const HALF_LIFE_MS: f64 = 10_000.0;

/// Weight applied to a child's total heat when folding it into its parent.
pub const DIR_CHILD_SUM_WEIGHT: f64 = 0.1;

/// Number of cells in the rendered heat bar.
pub const BAR_SEGMENTS: usize = 6;

/// Number of ghost ticks a deleted node survives before being finalized.
pub const DEFAULT_GHOST_STEPS: u32 = 3;

/// Base weight assigned to each kind of filesystem event, before decay.
pub fn event_weight(kind: EventKind) -> f64 {
    match kind {
        EventKind::Unlink | EventKind::UnlinkDir => 100.0,
        EventKind::Add | EventKind::AddDir => 80.0,
        EventKind::Change => 60.0,
        EventKind::Rename => 40.0,
        EventKind::ChildChange | EventKind::None => 30.0,
    }
}

/// Compute the heat contributed by a single event, decayed to `now`.
///
/// Returns `0.0` if `event_time` is `None`. Otherwise the event's base
/// weight is halved once per `HALF_LIFE_MS` elapsed, clamped to
/// `[0, MAX_HEAT]`. Monotonically non-increasing as `now` grows, and never
/// negative.
pub fn heat(event_kind: EventKind, event_time: Option<u64>, now: u64) -> f64 {
    let Some(event_time) = event_time else {
        return 0.0;
    };

    let elapsed_ms = now.saturating_sub(event_time) as f64;
    let weight = event_weight(event_kind);
    let decayed = weight * 2f64.powf(-elapsed_ms / HALF_LIFE_MS);

    decayed.clamp(0.0, MAX_HEAT)
}

/// Fold a directory's own heat together with its children's heats.
///
/// Rewards both a single very hot child and broad low-grade activity across
/// many children: the result is at least as large as the loudest single
/// child, boosted further by a fraction of the sum across all children.
pub fn dir_heat(child_heats: &[f64], own_heat: f64) -> f64 {
    if child_heats.is_empty() {
        return own_heat;
    }

    let max_child = child_heats.iter().cloned().fold(0.0_f64, f64::max);
    let sum_child: f64 = child_heats.iter().sum();

    let combined = f64::max(own_heat, max_child + DIR_CHILD_SUM_WEIGHT * sum_child);
    combined.min(MAX_HEAT)
}

/// `true` iff `h` meets the hot threshold.
pub fn is_hot(h: f64) -> bool {
    h >= HOT_THRESHOLD
}

/// A named color bucket for a given heat value, used by the renderer to
/// pick a display color without re-deriving the thresholds itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatColor {
    BrightRed,
    Red,
    Magenta,
    Cyan,
    Blue,
}

pub fn heat_color(h: f64) -> HeatColor {
    if h >= 80.0 {
        HeatColor::BrightRed
    } else if h >= 60.0 {
        HeatColor::Red
    } else if h >= 40.0 {
        HeatColor::Magenta
    } else if h >= 20.0 {
        HeatColor::Cyan
    } else {
        HeatColor::Blue
    }
}

/// Number of filled cells (out of [`BAR_SEGMENTS`]) representing `h`.
pub fn bar_fill(h: f64) -> usize {
    let fraction = (h / MAX_HEAT).clamp(0.0, 1.0);
    ((fraction * BAR_SEGMENTS as f64).round() as usize).min(BAR_SEGMENTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heat_is_zero_with_no_event() {
        assert_eq!(heat(EventKind::Change, None, 1_000), 0.0);
    }

    #[test]
    fn heat_monotonicity() {
        // Property 1: fixed node, no new events -> heat never increases as
        // time moves forward.
        let t0 = heat(EventKind::Change, Some(0), 0);
        let t1 = heat(EventKind::Change, Some(0), 5_000);
        let t2 = heat(EventKind::Change, Some(0), 50_000);
        assert!(t0 >= t1);
        assert!(t1 >= t2);
    }

    #[test]
    fn heat_half_life() {
        // Property 2.
        let t0 = heat(EventKind::Change, Some(0), 0);
        let half = heat(EventKind::Change, Some(0), HALF_LIFE_MS as u64);
        assert!((half - t0 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn heat_never_negative() {
        let h = heat(EventKind::Unlink, Some(0), 1_000_000_000);
        assert!(h >= 0.0);
    }

    #[test]
    fn dir_dominance() {
        // Property 3: dir_heat >= max(own, max(children)) for every input.
        let children = [10.0, 90.0, 5.0];
        let own = 20.0;
        let result = dir_heat(&children, own);
        assert!(result >= own);
        assert!(result >= children.iter().cloned().fold(0.0, f64::max));
    }

    #[test]
    fn dir_heat_rewards_broad_activity() {
        let quiet_children = [10.0, 10.0, 10.0, 10.0, 10.0];
        let one_loud_child = [10.0, 0.0, 0.0, 0.0, 0.0];
        assert!(dir_heat(&quiet_children, 0.0) > dir_heat(&one_loud_child, 0.0));
    }

    #[test]
    fn dir_heat_empty_children_falls_back_to_own() {
        assert_eq!(dir_heat(&[], 42.0), 42.0);
    }

    #[test]
    fn dir_heat_clamped_to_max() {
        let children = [100.0, 100.0, 100.0];
        assert!(dir_heat(&children, 100.0) <= MAX_HEAT);
    }

    #[test]
    fn hot_threshold() {
        assert!(!is_hot(19.999));
        assert!(is_hot(20.0));
        assert!(is_hot(99.0));
    }

    #[test]
    fn color_buckets() {
        assert_eq!(heat_color(85.0), HeatColor::BrightRed);
        assert_eq!(heat_color(65.0), HeatColor::Red);
        assert_eq!(heat_color(45.0), HeatColor::Magenta);
        assert_eq!(heat_color(25.0), HeatColor::Cyan);
        assert_eq!(heat_color(5.0), HeatColor::Blue);
    }

    #[test]
    fn bar_fill_bounds() {
        assert_eq!(bar_fill(0.0), 0);
        assert_eq!(bar_fill(100.0), BAR_SEGMENTS);
        assert_eq!(bar_fill(50.0), 3);
    }

    #[test]
    fn scenario_s1_single_modification() {
        // S1: change at t=0, observed at t=0.
        let a_heat = heat(EventKind::Change, Some(0), 0);
        assert_eq!(a_heat, 60.0);

        let root_own = heat(EventKind::None, None, 0);
        let root_dir_heat = dir_heat(&[a_heat], root_own);
        assert_eq!(root_dir_heat, 66.0);
        assert_eq!(bar_fill(root_dir_heat), 4);
    }
}
