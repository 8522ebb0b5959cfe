use crate::data::{ClassId, SubjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which engine carries out the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SolverEngine {
    /// The weighted ILP engine (HiGHS) honoring soft preferences.
    Ilp,
    /// The dependency-free exact fallback honoring hard constraints only.
    Backtracking,
}

/// Domain rules applied uniformly as per-slot exclusions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleRules {
    /// No session may start in these periods.
    pub blackout_periods: Vec<u32>,
    /// Subjects requiring a specialized room may only start at these periods.
    pub lab_start_periods: Vec<u32>,
    /// Theory subjects (no specialized room, not optional) may not start here.
    pub theory_banned_periods: Vec<u32>,
    /// Optional-subject starts in these periods are penalized in the objective.
    pub late_periods: Vec<u32>,
    /// Classes blocked from non-exempt subjects while an optional class runs.
    pub main_classes: HashSet<ClassId>,
    /// Sub-section classes whose sessions trigger the exclusion above.
    pub optional_classes: HashSet<ClassId>,
    /// Subjects exempt from the optional-class exclusion.
    pub exempt_subjects: HashSet<SubjectId>,
}

impl Default for ScheduleRules {
    fn default() -> Self {
        Self {
            blackout_periods: vec![6],
            lab_start_periods: vec![1, 4, 7],
            theory_banned_periods: vec![7, 8, 9],
            late_periods: vec![7, 8, 9],
            main_classes: HashSet::new(),
            optional_classes: HashSet::new(),
            exempt_subjects: HashSet::new(),
        }
    }
}

/// Soft-objective weights. Negative values are penalties under maximization.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectiveWeights {
    pub late_optional_penalty: i64,
    pub same_day_split_penalty: i64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            late_optional_penalty: -1000,
            same_day_split_penalty: -1000,
        }
    }
}

/// All knobs for one solve run, constructed once and passed by reference.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolveConfig {
    /// Wall-clock budget for the search phase, in seconds.
    pub time_limit_secs: f64,
    pub threads: i32,
    pub random_seed: i32,
    pub engine: SolverEngine,
    /// When false, sessions of optional subjects are dropped after expansion.
    pub include_optional_subjects: bool,
    pub rules: ScheduleRules,
    pub weights: ObjectiveWeights,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 30.0,
            threads: 1,
            random_seed: 1234,
            engine: SolverEngine::Ilp,
            include_optional_subjects: true,
            rules: ScheduleRules::default(),
            weights: ObjectiveWeights::default(),
        }
    }
}
