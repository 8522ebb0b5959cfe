use crate::config::SolveConfig;
use crate::data::{
    Class, ClassId, RequiredRoomKind, Room, RoomId, RoomKind, SchedulingInput, Session, Subject,
    Teacher, Timeslot,
};
use good_lp::variable;
use good_lp::{Constraint, Expression, ProblemVariables, Variable, constraint};
use itertools::Itertools;
use log::{info, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Dense-indexed, read-only view of one solve's inputs. Sessions, timeslots
/// and rooms each get a stable integer index; all variable maps are keyed by
/// those indices so model row order is deterministic.
pub struct Instance<'a> {
    pub sessions: &'a [Session],
    pub rooms: &'a [Room],
    /// The weekly grid, deduplicated and sorted by (day, period).
    pub slots: Vec<Timeslot>,
    pub days: Vec<u32>,
    /// Slot indices belonging to each day, parallel to `days`.
    pub day_slots: Vec<Vec<usize>>,
    slot_idx: HashMap<Timeslot, usize>,
    room_idx: HashMap<&'a str, usize>,
    teachers: HashMap<&'a str, &'a Teacher>,
    classes: HashMap<&'a str, &'a Class>,
    subjects: HashMap<&'a str, &'a Subject>,
    unavailable: HashMap<&'a str, HashSet<Timeslot>>,
    preferred: HashMap<&'a str, HashSet<Timeslot>>,
    home_rooms: &'a HashMap<ClassId, RoomId>,
}

impl<'a> Instance<'a> {
    pub fn new(
        input: &'a SchedulingInput,
        sessions: &'a [Session],
        home_rooms: &'a HashMap<ClassId, RoomId>,
    ) -> Self {
        let slots: Vec<Timeslot> = input
            .timeslots
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let days: Vec<u32> = slots.iter().map(|t| t.day).dedup().collect();
        let day_slots: Vec<Vec<usize>> = days
            .iter()
            .map(|&d| {
                slots
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.day == d)
                    .map(|(i, _)| i)
                    .collect()
            })
            .collect();
        let slot_idx = slots.iter().enumerate().map(|(i, t)| (*t, i)).collect();

        let mut unavailable: HashMap<&str, HashSet<Timeslot>> = HashMap::new();
        for entry in &input.unavailability {
            unavailable
                .entry(entry.teacher_id.as_str())
                .or_default()
                .insert(entry.slot());
        }
        let mut preferred: HashMap<&str, HashSet<Timeslot>> = HashMap::new();
        for entry in &input.preferences {
            preferred
                .entry(entry.teacher_id.as_str())
                .or_default()
                .insert(entry.slot());
        }

        Self {
            sessions,
            rooms: &input.rooms,
            slots,
            days,
            day_slots,
            slot_idx,
            room_idx: input
                .rooms
                .iter()
                .enumerate()
                .map(|(i, r)| (r.id.as_str(), i))
                .collect(),
            teachers: input.teachers.iter().map(|t| (t.id.as_str(), t)).collect(),
            classes: input.classes.iter().map(|c| (c.id.as_str(), c)).collect(),
            subjects: input.subjects.iter().map(|s| (s.id.as_str(), s)).collect(),
            unavailable,
            preferred,
            home_rooms,
        }
    }

    pub fn teacher_of(&self, session: &Session) -> Option<&'a Teacher> {
        self.teachers.get(session.teacher_id.as_str()).copied()
    }

    pub fn subject_of(&self, session: &Session) -> Option<&'a Subject> {
        self.subjects.get(session.subject_id.as_str()).copied()
    }

    /// Occupied periods per occurrence; unknown subjects count as 1 (they
    /// never get variables anyway).
    pub fn duration_of(&self, session: &Session) -> u32 {
        self.subject_of(session).map_or(1, |s| s.duration.max(1))
    }

    pub fn is_unavailable(&self, teacher_id: &str, slot: Timeslot) -> bool {
        self.unavailable
            .get(teacher_id)
            .is_some_and(|set| set.contains(&slot))
    }

    pub fn preferred_slots(&self, teacher_id: &str) -> Option<&HashSet<Timeslot>> {
        self.preferred.get(teacher_id)
    }

    /// The slot index at which a session occupying `slot` must have started,
    /// `back` periods earlier on the same day, if that cell exists.
    fn start_shifted(&self, slot: Timeslot, back: u32) -> Option<usize> {
        let period = slot.period.checked_sub(back)?;
        self.slot_idx.get(&Timeslot {
            day: slot.day,
            period,
        }).copied()
    }

    /// Whether a session of the given duration starting at `slot` stays
    /// within the grid and its day.
    fn fits_day(&self, slot: Timeslot, duration: u32) -> bool {
        (0..duration).all(|i| {
            self.slot_idx.contains_key(&Timeslot {
                day: slot.day,
                period: slot.period + i,
            })
        })
    }

    /// The feasible room set of a session: the subject's viable rooms with
    /// enough capacity when a specialized room is required, the class's home
    /// room otherwise. Unresolved foreign keys yield an empty domain.
    pub fn feasible_room_indices(&self, session: &Session) -> Vec<usize> {
        let Some(subject) = self.subject_of(session) else {
            return Vec::new();
        };
        let Some(class) = self.classes.get(session.class_id.as_str()) else {
            return Vec::new();
        };
        match subject.required_kind {
            RequiredRoomKind::Specialized => subject
                .viable_room_ids
                .iter()
                .filter_map(|rid| self.room_idx.get(rid.as_str()).copied())
                .filter(|&ri| self.rooms[ri].capacity >= class.size)
                .unique()
                .collect(),
            RequiredRoomKind::None => self
                .home_rooms
                .get(&session.class_id)
                .and_then(|rid| self.room_idx.get(rid.as_str()).copied())
                .into_iter()
                .collect(),
        }
    }
}

/// A same-day co-occurrence indicator between two sessions of the same
/// (class, subject) taught by different teachers.
pub struct SplitPair {
    pub var: Variable,
    pub first: usize,
    pub second: usize,
    pub day: usize,
}

/// All decision and derived variables of the compiled model.
pub struct ModelVars {
    /// x(session, slot, room) = 1 iff the session starts there in that room.
    pub assign: BTreeMap<(usize, usize, usize), Variable>,
    /// All assignment variables of a session, for its exactly-one constraint.
    pub session_domain: Vec<Vec<Variable>>,
    /// starts(session, slot) = sum over rooms of assign(session, slot, room).
    pub starts: BTreeMap<(usize, usize), Variable>,
    /// on_day(session, day index) = 1 iff the session starts on that day.
    pub on_day: BTreeMap<(usize, usize), Variable>,
    pub split_pairs: Vec<SplitPair>,
}

/// The compiled boolean-constraint model: variables, constraint rows, and
/// the maximized soft objective, ready to hand to a backend.
pub struct TimetableModel {
    pub problem: ProblemVariables,
    pub vars: ModelVars,
    pub constraints: Vec<Constraint>,
    pub objective: Expression,
}

impl TimetableModel {
    pub fn build(instance: &Instance, config: &SolveConfig) -> Self {
        let n = instance.sessions.len();
        let n_slots = instance.slots.len();
        info!(
            "Setting up model with {} sessions, {} rooms, and {} timeslots...",
            n,
            instance.rooms.len(),
            n_slots
        );

        let mut problem = ProblemVariables::new();
        let mut constraints: Vec<Constraint> = Vec::new();

        // Assignment variables over each session's feasible (slot, room) domain.
        let feasible: Vec<Vec<usize>> = instance
            .sessions
            .iter()
            .map(|s| instance.feasible_room_indices(s))
            .collect();
        let mut assign: BTreeMap<(usize, usize, usize), Variable> = BTreeMap::new();
        let mut session_domain: Vec<Vec<Variable>> = vec![Vec::new(); n];
        for (si, rooms) in feasible.iter().enumerate() {
            if rooms.is_empty() {
                trace!(
                    "Session {} has an empty room domain; the model will be infeasible.",
                    instance.sessions[si].id
                );
            }
            for ti in 0..n_slots {
                for &ri in rooms {
                    let var = problem.add(variable().binary());
                    assign.insert((si, ti, ri), var);
                    session_domain[si].push(var);
                }
            }
        }
        trace!(
            "Created {} assignment variables out of a theoretical maximum of {}.",
            assign.len(),
            n * n_slots * instance.rooms.len()
        );

        // Derived start variables, tied to the room-level assignments.
        let mut starts: BTreeMap<(usize, usize), Variable> = BTreeMap::new();
        for si in 0..n {
            for ti in 0..n_slots {
                let var = problem.add(variable().binary());
                let at_slot: Expression = feasible[si].iter().map(|&ri| assign[&(si, ti, ri)]).sum();
                constraints.push(constraint!(at_slot == var));
                starts.insert((si, ti), var);
            }
        }

        // Derived session-on-day variables.
        let mut on_day: BTreeMap<(usize, usize), Variable> = BTreeMap::new();
        for si in 0..n {
            for (di, slot_ids) in instance.day_slots.iter().enumerate() {
                let var = problem.add(variable().binary());
                let day_sum: Expression = slot_ids.iter().map(|&ti| starts[&(si, ti)]).sum();
                constraints.push(constraint!(day_sum == var));
                on_day.insert((si, di), var);
            }
        }

        // Each session is placed exactly once; an empty domain leaves this
        // constraint unsatisfiable, which is exactly how domain exhaustion
        // must surface.
        info!("Adding 'session placed exactly once' constraints...");
        for si in 0..n {
            let placed: Expression = session_domain[si].iter().copied().sum();
            constraints.push(constraint!(placed == 1));
        }

        let by_teacher: BTreeMap<&str, Vec<usize>> = instance
            .sessions
            .iter()
            .enumerate()
            .map(|(si, s)| (s.teacher_id.as_str(), si))
            .into_group_map()
            .into_iter()
            .collect();
        let by_class: BTreeMap<&str, Vec<usize>> = instance
            .sessions
            .iter()
            .enumerate()
            .map(|(si, s)| (s.class_id.as_str(), si))
            .into_group_map()
            .into_iter()
            .collect();

        // Duration-aware conflict constraints: a session occupies slot t if it
        // started at t, t-1, ... t-(duration-1) within the same day; at most
        // one occupying session per teacher, per class, and per specialized
        // room at any slot.
        info!("Adding teacher/class/room conflict constraints...");
        for &slot in &instance.slots {
            for sessions in by_teacher.values().chain(by_class.values()) {
                let active = occupying_start_vars(instance, &starts, sessions, slot);
                if active.len() > 1 {
                    let busy: Expression = active.into_iter().sum();
                    constraints.push(constraint!(busy <= 1));
                }
            }
            for (ri, room) in instance.rooms.iter().enumerate() {
                if room.kind != RoomKind::Specialized {
                    continue;
                }
                let mut active: Vec<Variable> = Vec::new();
                for (si, session) in instance.sessions.iter().enumerate() {
                    if !feasible[si].contains(&ri) {
                        continue;
                    }
                    for back in 0..instance.duration_of(session) {
                        if let Some(start_ti) = instance.start_shifted(slot, back) {
                            if let Some(&var) = assign.get(&(si, start_ti, ri)) {
                                active.push(var);
                            }
                        }
                    }
                }
                if active.len() > 1 {
                    let occupied: Expression = active.into_iter().sum();
                    constraints.push(constraint!(occupied <= 1));
                }
            }
        }

        // Weekly and daily teacher load caps, weighted by duration.
        info!("Adding teacher load constraints...");
        for (teacher_id, sessions) in &by_teacher {
            let Some(teacher) = instance.teachers.get(teacher_id) else {
                continue;
            };
            let weekly = load_expression(instance, &starts, sessions, 0..n_slots);
            constraints.push(constraint!(weekly <= teacher.max_load_week as f64));
            for slot_ids in &instance.day_slots {
                let daily =
                    load_expression(instance, &starts, sessions, slot_ids.iter().copied());
                constraints.push(constraint!(daily <= teacher.max_load_day as f64));
            }
        }

        // Teacher unavailability, structural day-fit, and the per-slot rule
        // exclusions all force start variables to zero.
        info!("Adding unavailability, structural, and rule constraints...");
        for (si, session) in instance.sessions.iter().enumerate() {
            let duration = instance.duration_of(session);
            let subject = instance.subject_of(session);
            let is_lab = subject.is_some_and(|s| s.required_kind == RequiredRoomKind::Specialized);
            let is_optional = subject.is_some_and(|s| s.is_optional);
            let is_theory = subject.is_some() && !is_lab && !is_optional;
            for (ti, &slot) in instance.slots.iter().enumerate() {
                let banned = instance.is_unavailable(&session.teacher_id, slot)
                    || !instance.fits_day(slot, duration)
                    || config.rules.blackout_periods.contains(&slot.period)
                    || (is_lab && !config.rules.lab_start_periods.contains(&slot.period))
                    || (is_theory && config.rules.theory_banned_periods.contains(&slot.period));
                if banned {
                    let var = starts[&(si, ti)];
                    constraints.push(constraint!(var == 0));
                }
            }
        }

        // Mutual exclusion between optional-class blocks and main classes.
        let optional_sessions: Vec<usize> = instance
            .sessions
            .iter()
            .enumerate()
            .filter(|(_, s)| config.rules.optional_classes.contains(&s.class_id))
            .map(|(si, _)| si)
            .collect();
        let blocked_sessions: Vec<usize> = instance
            .sessions
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                config.rules.main_classes.contains(&s.class_id)
                    && !config.rules.exempt_subjects.contains(&s.subject_id)
            })
            .map(|(si, _)| si)
            .collect();
        if !optional_sessions.is_empty() && !blocked_sessions.is_empty() {
            info!("Adding optional-class exclusion constraints...");
            for ti in 0..n_slots {
                let indicator = problem.add(variable().binary());
                for &si in &optional_sessions {
                    let var = starts[&(si, ti)];
                    constraints.push(constraint!(var <= indicator));
                }
                let any_optional: Expression =
                    optional_sessions.iter().map(|&si| starts[&(si, ti)]).sum();
                constraints.push(constraint!(any_optional >= indicator));
                for &si in &blocked_sessions {
                    let var = starts[&(si, ti)];
                    constraints.push(constraint!(var + indicator <= 1));
                }
            }
        }

        // Same-day repetition: hard between same-teacher occurrences of one
        // (class, subject), penalized between different teachers.
        info!("Adding same-day repetition constraints...");
        let groups: BTreeMap<(&str, &str), Vec<usize>> = instance
            .sessions
            .iter()
            .enumerate()
            .map(|(si, s)| ((s.class_id.as_str(), s.subject_id.as_str()), si))
            .into_group_map()
            .into_iter()
            .collect();
        let mut split_pairs: Vec<SplitPair> = Vec::new();
        for group in groups.values() {
            if group.len() < 2 {
                continue;
            }
            let by_teach: BTreeMap<&str, Vec<usize>> = group
                .iter()
                .map(|&si| (instance.sessions[si].teacher_id.as_str(), si))
                .into_group_map()
                .into_iter()
                .collect();

            for same in by_teach.values() {
                for (&a, &b) in same.iter().tuple_combinations() {
                    for di in 0..instance.days.len() {
                        let first = on_day[&(a, di)];
                        let second = on_day[&(b, di)];
                        constraints.push(constraint!(first + second <= 1));
                    }
                }
            }

            for (first_group, second_group) in by_teach.values().tuple_combinations() {
                for &a in first_group {
                    for &b in second_group {
                        for di in 0..instance.days.len() {
                            let both = problem.add(variable().binary());
                            let first = on_day[&(a, di)];
                            let second = on_day[&(b, di)];
                            constraints.push(constraint!(first + second - both <= 1));
                            constraints.push(constraint!(both <= first));
                            constraints.push(constraint!(both <= second));
                            split_pairs.push(SplitPair {
                                var: both,
                                first: a,
                                second: b,
                                day: di,
                            });
                        }
                    }
                }
            }
        }

        // Soft objective: preference matches weighted by seniority, minus the
        // late-optional and same-day-split penalties.
        let mut objective = Expression::from(0.0);
        for (si, session) in instance.sessions.iter().enumerate() {
            let Some(teacher) = instance.teacher_of(session) else {
                continue;
            };
            if let Some(prefs) = instance.preferred_slots(&session.teacher_id) {
                for (ti, slot) in instance.slots.iter().enumerate() {
                    if prefs.contains(slot) {
                        objective +=
                            teacher.seniority as f64 * Expression::from(starts[&(si, ti)]);
                    }
                }
            }
        }
        for (si, session) in instance.sessions.iter().enumerate() {
            if !instance.subject_of(session).is_some_and(|s| s.is_optional) {
                continue;
            }
            for (ti, slot) in instance.slots.iter().enumerate() {
                if config.rules.late_periods.contains(&slot.period) {
                    objective += config.weights.late_optional_penalty as f64
                        * Expression::from(starts[&(si, ti)]);
                }
            }
        }
        for pair in &split_pairs {
            objective +=
                config.weights.same_day_split_penalty as f64 * Expression::from(pair.var);
        }

        info!(
            "Model ready: {} variables, {} constraints.",
            assign.len() + starts.len() + on_day.len() + split_pairs.len(),
            constraints.len()
        );

        Self {
            problem,
            vars: ModelVars {
                assign,
                session_domain,
                starts,
                on_day,
                split_pairs,
            },
            constraints,
            objective,
        }
    }
}

/// Start variables under which any of `sessions` occupies `slot`, sliding
/// the window back over each session's duration.
fn occupying_start_vars(
    instance: &Instance,
    starts: &BTreeMap<(usize, usize), Variable>,
    sessions: &[usize],
    slot: Timeslot,
) -> Vec<Variable> {
    let mut active = Vec::new();
    for &si in sessions {
        let duration = instance.duration_of(&instance.sessions[si]);
        for back in 0..duration {
            if let Some(start_ti) = instance.start_shifted(slot, back) {
                active.push(starts[&(si, start_ti)]);
            }
        }
    }
    active
}

/// Sum of start variables weighted by session duration over the given slots.
fn load_expression(
    instance: &Instance,
    starts: &BTreeMap<(usize, usize), Variable>,
    sessions: &[usize],
    slot_ids: impl Iterator<Item = usize> + Clone,
) -> Expression {
    let mut load = Expression::from(0.0);
    for &si in sessions {
        let duration = instance.duration_of(&instance.sessions[si]) as f64;
        for ti in slot_ids.clone() {
            load += duration * Expression::from(starts[&(si, ti)]);
        }
    }
    load
}
