use crate::data::{
    Room, RoomId, SchedulingInput, Session, SessionId, Subject, Teacher, Timeslot,
};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::{Duration, Instant};

/// Result of a fallback search run. `complete` is true only when every
/// session was placed; otherwise `assignment` holds whatever partial
/// placement stood when the budget expired (empty on plain exhaustion).
pub struct SearchResult {
    pub complete: bool,
    pub assignment: BTreeMap<SessionId, (Timeslot, RoomId)>,
}

/// The exact set of occupancy entries one placement added, so a backtrack
/// can revert precisely what it did and nothing else.
struct ChoicePoint {
    session: usize,
    occupied: Vec<Timeslot>,
    room: usize,
}

/// Recursive backtracking search over hard constraints only: static
/// (timeslot, room) domains, three occupancy indexes, teacher load caps,
/// and same-(class, subject, teacher) day separation. Variable ordering is
/// minimum-remaining-values with input-order tie-breaking; values are tried
/// in (day, period) order.
pub struct BacktrackSolver<'a> {
    sessions: &'a [Session],
    rooms: &'a [Room],
    teachers: HashMap<&'a str, &'a Teacher>,
    durations: Vec<u32>,
    /// Per session, its statically legal (start, room index) pairs, sorted.
    domains: Vec<Vec<(Timeslot, usize)>>,
    assignment: Vec<Option<(Timeslot, usize)>>,
    teacher_busy: HashSet<(&'a str, Timeslot)>,
    class_busy: HashSet<(&'a str, Timeslot)>,
    room_busy: HashSet<(usize, Timeslot)>,
    week_load: HashMap<&'a str, u32>,
    day_load: HashMap<(&'a str, u32), u32>,
    group_day: HashSet<(&'a str, &'a str, &'a str, u32)>,
    deadline: Instant,
    snapshot: Option<Vec<Option<(Timeslot, usize)>>>,
}

impl<'a> BacktrackSolver<'a> {
    pub fn new(input: &'a SchedulingInput, sessions: &'a [Session], budget: Duration) -> Self {
        let slots: Vec<Timeslot> = input
            .timeslots
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let slot_set: HashSet<Timeslot> = slots.iter().copied().collect();
        let subjects: HashMap<&str, &Subject> =
            input.subjects.iter().map(|s| (s.id.as_str(), s)).collect();
        let class_sizes: HashMap<&str, u32> = input
            .classes
            .iter()
            .map(|c| (c.id.as_str(), c.size))
            .collect();
        let mut unavailable: HashSet<(&str, Timeslot)> = HashSet::new();
        for entry in &input.unavailability {
            unavailable.insert((entry.teacher_id.as_str(), entry.slot()));
        }

        let durations: Vec<u32> = sessions
            .iter()
            .map(|s| {
                subjects
                    .get(s.subject_id.as_str())
                    .map_or(1, |subject| subject.duration.max(1))
            })
            .collect();

        let mut domains = Vec::with_capacity(sessions.len());
        for (si, session) in sessions.iter().enumerate() {
            let mut domain = Vec::new();
            // Unresolved foreign keys leave the domain empty rather than crash.
            let known = subjects.contains_key(session.subject_id.as_str())
                && class_sizes.contains_key(session.class_id.as_str());
            if known {
                let size = class_sizes[session.class_id.as_str()];
                let candidate_rooms: Vec<usize> = match &session.fixed_room_id {
                    Some(fixed) => input
                        .rooms
                        .iter()
                        .enumerate()
                        .filter(|(_, r)| r.id == *fixed && r.capacity >= size)
                        .map(|(ri, _)| ri)
                        .collect(),
                    None => input
                        .rooms
                        .iter()
                        .enumerate()
                        .filter(|(_, r)| r.capacity >= size)
                        .map(|(ri, _)| ri)
                        .collect(),
                };
                for &start in &slots {
                    if unavailable.contains(&(session.teacher_id.as_str(), start)) {
                        continue;
                    }
                    let fits = (0..durations[si]).all(|i| {
                        slot_set.contains(&Timeslot {
                            day: start.day,
                            period: start.period + i,
                        })
                    });
                    if !fits {
                        continue;
                    }
                    for &ri in &candidate_rooms {
                        domain.push((start, ri));
                    }
                }
            }
            domain.sort_by_key(|&(slot, ri)| (slot, ri));
            domains.push(domain);
        }

        Self {
            sessions,
            rooms: &input.rooms,
            teachers: input.teachers.iter().map(|t| (t.id.as_str(), t)).collect(),
            durations,
            domains,
            assignment: vec![None; sessions.len()],
            teacher_busy: HashSet::new(),
            class_busy: HashSet::new(),
            room_busy: HashSet::new(),
            week_load: HashMap::new(),
            day_load: HashMap::new(),
            group_day: HashSet::new(),
            deadline: Instant::now() + budget,
            snapshot: None,
        }
    }

    pub fn run(mut self) -> SearchResult {
        info!(
            "Starting backtracking search over {} sessions...",
            self.sessions.len()
        );
        let complete = self.backtrack();
        let raw = if complete {
            self.assignment.clone()
        } else {
            self.snapshot.take().unwrap_or_default()
        };
        let assignment = raw
            .iter()
            .enumerate()
            .filter_map(|(si, placed)| {
                placed.map(|(slot, ri)| (self.sessions[si].id, (slot, self.rooms[ri].id.clone())))
            })
            .collect();
        SearchResult {
            complete,
            assignment,
        }
    }

    fn backtrack(&mut self) -> bool {
        if self.time_exceeded() {
            return false;
        }
        let Some(si) = self.select_session() else {
            return true; // all sessions placed
        };
        for k in 0..self.domains[si].len() {
            if self.time_exceeded() {
                return false;
            }
            let (start, ri) = self.domains[si][k];
            if self.is_consistent(si, start, ri) {
                let point = self.place(si, start, ri);
                if self.backtrack() {
                    return true;
                }
                self.unplace(point);
            }
        }
        false
    }

    /// Minimum-remaining-values selection over the live domains, ties broken
    /// by input order. Returns None once every session is placed.
    fn select_session(&self) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for si in 0..self.sessions.len() {
            if self.assignment[si].is_some() {
                continue;
            }
            let live = self.domains[si]
                .iter()
                .filter(|&&(start, ri)| self.is_consistent(si, start, ri))
                .count();
            if best.is_none_or(|(_, size)| live < size) {
                best = Some((si, live));
            }
        }
        best.map(|(si, _)| si)
    }

    fn occupied_slots(&self, si: usize, start: Timeslot) -> impl Iterator<Item = Timeslot> + '_ {
        (0..self.durations[si]).map(move |i| Timeslot {
            day: start.day,
            period: start.period + i,
        })
    }

    fn is_consistent(&self, si: usize, start: Timeslot, ri: usize) -> bool {
        let session = &self.sessions[si];
        let teacher_id = session.teacher_id.as_str();
        let duration = self.durations[si];

        for slot in self.occupied_slots(si, start) {
            if self.teacher_busy.contains(&(teacher_id, slot))
                || self.class_busy.contains(&(session.class_id.as_str(), slot))
                || self.room_busy.contains(&(ri, slot))
            {
                return false;
            }
        }

        if let Some(teacher) = self.teachers.get(teacher_id) {
            let week = self.week_load.get(teacher_id).copied().unwrap_or(0);
            if week + duration > teacher.max_load_week {
                return false;
            }
            let day = self
                .day_load
                .get(&(teacher_id, start.day))
                .copied()
                .unwrap_or(0);
            if day + duration > teacher.max_load_day {
                return false;
            }
        }

        !self.group_day.contains(&(
            session.class_id.as_str(),
            session.subject_id.as_str(),
            teacher_id,
            start.day,
        ))
    }

    fn place(&mut self, si: usize, start: Timeslot, ri: usize) -> ChoicePoint {
        let sessions = self.sessions;
        let session = &sessions[si];
        let teacher_id = session.teacher_id.as_str();
        let duration = self.durations[si];
        let occupied: Vec<Timeslot> = self.occupied_slots(si, start).collect();

        for &slot in &occupied {
            self.teacher_busy.insert((teacher_id, slot));
            self.class_busy.insert((session.class_id.as_str(), slot));
            self.room_busy.insert((ri, slot));
        }
        *self.week_load.entry(teacher_id).or_insert(0) += duration;
        *self.day_load.entry((teacher_id, start.day)).or_insert(0) += duration;
        self.group_day.insert((
            session.class_id.as_str(),
            session.subject_id.as_str(),
            teacher_id,
            start.day,
        ));
        self.assignment[si] = Some((start, ri));

        ChoicePoint {
            session: si,
            occupied,
            room: ri,
        }
    }

    fn unplace(&mut self, point: ChoicePoint) {
        let sessions = self.sessions;
        let session = &sessions[point.session];
        let teacher_id = session.teacher_id.as_str();
        let duration = self.durations[point.session];
        let day = point.occupied[0].day;

        for &slot in &point.occupied {
            self.teacher_busy.remove(&(teacher_id, slot));
            self.class_busy.remove(&(session.class_id.as_str(), slot));
            self.room_busy.remove(&(point.room, slot));
        }
        if let Some(load) = self.week_load.get_mut(teacher_id) {
            *load -= duration;
        }
        if let Some(load) = self.day_load.get_mut(&(teacher_id, day)) {
            *load -= duration;
        }
        self.group_day.remove(&(
            session.class_id.as_str(),
            session.subject_id.as_str(),
            teacher_id,
            day,
        ));
        self.assignment[point.session] = None;
    }

    fn time_exceeded(&mut self) -> bool {
        if Instant::now() < self.deadline {
            return false;
        }
        if self.snapshot.is_none() {
            debug!("Search budget exhausted; keeping the partial assignment.");
            self.snapshot = Some(self.assignment.clone());
        }
        true
    }
}
