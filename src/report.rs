use crate::config::SolveConfig;
use crate::data::{
    ScheduledSlot, SchedulingInput, Session, SessionId, Subject, Teacher, Timeslot,
    UnmetSoftConstraint,
};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Scores a finished assignment against the soft objective and lists the
/// preferences it failed to meet. Pure over its inputs; used identically for
/// both engines.
pub fn score_assignment(
    input: &SchedulingInput,
    sessions: &[Session],
    assignment: &BTreeMap<SessionId, ScheduledSlot>,
    config: &SolveConfig,
) -> (i64, Vec<UnmetSoftConstraint>) {
    let teachers: HashMap<&str, &Teacher> =
        input.teachers.iter().map(|t| (t.id.as_str(), t)).collect();
    let subjects: HashMap<&str, &Subject> =
        input.subjects.iter().map(|s| (s.id.as_str(), s)).collect();
    let mut preferred: HashMap<&str, HashSet<Timeslot>> = HashMap::new();
    for entry in &input.preferences {
        preferred
            .entry(entry.teacher_id.as_str())
            .or_default()
            .insert(entry.slot());
    }
    let sessions_by_id: HashMap<SessionId, &Session> =
        sessions.iter().map(|s| (s.id, s)).collect();

    let mut score = 0;
    let mut unmet = Vec::new();

    for (sid, placed) in assignment {
        let Some(session) = sessions_by_id.get(sid) else {
            continue;
        };
        let start = Timeslot {
            day: placed.day,
            period: placed.period,
        };

        // Teacher preferences, weighted by seniority.
        if let Some(prefs) = preferred.get(session.teacher_id.as_str()) {
            if prefs.contains(&start) {
                if let Some(teacher) = teachers.get(session.teacher_id.as_str()) {
                    score += teacher.seniority;
                }
            } else {
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Preferred Slot".to_string(),
                    description: format!(
                        "Session {} of teacher {} starts at {}, outside the teacher's preferred slots.",
                        sid, session.teacher_id, start
                    ),
                });
            }
        }

        // Optional subjects pushed into the late-period range.
        let is_optional = subjects
            .get(session.subject_id.as_str())
            .is_some_and(|s| s.is_optional);
        if is_optional && config.rules.late_periods.contains(&placed.period) {
            score += config.weights.late_optional_penalty;
            unmet.push(UnmetSoftConstraint {
                constraint_type: "Optional In Late Period".to_string(),
                description: format!(
                    "Optional subject {} for class {} starts at {}.",
                    session.subject_id, session.class_id, start
                ),
            });
        }
    }

    // Same (class, subject) split across different teachers on one day.
    let placed_by_group: HashMap<(&str, &str), Vec<&SessionId>> = assignment
        .keys()
        .filter_map(|sid| {
            sessions_by_id
                .get(sid)
                .map(|s| ((s.class_id.as_str(), s.subject_id.as_str()), sid))
        })
        .into_group_map();
    let mut group_keys: Vec<_> = placed_by_group.keys().copied().collect();
    group_keys.sort();
    for key in group_keys {
        let group = &placed_by_group[&key];
        for (&a, &b) in group.iter().tuple_combinations() {
            let (first, second) = (sessions_by_id[a], sessions_by_id[b]);
            if first.teacher_id == second.teacher_id {
                continue;
            }
            if assignment[a].day == assignment[b].day {
                score += config.weights.same_day_split_penalty;
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Same-Day Split".to_string(),
                    description: format!(
                        "Class {} has {} twice on day {} under teachers {} and {}.",
                        first.class_id,
                        first.subject_id,
                        assignment[a].day,
                        first.teacher_id,
                        second.teacher_id
                    ),
                });
            }
        }
    }

    (score, unmet)
}
