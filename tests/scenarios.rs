use std::collections::{HashMap, HashSet};
use timetable_solver::config::{SolveConfig, SolverEngine};
use timetable_solver::data::{
    Class, CurriculumDemand, RequiredRoomKind, Room, RoomKind, SchedulingInput, SchedulingOutput,
    SolveStatus, Subject, Teacher, TeacherSlot, Timeslot,
};
use timetable_solver::error::ConfigError;
use timetable_solver::expand::expand_curriculum;
use timetable_solver::solver;

fn grid(days: u32, periods: u32) -> Vec<Timeslot> {
    (1..=days)
        .flat_map(|day| (1..=periods).map(move |period| Timeslot { day, period }))
        .collect()
}

fn teacher(id: &str, seniority: i64, max_day: u32, max_week: u32) -> Teacher {
    Teacher {
        id: id.to_string(),
        name: id.to_string(),
        seniority,
        max_load_day: max_day,
        max_load_week: max_week,
    }
}

fn general_room(id: &str, name: &str) -> Room {
    Room {
        id: id.to_string(),
        name: name.to_string(),
        capacity: 30,
        kind: RoomKind::General,
    }
}

fn lab_room(id: &str) -> Room {
    Room {
        id: id.to_string(),
        name: "Science Lab".to_string(),
        capacity: 30,
        kind: RoomKind::Specialized,
    }
}

fn class(id: &str) -> Class {
    Class {
        id: id.to_string(),
        name: format!("Class {}", id),
        size: 25,
    }
}

fn theory_subject(id: &str) -> Subject {
    Subject {
        id: id.to_string(),
        name: id.to_string(),
        duration: 1,
        required_kind: RequiredRoomKind::None,
        viable_room_ids: vec![],
        is_optional: false,
    }
}

fn lab_subject(id: &str, duration: u32, viable: &[&str]) -> Subject {
    Subject {
        id: id.to_string(),
        name: id.to_string(),
        duration,
        required_kind: RequiredRoomKind::Specialized,
        viable_room_ids: viable.iter().map(|r| r.to_string()).collect(),
        is_optional: false,
    }
}

fn demand(class: &str, subject: &str, teacher: &str, periods: u32) -> CurriculumDemand {
    CurriculumDemand {
        class_id: Some(class.to_string()),
        subject_id: Some(subject.to_string()),
        teacher_id: Some(teacher.to_string()),
        periods_per_week: Some(periods),
        fixed_room_id: None,
    }
}

/// Checks every hard-constraint family over a finished schedule: no
/// teacher/class/room overlap accounting for duration, teacher load caps,
/// and day separation within (class, subject, teacher) groups.
fn assert_hard_constraints(input: &SchedulingInput, output: &SchedulingOutput) {
    let sessions = expand_curriculum(&input.curriculum).unwrap();
    let by_id: HashMap<u32, _> = sessions.iter().map(|s| (s.id, s)).collect();
    let subjects: HashMap<&str, &Subject> =
        input.subjects.iter().map(|s| (s.id.as_str(), s)).collect();
    let teachers: HashMap<&str, &Teacher> =
        input.teachers.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut teacher_occ: HashSet<(&str, Timeslot)> = HashSet::new();
    let mut class_occ: HashSet<(&str, Timeslot)> = HashSet::new();
    let mut room_occ: HashSet<(&str, Timeslot)> = HashSet::new();
    let mut week_load: HashMap<&str, u32> = HashMap::new();
    let mut day_load: HashMap<(&str, u32), u32> = HashMap::new();
    let mut group_days: HashSet<(&str, &str, &str, u32)> = HashSet::new();

    for (sid, placed) in &output.assignment {
        let session = by_id[sid];
        let duration = subjects[session.subject_id.as_str()].duration;
        for i in 0..duration {
            let slot = Timeslot {
                day: placed.day,
                period: placed.period + i,
            };
            assert!(
                teacher_occ.insert((session.teacher_id.as_str(), slot)),
                "teacher {} double-booked at {}",
                session.teacher_id,
                slot
            );
            assert!(
                class_occ.insert((session.class_id.as_str(), slot)),
                "class {} double-booked at {}",
                session.class_id,
                slot
            );
            assert!(
                room_occ.insert((placed.room_id.as_str(), slot)),
                "room {} double-booked at {}",
                placed.room_id,
                slot
            );
        }
        *week_load.entry(session.teacher_id.as_str()).or_insert(0) += duration;
        *day_load
            .entry((session.teacher_id.as_str(), placed.day))
            .or_insert(0) += duration;
        assert!(
            group_days.insert((
                session.class_id.as_str(),
                session.subject_id.as_str(),
                session.teacher_id.as_str(),
                placed.day,
            )),
            "session group ({}, {}, {}) repeats on day {}",
            session.class_id,
            session.subject_id,
            session.teacher_id,
            placed.day
        );
    }

    for (teacher_id, load) in &week_load {
        assert!(*load <= teachers[teacher_id].max_load_week);
    }
    for ((teacher_id, _), load) in &day_load {
        assert!(*load <= teachers[teacher_id].max_load_day);
    }
}

fn quick(engine: SolverEngine) -> SolveConfig {
    SolveConfig {
        engine,
        time_limit_secs: 20.0,
        ..SolveConfig::default()
    }
}

/// Scenario A: two sessions of one (class, subject, teacher) on a 5x6 grid
/// must land on distinct days.
#[test]
fn two_occurrences_spread_over_distinct_days() {
    let input = SchedulingInput {
        teachers: vec![teacher("T1", 1, 4, 15)],
        rooms: vec![
            general_room("R1", "Block A"),
            general_room("R2", "Block A"),
        ],
        classes: vec![class("C7A"), class("C7B")],
        subjects: vec![theory_subject("Math")],
        curriculum: vec![demand("C7A", "Math", "T1", 2)],
        timeslots: grid(5, 6),
        unavailability: vec![],
        preferences: vec![],
    };
    let output = solver::solve(&input, &quick(SolverEngine::Ilp)).unwrap();
    assert_eq!(output.status, SolveStatus::Success);
    assert_eq!(output.sessions_scheduled, 2);
    let days: HashSet<u32> = output.assignment.values().map(|p| p.day).collect();
    assert_eq!(days.len(), 2, "both occurrences share a day");
    assert_hard_constraints(&input, &output);
}

/// Scenario B: three duration-2 lab sessions competing for one lab fit only
/// because three permitted start periods exist.
#[test]
fn single_lab_is_shared_across_permitted_start_periods() {
    let input = SchedulingInput {
        teachers: vec![
            teacher("T1", 1, 9, 20),
            teacher("T2", 1, 9, 20),
            teacher("T3", 1, 9, 20),
        ],
        rooms: vec![
            general_room("G1", "Main Block"),
            general_room("G2", "Main Block"),
            general_room("G3", "Main Block"),
            lab_room("Lab1"),
        ],
        classes: vec![class("12A"), class("12B"), class("12C")],
        subjects: vec![lab_subject("Sci", 2, &["Lab1"])],
        curriculum: vec![
            demand("12A", "Sci", "T1", 1),
            demand("12B", "Sci", "T2", 1),
            demand("12C", "Sci", "T3", 1),
        ],
        timeslots: grid(1, 9),
        unavailability: vec![],
        preferences: vec![],
    };
    let output = solver::solve(&input, &quick(SolverEngine::Ilp)).unwrap();
    assert_eq!(output.status, SolveStatus::Success);
    assert_eq!(output.sessions_scheduled, 3);
    // Lab starts are restricted to periods 1, 4, 7; with one lab and
    // duration 2 the three sessions must take all three start periods.
    let starts: HashSet<u32> = output.assignment.values().map(|p| p.period).collect();
    assert_eq!(starts, HashSet::from([1, 4, 7]));
    assert!(output.assignment.values().all(|p| p.room_id == "Lab1"));
    assert_hard_constraints(&input, &output);
}

/// Scenario B, shrunk: only two permitted start periods exist, so the third
/// session cannot be placed anywhere.
#[test]
fn too_few_lab_start_periods_is_infeasible() {
    let input = SchedulingInput {
        teachers: vec![
            teacher("T1", 1, 9, 20),
            teacher("T2", 1, 9, 20),
            teacher("T3", 1, 9, 20),
        ],
        rooms: vec![
            general_room("G1", "Main Block"),
            general_room("G2", "Main Block"),
            general_room("G3", "Main Block"),
            lab_room("Lab1"),
        ],
        classes: vec![class("12A"), class("12B"), class("12C")],
        subjects: vec![lab_subject("Sci", 2, &["Lab1"])],
        curriculum: vec![
            demand("12A", "Sci", "T1", 1),
            demand("12B", "Sci", "T2", 1),
            demand("12C", "Sci", "T3", 1),
        ],
        timeslots: grid(1, 5),
        unavailability: vec![],
        preferences: vec![],
    };
    let output = solver::solve(&input, &quick(SolverEngine::Ilp)).unwrap();
    assert_eq!(output.status, SolveStatus::Infeasible);
    assert_eq!(output.sessions_total, 3);
    assert!(output.assignment.is_empty());
}

/// Scenario C: three required periods against a weekly cap of two.
#[test]
fn weekly_load_cap_violation_is_infeasible_under_both_engines() {
    let input = SchedulingInput {
        teachers: vec![teacher("T1", 1, 2, 2)],
        rooms: vec![general_room("R1", "Block A")],
        classes: vec![class("C7A")],
        subjects: vec![theory_subject("Math")],
        curriculum: vec![demand("C7A", "Math", "T1", 3)],
        timeslots: grid(5, 5),
        unavailability: vec![],
        preferences: vec![],
    };
    for engine in [SolverEngine::Ilp, SolverEngine::Backtracking] {
        let output = solver::solve(&input, &quick(engine)).unwrap();
        assert_eq!(output.status, SolveStatus::Infeasible, "engine {:?}", engine);
        assert_eq!(output.sessions_total, 3);
        assert!(output.assignment.is_empty());
    }
}

/// Scenario D: class groups of sizes {2, 3} against room groups {2, 2}.
#[test]
fn mismatched_home_room_groups_are_a_config_error() {
    let input = SchedulingInput {
        teachers: vec![teacher("T1", 1, 6, 20)],
        rooms: vec![
            general_room("R1", "Block A"),
            general_room("R2", "Block A"),
            general_room("R3", "Block B"),
            general_room("R4", "Block B"),
        ],
        classes: vec![
            class("C7A"),
            class("C7B"),
            class("C8A"),
            class("C8B"),
            class("C8C"),
        ],
        subjects: vec![theory_subject("Math")],
        curriculum: vec![demand("C7A", "Math", "T1", 1)],
        timeslots: grid(5, 5),
        unavailability: vec![],
        preferences: vec![],
    };
    let err = solver::solve(&input, &quick(SolverEngine::Ilp)).unwrap_err();
    assert!(matches!(err, ConfigError::GroupSize { .. }));
}

fn school_week_input() -> SchedulingInput {
    SchedulingInput {
        teachers: vec![
            teacher("T1", 1, 4, 15),
            teacher("T2", 2, 4, 15),
            teacher("T3", 1, 5, 18),
        ],
        rooms: vec![
            general_room("R1", "Block A"),
            general_room("R2", "Block A"),
            lab_room("Lab"),
        ],
        classes: vec![class("C7A"), class("C7B")],
        subjects: vec![
            theory_subject("Math"),
            theory_subject("Eng"),
            lab_subject("Sci", 2, &["Lab"]),
        ],
        curriculum: vec![
            demand("C7A", "Math", "T1", 4),
            demand("C7A", "Sci", "T2", 1),
            demand("C7A", "Eng", "T3", 3),
            demand("C7B", "Math", "T1", 4),
            demand("C7B", "Sci", "T2", 1),
            demand("C7B", "Eng", "T3", 3),
        ],
        timeslots: grid(5, 6),
        unavailability: vec![TeacherSlot {
            teacher_id: "T2".to_string(),
            day: 5,
            period: 4,
        }],
        preferences: vec![TeacherSlot {
            teacher_id: "T1".to_string(),
            day: 1,
            period: 1,
        }],
    }
}

/// A full school week solves cleanly and honors every hard family under
/// both engines.
#[test]
fn school_week_is_scheduled_without_hard_violations() {
    let input = school_week_input();
    for engine in [SolverEngine::Ilp, SolverEngine::Backtracking] {
        let output = solver::solve(&input, &quick(engine)).unwrap();
        assert_eq!(output.status, SolveStatus::Success, "engine {:?}", engine);
        assert_eq!(output.sessions_scheduled, 16);
        assert_hard_constraints(&input, &output);
    }
}

/// Non-lab sessions sit in their class's home room; lab sessions sit in a
/// viable lab.
#[test]
fn rooms_follow_home_room_allocation() {
    let input = school_week_input();
    let output = solver::solve(&input, &quick(SolverEngine::Ilp)).unwrap();
    let sessions = expand_curriculum(&input.curriculum).unwrap();
    let by_id: HashMap<u32, _> = sessions.iter().map(|s| (s.id, s)).collect();
    for (sid, placed) in &output.assignment {
        let session = by_id[sid];
        match (session.class_id.as_str(), session.subject_id.as_str()) {
            (_, "Sci") => assert_eq!(placed.room_id, "Lab"),
            ("C7A", _) => assert_eq!(placed.room_id, "R1"),
            (_, _) => assert_eq!(placed.room_id, "R2"),
        }
    }
}

/// The optimizer steers a free session into its teacher's preferred slot.
#[test]
fn preferred_slot_is_chosen_when_free() {
    let input = SchedulingInput {
        teachers: vec![teacher("T1", 3, 6, 20)],
        rooms: vec![general_room("R1", "Block A")],
        classes: vec![class("C7A")],
        subjects: vec![theory_subject("Math")],
        curriculum: vec![demand("C7A", "Math", "T1", 1)],
        timeslots: grid(3, 5),
        unavailability: vec![],
        preferences: vec![TeacherSlot {
            teacher_id: "T1".to_string(),
            day: 2,
            period: 3,
        }],
    };
    let output = solver::solve(&input, &quick(SolverEngine::Ilp)).unwrap();
    assert_eq!(output.status, SolveStatus::Success);
    let placed = output.assignment.values().next().unwrap();
    assert_eq!((placed.day, placed.period), (2, 3));
    assert_eq!(output.score, 3);
}

/// Splitting one subject across two teachers on the same day costs -1000,
/// so the optimizer spreads the pair over different days.
#[test]
fn same_subject_different_teachers_avoid_sharing_a_day() {
    let input = SchedulingInput {
        teachers: vec![teacher("T1", 1, 6, 20), teacher("T2", 1, 6, 20)],
        rooms: vec![general_room("R1", "Block A")],
        classes: vec![class("C7A")],
        subjects: vec![theory_subject("Math")],
        curriculum: vec![
            demand("C7A", "Math", "T1", 1),
            demand("C7A", "Math", "T2", 1),
        ],
        timeslots: grid(2, 4),
        unavailability: vec![],
        preferences: vec![],
    };
    let output = solver::solve(&input, &quick(SolverEngine::Ilp)).unwrap();
    assert_eq!(output.status, SolveStatus::Success);
    let days: HashSet<u32> = output.assignment.values().map(|p| p.day).collect();
    assert_eq!(days.len(), 2);
    assert_eq!(output.score, 0);
    assert!(output.unmet_soft_constraints.is_empty());
}

/// A teacher-declared unavailable slot never hosts a session start.
#[test]
fn unavailable_slots_are_never_used() {
    let mut input = school_week_input();
    input.unavailability = vec![
        TeacherSlot {
            teacher_id: "T1".to_string(),
            day: 1,
            period: 1,
        },
        TeacherSlot {
            teacher_id: "T1".to_string(),
            day: 2,
            period: 2,
        },
    ];
    let output = solver::solve(&input, &quick(SolverEngine::Ilp)).unwrap();
    assert_eq!(output.status, SolveStatus::Success);
    let sessions = expand_curriculum(&input.curriculum).unwrap();
    let by_id: HashMap<u32, _> = sessions.iter().map(|s| (s.id, s)).collect();
    for (sid, placed) in &output.assignment {
        if by_id[sid].teacher_id == "T1" {
            assert_ne!((placed.day, placed.period), (1, 1));
            assert_ne!((placed.day, placed.period), (2, 2));
        }
    }
}

/// Re-running the engine on identical input with the same seed and budget
/// yields the identical assignment.
#[test]
fn repeated_runs_are_deterministic() {
    let input = school_week_input();
    let config = quick(SolverEngine::Ilp);
    let first = solver::solve(&input, &config).unwrap();
    let second = solver::solve(&input, &config).unwrap();
    assert_eq!(first.status, second.status);
    assert_eq!(first.assignment, second.assignment);
    assert_eq!(first.score, second.score);
}
