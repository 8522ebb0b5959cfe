use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Type aliases for clarity
pub type TeacherId = String;
pub type RoomId = String;
pub type ClassId = String;
pub type SubjectId = String;
pub type SessionId = u32;

/// A (day, period) cell of the weekly grid. Ordered by day, then period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct Timeslot {
    pub day: u32,
    pub period: u32,
}

impl fmt::Display for Timeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}p{}", self.day, self.period)
    }
}

/// Represents a teacher with load caps; seniority weights their preferences.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub seniority: i64,
    pub max_load_day: u32,
    pub max_load_week: u32,
}

/// The kind of a physical room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomKind {
    General,
    Specialized,
}

/// Represents a physical room with a given capacity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
    pub kind: RoomKind,
}

/// Represents a class group (a section of students).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub size: u32,
}

/// What kind of room a subject demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequiredRoomKind {
    None,
    Specialized,
}

/// Represents a taught subject. `duration` is the number of consecutive
/// periods one occurrence spans.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub duration: u32,
    pub required_kind: RequiredRoomKind,
    #[serde(default)]
    pub viable_room_ids: Vec<RoomId>,
    #[serde(default)]
    pub is_optional: bool,
}

/// One curriculum demand line. Required fields are optional at the schema
/// level so a missing value is data, not a deserialization failure; the
/// session expander validates presence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumDemand {
    #[serde(default)]
    pub class_id: Option<ClassId>,
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub periods_per_week: Option<u32>,
    #[serde(default)]
    pub fixed_room_id: Option<RoomId>,
}

/// A teacher-declared (day, period), used for both unavailability and
/// preference sets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSlot {
    pub teacher_id: TeacherId,
    pub day: u32,
    pub period: u32,
}

impl TeacherSlot {
    pub fn slot(&self) -> Timeslot {
        Timeslot {
            day: self.day,
            period: self.period,
        }
    }
}

/// One required weekly occurrence of a (class, subject, teacher) triple,
/// needing exactly one (timeslot, room) assignment. Immutable for the
/// duration of a solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    pub fixed_room_id: Option<RoomId>,
}

/// The complete input for one solve run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingInput {
    pub teachers: Vec<Teacher>,
    pub rooms: Vec<Room>,
    pub classes: Vec<Class>,
    pub subjects: Vec<Subject>,
    pub curriculum: Vec<CurriculumDemand>,
    pub timeslots: Vec<Timeslot>,
    #[serde(default)]
    pub unavailability: Vec<TeacherSlot>,
    #[serde(default)]
    pub preferences: Vec<TeacherSlot>,
}

/// Terminal state of a solve run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolveStatus {
    Success,
    Partial,
    Infeasible,
    ConfigError,
}

/// The concrete (timeslot, room) a session was placed into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSlot {
    pub day: u32,
    pub period: u32,
    pub room_id: RoomId,
}

/// Describes a soft constraint that was not met in the final schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetSoftConstraint {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetSoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

/// The final output of the solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingOutput {
    pub status: SolveStatus,
    pub sessions_total: usize,
    pub sessions_scheduled: usize,
    pub assignment: BTreeMap<SessionId, ScheduledSlot>,
    pub score: i64,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
}

impl SchedulingOutput {
    /// Output for a run rejected before any search was attempted.
    pub fn config_error() -> Self {
        Self {
            status: SolveStatus::ConfigError,
            sessions_total: 0,
            sessions_scheduled: 0,
            assignment: BTreeMap::new(),
            score: 0,
            unmet_soft_constraints: Vec::new(),
        }
    }
}
