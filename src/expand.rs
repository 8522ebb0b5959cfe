use crate::data::{CurriculumDemand, Session};
use crate::error::ConfigError;
use log::debug;

/// Expands curriculum demand lines into atomic session records, one per
/// demanded period-unit, each with a freshly minted dense id.
///
/// Presence of the required fields is validated here; foreign keys are not
/// resolved (an unknown reference surfaces later as an empty domain).
pub fn expand_curriculum(curriculum: &[CurriculumDemand]) -> Result<Vec<Session>, ConfigError> {
    let mut sessions = Vec::new();
    let mut next_id = 0;

    for (line, demand) in curriculum.iter().enumerate() {
        let class_id = demand
            .class_id
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingField {
                line,
                field: "classId",
            })?;
        let subject_id = demand
            .subject_id
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingField {
                line,
                field: "subjectId",
            })?;
        let teacher_id = demand
            .teacher_id
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingField {
                line,
                field: "teacherId",
            })?;
        let periods = demand.periods_per_week.ok_or(ConfigError::MissingField {
            line,
            field: "periodsPerWeek",
        })?;
        if periods < 1 {
            return Err(ConfigError::InvalidValue {
                line,
                field: "periodsPerWeek",
                value: periods as i64,
            });
        }

        for _ in 0..periods {
            sessions.push(Session {
                id: next_id,
                class_id: class_id.clone(),
                subject_id: subject_id.clone(),
                teacher_id: teacher_id.clone(),
                fixed_room_id: demand.fixed_room_id.clone(),
            });
            next_id += 1;
        }
    }

    debug!(
        "Expanded {} curriculum lines into {} sessions.",
        curriculum.len(),
        sessions.len()
    );
    Ok(sessions)
}
