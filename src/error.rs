use std::fmt;

/// Fatal configuration problems detected before any search is attempted.
///
/// These are raised to the caller immediately and must not be retried;
/// infeasibility and budget expiry are *not* errors and are reported
/// through [`crate::data::SolveStatus`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// More class groups than general-purpose room groups exist.
    GroupCount {
        class_groups: usize,
        room_groups: usize,
    },
    /// A class group and its matched room group differ in size.
    GroupSize {
        group: String,
        classes: usize,
        rooms: usize,
    },
    /// A curriculum line is missing a required field.
    MissingField { line: usize, field: &'static str },
    /// A curriculum line holds a value outside its legal range.
    InvalidValue {
        line: usize,
        field: &'static str,
        value: i64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::GroupCount {
                class_groups,
                room_groups,
            } => write!(
                f,
                "home-room allocation: {} class groups but only {} room groups",
                class_groups, room_groups
            ),
            ConfigError::GroupSize {
                group,
                classes,
                rooms,
            } => write!(
                f,
                "home-room allocation: group '{}' has {} classes but {} rooms",
                group, classes, rooms
            ),
            ConfigError::MissingField { line, field } => write!(
                f,
                "curriculum line {} is missing required field '{}'",
                line, field
            ),
            ConfigError::InvalidValue { line, field, value } => write!(
                f,
                "curriculum line {} has invalid value {} for field '{}'",
                line, value, field
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
