use crate::data::{Class, ClassId, Room, RoomId, RoomKind};
use crate::error::ConfigError;
use itertools::Itertools;
use log::debug;
use std::collections::HashMap;

/// Derives the grouping key of a class id by stripping its trailing section
/// marker: "C7A" and "C7B" share base "C7", sub-sections "12A1" and "12A2"
/// share base "12A".
fn base_id(id: &str) -> &str {
    match id.char_indices().last() {
        Some((idx, _)) if idx > 0 => &id[..idx],
        _ => id,
    }
}

/// Assigns every class a fixed default room, used by sessions that do not
/// require a specialized room.
///
/// General-purpose rooms sharing a display name form a room group; classes
/// sharing a base id form a class group. Both collections are sorted by
/// group key and paired by ordinal position, and the classes and rooms of
/// a pair are matched 1:1 in id order. A group-count or group-size mismatch
/// is an unrecoverable configuration error, never a partial map.
pub fn allocate_home_rooms(
    classes: &[Class],
    rooms: &[Room],
) -> Result<HashMap<ClassId, RoomId>, ConfigError> {
    let mut room_groups: Vec<(String, Vec<&Room>)> = rooms
        .iter()
        .filter(|r| r.kind == RoomKind::General)
        .map(|r| (r.name.clone(), r))
        .into_group_map()
        .into_iter()
        .collect();
    room_groups.sort_by(|a, b| a.0.cmp(&b.0));

    let mut class_groups: Vec<(String, Vec<&Class>)> = classes
        .iter()
        .map(|c| (base_id(&c.id).to_string(), c))
        .into_group_map()
        .into_iter()
        .collect();
    class_groups.sort_by(|a, b| a.0.cmp(&b.0));

    if class_groups.len() > room_groups.len() {
        return Err(ConfigError::GroupCount {
            class_groups: class_groups.len(),
            room_groups: room_groups.len(),
        });
    }

    let mut home_rooms = HashMap::new();
    for ((base, mut group_classes), (room_name, mut group_rooms)) in
        class_groups.into_iter().zip(room_groups)
    {
        if group_classes.len() != group_rooms.len() {
            return Err(ConfigError::GroupSize {
                group: base,
                classes: group_classes.len(),
                rooms: group_rooms.len(),
            });
        }
        group_classes.sort_by(|a, b| a.id.cmp(&b.id));
        group_rooms.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(
            "Home rooms: class group '{}' ({} classes) -> room group '{}'",
            base,
            group_classes.len(),
            room_name
        );
        for (class, room) in group_classes.into_iter().zip(group_rooms) {
            home_rooms.insert(class.id.clone(), room.id.clone());
        }
    }

    Ok(home_rooms)
}
