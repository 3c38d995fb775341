//! Room name normalization

/// Room used when a command names no room
pub const DEFAULT_ROOM: &str = "living_room";

/// Room used when nothing can be derived from an external entity
pub const UNKNOWN_ROOM: &str = "unknown";

/// Alias → canonical room key. Multi-word aliases come before their
/// single-word fragments so keyword scans prefer the longer match.
const ROOM_ALIASES: &[(&str, &str)] = &[
    ("卧室", "bedroom"),
    ("客厅", "living_room"),
    ("厨房", "kitchen"),
    ("书房", "study"),
    ("living room", "living_room"),
    ("living_room", "living_room"),
    ("livingroom", "living_room"),
    ("bedroom", "bedroom"),
    ("kitchen", "kitchen"),
    ("study", "study"),
    ("office", "office"),
    ("bathroom", "bathroom"),
];

/// Exact alias lookup on a lowercased, trimmed room name
#[must_use]
pub fn lookup(name: &str) -> Option<&'static str> {
    let key = name.trim().to_lowercase();
    ROOM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, room)| *room)
}

/// Canonical room key for a user-supplied room name.
///
/// Unknown names pass through lowercased with spaces replaced by
/// underscores; an empty name maps to [`DEFAULT_ROOM`].
#[must_use]
pub fn normalize(name: &str) -> String {
    let trimmed = name.trim().to_lowercase();
    if trimmed.is_empty() {
        return DEFAULT_ROOM.to_string();
    }
    match lookup(&trimmed) {
        Some(room) => room.to_string(),
        None => trimmed.replace(' ', "_"),
    }
}

/// Derive a room from an external entity's object id and friendly name.
///
/// Scans both for any known alias; falls back to the first `_`-separated
/// token of the object id, then to [`UNKNOWN_ROOM`].
#[must_use]
pub fn derive(object_id: &str, friendly_name: Option<&str>) -> String {
    let object_id = object_id.to_lowercase();
    let haystack = match friendly_name {
        Some(name) => format!("{} {}", object_id, name.to_lowercase()),
        None => object_id.clone(),
    };

    if let Some((_, room)) = ROOM_ALIASES
        .iter()
        .find(|(alias, _)| haystack.contains(alias))
    {
        return (*room).to_string();
    }

    object_id
        .split('_')
        .find(|token| !token.is_empty())
        .map_or_else(|| UNKNOWN_ROOM.to_string(), str::to_string)
}

/// Human-readable room label
#[must_use]
pub fn label(room: &str) -> String {
    match room {
        "bedroom" => "Bedroom".to_string(),
        "living_room" => "Living Room".to_string(),
        "kitchen" => "Kitchen".to_string(),
        other => other.to_string(),
    }
}

/// Title-cased room name for confirmations ("living_room" → "Living Room")
#[must_use]
pub fn title(room: &str) -> String {
    room.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
