//! The versioned table of well-known property names encoded as one byte.
//!
//! The position of a string in [`SYSTEM_STRINGS`] is its wire id. Adding,
//! removing or reordering entries changes the wire format.

use std::sync::LazyLock;

use crate::types::UtfAllString;

/// Wire order of the system strings; index 0 is marker `0x20`.
pub const SYSTEM_STRINGS: [&str; 32] = [
    "$s",
    "$t",
    "$v",
    "_attachments",
    "_etag",
    "_rid",
    "_self",
    "_ts",
    "attachments/",
    "coordinates",
    "geometry",
    "GeometryCollection",
    "id",
    "inE",
    "inV",
    "label",
    "LineString",
    "link",
    "MultiLineString",
    "MultiPoint",
    "MultiPolygon",
    "name",
    "outE",
    "outV",
    "Point",
    "Polygon",
    "properties",
    "type",
    "value",
    "Feature",
    "FeatureCollection",
    "_id",
];

struct SystemStringTable {
    strings: Vec<UtfAllString>,
    /// Ids grouped by UTF-8 byte length.
    by_length: Vec<Vec<u8>>,
}

static TABLE: LazyLock<SystemStringTable> = LazyLock::new(|| {
    let strings: Vec<UtfAllString> = SYSTEM_STRINGS
        .iter()
        .map(|s| UtfAllString::from_static(s))
        .collect();
    let max_len = SYSTEM_STRINGS.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut by_length = vec![Vec::new(); max_len + 1];
    for (id, s) in SYSTEM_STRINGS.iter().enumerate() {
        by_length[s.len()].push(id as u8);
    }
    SystemStringTable { strings, by_length }
});

/// Returns the system-string id of an exact byte match.
pub fn get_system_string_id(utf8: &[u8]) -> Option<u8> {
    let table = &*TABLE;
    table
        .by_length
        .get(utf8.len())?
        .iter()
        .copied()
        .find(|&id| table.strings[usize::from(id)].utf8_bytes() == utf8)
}

/// Returns the system string for `id`.
pub fn try_get_system_string_by_id(id: u8) -> Option<&'static UtfAllString> {
    TABLE.strings.get(usize::from(id))
}
