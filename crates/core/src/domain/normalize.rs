// Lenient readers for persisted records written by older clients.
// Nothing here fails: unusable fields fall back to safe defaults.

use serde_json::{Map, Value};

use crate::domain::entry::{Entry, MAX_MANAGERS};
use crate::domain::roster::{Manager, SavedName};

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

fn timestamp(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

fn parsed<T: std::str::FromStr>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    obj.get(key)?.as_str()?.parse().ok()
}

/// Read one entry out of a stored list item.
///
/// Returns `None` for items that are not objects. A missing or empty id is
/// replaced with `fresh_id()`.
pub(crate) fn entry_from_value(value: &Value, fresh_id: &mut dyn FnMut() -> String) -> Option<Entry> {
    let obj = value.as_object()?;

    let id = optional_string(obj, "id").unwrap_or_else(|| fresh_id());

    let managers = obj.get("managers").and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .take(MAX_MANAGERS)
            .collect::<Vec<_>>()
    });

    let original_queue_index = obj
        .get("originalQueueIndex")
        .and_then(Value::as_i64)
        .map(|i| i.max(0) as usize);

    Some(Entry {
        id,
        first_name: string_field(obj, "firstName"),
        last_name: string_field(obj, "lastName"),
        note: string_field(obj, "note"),
        joined_at: timestamp(obj, "joinedAt"),
        service_start: timestamp(obj, "serviceStart"),
        completed_at: timestamp(obj, "completedAt"),
        join_type: parsed(obj, "joinType"),
        managers,
        team_label: optional_string(obj, "teamLabel"),
        early_reason: parsed(obj, "earlyReason"),
        original_queue_index,
    })
}

/// Read a stored list; anything that is not an array reads as empty
pub(crate) fn entries_from_value(
    value: Option<&Value>,
    fresh_id: &mut dyn FnMut() -> String,
) -> Vec<Entry> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| entry_from_value(item, fresh_id))
                .collect()
        })
        .unwrap_or_default()
}

fn has_id(item: &Value) -> bool {
    item.get("id")
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

/// True when some object in one of `lists` has no usable id
pub(crate) fn has_missing_ids(doc: &Value, lists: &[&str]) -> bool {
    lists
        .iter()
        .filter_map(|list| doc.get(*list).and_then(Value::as_array))
        .flatten()
        .any(|item| item.is_object() && !has_id(item))
}

/// Write a fresh id into every object in `lists` that has none.
/// Everything else in the document is left as stored. Returns whether
/// anything changed.
pub(crate) fn assign_missing_ids(
    doc: &mut Value,
    lists: &[&str],
    fresh_id: &mut dyn FnMut() -> String,
) -> bool {
    let mut changed = false;
    for list in lists {
        let Some(items) = doc.get_mut(*list).and_then(Value::as_array_mut) else {
            continue;
        };
        for item in items.iter_mut() {
            if has_id(item) {
                continue;
            }
            if let Some(obj) = item.as_object_mut() {
                obj.insert("id".to_string(), Value::String(fresh_id()));
                changed = true;
            }
        }
    }
    changed
}

fn objects<'a>(value: Option<&'a Value>) -> impl Iterator<Item = &'a Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// Read a stored managers list; same fallbacks as entries
pub(crate) fn managers_from_value(
    value: Option<&Value>,
    fresh_id: &mut dyn FnMut() -> String,
) -> Vec<Manager> {
    objects(value)
        .map(|obj| Manager {
            id: optional_string(obj, "id").unwrap_or_else(|| fresh_id()),
            name: string_field(obj, "name"),
        })
        .collect()
}

pub(crate) fn saved_names_from_value(
    value: Option<&Value>,
    fresh_id: &mut dyn FnMut() -> String,
) -> Vec<SavedName> {
    objects(value)
        .map(|obj| SavedName {
            id: optional_string(obj, "id").unwrap_or_else(|| fresh_id()),
            first_name: string_field(obj, "firstName"),
            last_name: string_field(obj, "lastName"),
        })
        .collect()
}
