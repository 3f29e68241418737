//! Stacking order of open floating windows.
//!
//! Each open window is keyed by a stable id and carries a z-index (`index`). The entry holding
//! the maximum index is front-most. Focusing an existing window renumbers the whole stack to
//! `1..=N`; closing one leaves the survivors' indices alone.

use std::{collections::BTreeMap, rc::Rc};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Panel type shown by a window.
pub enum WindowKind {
    Room,
    Map,
    Wallet,
    DocFile,
    News,
    Profile,
    Help,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// What a window displays: its panel type plus an arbitrary payload.
pub struct WindowValue {
    #[serde(rename = "type")]
    pub kind: WindowKind,
    #[serde(default)]
    pub payload: Value,
}

impl WindowValue {
    pub fn new(kind: WindowKind) -> Self {
        Self {
            kind,
            payload: Value::Null,
        }
    }

    pub fn with_payload(kind: WindowKind, payload: Value) -> Self {
        Self { kind, payload }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Bookkeeping record for one open window.
pub struct WindowEntry {
    pub id: String,
    pub value: WindowValue,
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Immutable registry of open windows. Operations return a new value, or `self` unchanged
/// (pointer-equal) when they have nothing to do.
pub struct WindowOrder {
    entries: Rc<BTreeMap<String, WindowEntry>>,
}

impl WindowOrder {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&WindowEntry> {
        self.entries.get(id)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }

    /// Entry with the highest index.
    pub fn front_most(&self) -> Option<&WindowEntry> {
        self.entries.values().max_by_key(|entry| entry.index)
    }

    /// Entries from back to front.
    pub fn ordered(&self) -> Vec<&WindowEntry> {
        let mut entries = self.entries.values().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    /// Whether the indices are exactly `1..=N`.
    pub fn indices_are_dense(&self) -> bool {
        self.ordered()
            .iter()
            .enumerate()
            .all(|(position, entry)| entry.index as usize == position + 1)
    }

    fn max_index(&self) -> u32 {
        self.entries.values().map(|e| e.index).max().unwrap_or(0)
    }

    /// Opens `id` or brings it to front with `value`.
    ///
    /// A new window is appended directly above the current front-most window without touching
    /// the other indices. An existing window that is already front-most with an identical value
    /// is left as is. Otherwise the remaining windows keep their relative order, the target goes
    /// on top, and every index is renumbered to `1..=N`.
    pub fn focus(&self, id: &str, value: WindowValue) -> WindowOrder {
        let top = self.max_index();
        let Some(existing) = self.entries.get(id) else {
            let mut map = (*self.entries).clone();
            map.insert(
                id.to_string(),
                WindowEntry {
                    id: id.to_string(),
                    value,
                    index: top + 1,
                },
            );
            return Self {
                entries: Rc::new(map),
            };
        };

        if existing.index == top && existing.value == value {
            return self.clone();
        }

        let mut stack = self
            .ordered()
            .into_iter()
            .filter(|entry| entry.id != id)
            .cloned()
            .collect::<Vec<_>>();
        stack.push(WindowEntry {
            id: id.to_string(),
            value,
            index: 0,
        });

        let map = stack
            .into_iter()
            .enumerate()
            .map(|(position, mut entry)| {
                entry.index = position as u32 + 1;
                (entry.id.clone(), entry)
            })
            .collect();
        Self {
            entries: Rc::new(map),
        }
    }

    /// Removes `id`. Survivors keep their indices.
    pub fn close(&self, id: &str) -> WindowOrder {
        if !self.entries.contains_key(id) {
            return self.clone();
        }
        let mut map = (*self.entries).clone();
        map.remove(id);
        Self {
            entries: Rc::new(map),
        }
    }

    /// Closes every window.
    pub fn reset_all(&self) -> WindowOrder {
        if self.is_empty() {
            return self.clone();
        }
        Self::default()
    }

    /// Upserts `entries` verbatim, without renumbering. Callers restoring a saved layout must
    /// supply a consistent set of indices.
    pub fn replace_batch(&self, entries: Vec<WindowEntry>) -> WindowOrder {
        if entries
            .iter()
            .all(|entry| self.entries.get(&entry.id) == Some(entry))
        {
            return self.clone();
        }
        let mut map = (*self.entries).clone();
        for entry in entries {
            map.insert(entry.id.clone(), entry);
        }
        Self {
            entries: Rc::new(map),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn room_window(room_id: &str) -> WindowValue {
        WindowValue::with_payload(WindowKind::Room, json!({ "roomId": room_id }))
    }

    fn indices(order: &WindowOrder) -> Vec<(String, u32)> {
        order
            .ordered()
            .into_iter()
            .map(|entry| (entry.id.clone(), entry.index))
            .collect()
    }

    fn abc() -> WindowOrder {
        WindowOrder::default()
            .focus("A", room_window("a"))
            .focus("B", room_window("b"))
            .focus("C", room_window("c"))
    }

    #[test]
    fn focusing_new_windows_appends_in_order() {
        assert_eq!(
            indices(&abc()),
            vec![("A".to_string(), 1), ("B".to_string(), 2), ("C".to_string(), 3)]
        );
    }

    #[test]
    fn refocusing_moves_window_to_front_and_renumbers() {
        let order = abc().focus("A", room_window("a"));
        assert_eq!(
            indices(&order),
            vec![("B".to_string(), 1), ("C".to_string(), 2), ("A".to_string(), 3)]
        );
        assert_eq!(order.front_most().map(|e| e.id.as_str()), Some("A"));
    }

    #[test]
    fn close_keeps_survivor_indices() {
        let order = abc().focus("A", room_window("a")).close("B");
        assert_eq!(order.get("A").map(|e| e.index), Some(3));
        assert_eq!(order.get("C").map(|e| e.index), Some(2));
        assert_eq!(order.get("B"), None);
        assert_eq!(order.front_most().map(|e| e.id.as_str()), Some("A"));
        assert!(!order.indices_are_dense());
    }

    #[test]
    fn opening_after_a_gap_never_duplicates_an_index() {
        let order = abc().close("A").focus("D", room_window("d"));
        assert_eq!(order.get("D").map(|e| e.index), Some(4));
        assert_eq!(order.front_most().map(|e| e.id.as_str()), Some("D"));
    }

    #[test]
    fn refocusing_front_window_with_same_value_is_a_noop() {
        let order = abc();
        let again = order.focus("C", room_window("c"));
        assert!(again.ptr_eq(&order));
    }

    #[test]
    fn refocusing_front_window_with_new_value_updates_it() {
        let order = abc();
        let again = order.focus("C", room_window("elsewhere"));
        assert!(!again.ptr_eq(&order));
        assert_eq!(again.get("C").map(|e| e.value.clone()), Some(room_window("elsewhere")));
        assert_eq!(again.get("C").map(|e| e.index), Some(3));
    }

    #[test]
    fn repeated_focus_keeps_indices_dense() {
        let mut order = WindowOrder::default();
        for id in ["A", "B", "C", "B", "A", "D", "C", "C", "A"] {
            order = order.focus(id, WindowValue::new(WindowKind::Map));
            assert!(order.indices_are_dense(), "indices not dense after focusing {id}");
        }
        assert_eq!(order.len(), 4);
        assert_eq!(order.front_most().map(|e| e.id.as_str()), Some("A"));
    }

    #[test]
    fn refocus_after_close_compacts_the_stack() {
        let order = abc().close("A").focus("B", room_window("b"));
        assert_eq!(indices(&order), vec![("C".to_string(), 1), ("B".to_string(), 2)]);
    }

    #[test]
    fn close_of_unknown_window_and_empty_reset_are_noops() {
        let order = abc();
        assert!(order.close("Z").ptr_eq(&order));

        let empty = WindowOrder::default();
        assert!(empty.reset_all().ptr_eq(&empty));
        assert!(order.reset_all().is_empty());
    }

    #[test]
    fn replace_batch_upserts_without_renumbering() {
        let order = WindowOrder::default().focus("A", WindowValue::new(WindowKind::News));
        let restored = order.replace_batch(vec![
            WindowEntry {
                id: "W".to_string(),
                value: WindowValue::new(WindowKind::Wallet),
                index: 7,
            },
            WindowEntry {
                id: "A".to_string(),
                value: WindowValue::new(WindowKind::News),
                index: 5,
            },
        ]);
        assert_eq!(indices(&restored), vec![("A".to_string(), 5), ("W".to_string(), 7)]);

        let same = restored.replace_batch(vec![WindowEntry {
            id: "W".to_string(),
            value: WindowValue::new(WindowKind::Wallet),
            index: 7,
        }]);
        assert!(same.ptr_eq(&restored));
    }

    #[test]
    fn window_value_serializes_kind_as_type() {
        let value = serde_json::to_value(room_window("r1")).expect("encode");
        assert_eq!(value, json!({"type": "room", "payload": {"roomId": "r1"}}));
    }
}
