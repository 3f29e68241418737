//! Normalized per-kind entity collections and the create/update/remove change reducer.
//!
//! Collections are immutable values. Every applied change yields a new collection, except when
//! nothing changed, in which case the input is handed back and [`EntityCollection::ptr_eq`]
//! holds. Consumers rely on that to skip recomputation.

use std::{collections::BTreeMap, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    entities::{Entity, EntityId},
    error::StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// What a change does to the entities it carries.
pub enum ChangeType {
    Create,
    Update,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
/// One entity or an ordered batch.
pub enum ChangePayload<E> {
    Single(E),
    Batch(Vec<E>),
}

#[derive(Debug, Clone, PartialEq)]
/// A tagged create/update/remove targeting entities of one kind.
pub struct Change<E> {
    pub change_type: ChangeType,
    /// Discard every existing entity of the kind before applying. Only meaningful for batches.
    pub reset: bool,
    pub payload: ChangePayload<E>,
}

impl<E: Entity> Change<E> {
    pub fn create(entity: E) -> Self {
        Self::single(ChangeType::Create, entity)
    }

    /// Upserts when the entity is not present yet.
    pub fn update(entity: E) -> Self {
        Self::single(ChangeType::Update, entity)
    }

    pub fn remove(id: impl Into<EntityId>) -> Self {
        Self::single(ChangeType::Remove, E::with_id(id))
    }

    pub fn single(change_type: ChangeType, entity: E) -> Self {
        Self {
            change_type,
            reset: false,
            payload: ChangePayload::Single(entity),
        }
    }

    pub fn batch(change_type: ChangeType, entities: Vec<E>) -> Self {
        Self {
            change_type,
            reset: false,
            payload: ChangePayload::Batch(entities),
        }
    }

    /// Marks the change as a full resync of the kind.
    pub fn with_reset(mut self) -> Self {
        self.reset = true;
        self
    }
}

#[derive(Debug)]
/// Immutable id → entity map for one entity kind.
pub struct EntityCollection<E> {
    entries: Rc<BTreeMap<EntityId, Rc<E>>>,
}

impl<E> Clone for EntityCollection<E> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<E> Default for EntityCollection<E> {
    fn default() -> Self {
        Self {
            entries: Rc::new(BTreeMap::new()),
        }
    }
}

impl<E: PartialEq> PartialEq for EntityCollection<E> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.entries == other.entries
    }
}

impl<E: Entity> FromIterator<E> for EntityCollection<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let map = iter
            .into_iter()
            .map(|entity| (entity.id().clone(), Rc::new(entity)))
            .collect();
        Self {
            entries: Rc::new(map),
        }
    }
}

impl<E> EntityCollection<E> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Rc<E>> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<E>> + '_ {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> + '_ {
        self.entries.keys()
    }

    /// Whether both values are the same allocation (no change happened between them).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

/// Applies a change to `collection`, returning the resulting collection.
///
/// # Errors
///
/// Returns [`StoreError::MissingEntityId`] when any carried entity has an empty id. Nothing is
/// applied in that case.
pub fn apply_change<E: Entity>(
    collection: &EntityCollection<E>,
    change: Change<E>,
) -> Result<EntityCollection<E>, StoreError> {
    match change.payload {
        ChangePayload::Single(entity) if !change.reset => {
            apply_single(collection, change.change_type, entity)
        }
        ChangePayload::Single(entity) => {
            apply_batch(collection, change.change_type, true, vec![entity])
        }
        ChangePayload::Batch(entities) => {
            apply_batch(collection, change.change_type, change.reset, entities)
        }
    }
}

/// Applies one entity with create/update/remove semantics.
///
/// Create and update merge into the existing entity (or insert it); remove deletes by id and is
/// a no-op for absent ids. When the outcome equals the input, the input reference is returned.
///
/// # Errors
///
/// Returns [`StoreError::MissingEntityId`] when `entity` has an empty id.
pub fn apply_single<E: Entity>(
    collection: &EntityCollection<E>,
    change_type: ChangeType,
    entity: E,
) -> Result<EntityCollection<E>, StoreError> {
    ensure_id(&entity)?;

    match change_type {
        ChangeType::Create | ChangeType::Update => {
            let id = entity.id().clone();
            let Some(merged) = merged_entry(collection.get(id.as_str()), entity) else {
                return Ok(collection.clone());
            };
            let mut map = (*collection.entries).clone();
            map.insert(id, merged);
            Ok(EntityCollection {
                entries: Rc::new(map),
            })
        }
        ChangeType::Remove => {
            if !collection.contains(entity.id().as_str()) {
                return Ok(collection.clone());
            }
            let mut map = (*collection.entries).clone();
            map.remove(entity.id().as_str());
            Ok(EntityCollection {
                entries: Rc::new(map),
            })
        }
    }
}

/// Applies an ordered batch. With `reset` the result starts empty; otherwise it starts from a
/// shallow copy of `collection`. Later entries win on conflict.
///
/// # Errors
///
/// Returns [`StoreError::MissingEntityId`] when any entity has an empty id. Nothing is applied in
/// that case.
pub fn apply_batch<E: Entity>(
    collection: &EntityCollection<E>,
    change_type: ChangeType,
    reset: bool,
    entities: Vec<E>,
) -> Result<EntityCollection<E>, StoreError> {
    for entity in &entities {
        ensure_id(entity)?;
    }

    let mut map = if reset {
        BTreeMap::new()
    } else {
        (*collection.entries).clone()
    };
    let mut changed = reset;

    for entity in entities {
        match change_type {
            ChangeType::Create | ChangeType::Update => {
                let id = entity.id().clone();
                if let Some(merged) = merged_entry(map.get(id.as_str()), entity) {
                    map.insert(id, merged);
                    changed = true;
                }
            }
            ChangeType::Remove => {
                changed |= map.remove(entity.id().as_str()).is_some();
            }
        }
    }

    if !changed {
        return Ok(collection.clone());
    }
    Ok(EntityCollection {
        entries: Rc::new(map),
    })
}

/// Merges `incoming` over `existing`, or over a bare entity when absent, so a first insert
/// stores the same form as a later update. `None` means the existing entry is already identical.
fn merged_entry<E: Entity>(existing: Option<&Rc<E>>, incoming: E) -> Option<Rc<E>> {
    match existing {
        None => {
            let mut fresh = E::with_id(incoming.id().clone());
            fresh.merge_from(&incoming);
            Some(Rc::new(fresh))
        }
        Some(current) => {
            let mut merged = E::clone(current);
            merged.merge_from(&incoming);
            if merged == **current {
                None
            } else {
                Some(Rc::new(merged))
            }
        }
    }
}

fn ensure_id<E: Entity>(entity: &E) -> Result<(), StoreError> {
    if entity.id().is_empty() {
        return Err(StoreError::MissingEntityId { kind: E::KIND });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::entities::{EntityKind, Message, Room};

    fn room(id: &str, name: &str) -> Room {
        Room {
            id: id.into(),
            room_name: Some(name.to_string()),
            ..Room::default()
        }
    }

    fn lobby() -> EntityCollection<Room> {
        [room("r1", "Lobby"), room("r2", "Market")]
            .into_iter()
            .collect()
    }

    #[test]
    fn update_is_idempotent() {
        let start = lobby();
        let change = Change::update(Room {
            id: "r1".into(),
            topic: Some("welcome".to_string()),
            ..Room::default()
        });

        let once = apply_change(&start, change.clone()).expect("first");
        let twice = apply_change(&once, change).expect("second");

        assert_eq!(once, twice);
        assert!(once.ptr_eq(&twice));
    }

    #[test]
    fn create_then_remove_restores_original() {
        let start = lobby();
        let created = apply_change(&start, Change::create(room("r9", "Attic"))).expect("create");
        assert_eq!(created.len(), 3);

        let removed = apply_change(&created, Change::remove("r9")).expect("remove");
        assert_eq!(removed, start);
    }

    #[test]
    fn update_of_absent_entity_inserts_it() {
        let result =
            apply_change(&EntityCollection::default(), Change::update(room("r1", "Lobby")))
                .expect("upsert");
        assert_eq!(result.get("r1").map(|r| (**r).clone()), Some(room("r1", "Lobby")));
    }

    #[test]
    fn null_extra_fields_are_dropped_on_first_insert_and_on_update() {
        let incoming: Room =
            serde_json::from_value(serde_json::json!({"id": "r1", "color": null}))
                .expect("decode");

        let inserted =
            apply_change(&EntityCollection::default(), Change::update(incoming.clone()))
                .expect("insert");
        let stored = inserted.get("r1").expect("stored");
        assert!(stored.extra.is_empty());
        assert_eq!(
            serde_json::to_value(&**stored).expect("encode"),
            serde_json::json!({"id": "r1"})
        );

        let updated = apply_change(&lobby(), Change::update(incoming)).expect("update");
        assert!(updated.get("r1").expect("stored").extra.is_empty());
    }

    #[test]
    fn reset_batch_discards_prior_entities() {
        let result = apply_change(
            &lobby(),
            Change::batch(ChangeType::Create, vec![room("r7", "Vault")]).with_reset(),
        )
        .expect("reset");

        assert_eq!(result.ids().cloned().collect::<Vec<_>>(), vec![EntityId::from("r7")]);
    }

    #[test]
    fn reset_on_single_payload_also_clears() {
        let result = apply_change(&lobby(), Change::create(room("r7", "Vault")).with_reset())
            .expect("reset");
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn unchanged_update_returns_same_reference() {
        let start = lobby();
        let result = apply_change(&start, Change::update(room("r1", "Lobby"))).expect("update");
        assert!(result.ptr_eq(&start));
    }

    #[test]
    fn removing_absent_id_is_a_noop() {
        let start = lobby();
        let result = apply_change(&start, Change::remove("nope")).expect("remove");
        assert!(result.ptr_eq(&start));
    }

    #[test]
    fn later_batch_entries_win() {
        let result = apply_change(
            &EntityCollection::default(),
            Change::batch(
                ChangeType::Update,
                vec![room("r1", "First"), room("r1", "Second")],
            ),
        )
        .expect("batch");
        assert_eq!(result.get("r1").and_then(|r| r.room_name.clone()), Some("Second".to_string()));
    }

    #[test]
    fn batch_without_effect_returns_same_reference() {
        let start = lobby();
        let result = apply_change(
            &start,
            Change::batch(ChangeType::Remove, vec![Room::with_id("x"), Room::with_id("y")]),
        )
        .expect("batch");
        assert!(result.ptr_eq(&start));
    }

    #[test]
    fn batch_remove_drops_listed_ids() {
        let result = apply_change(
            &lobby(),
            Change::batch(ChangeType::Remove, vec![Room::with_id("r1")]),
        )
        .expect("batch remove");
        assert_eq!(result.ids().cloned().collect::<Vec<_>>(), vec![EntityId::from("r2")]);
    }

    #[test]
    fn missing_id_fails_without_applying_anything() {
        let start = lobby();
        let err = apply_change(
            &start,
            Change::batch(ChangeType::Create, vec![room("r5", "Ok"), Room::default()]),
        )
        .expect_err("missing id");

        assert_eq!(
            err,
            StoreError::MissingEntityId {
                kind: EntityKind::Rooms
            }
        );

        let err = apply_change(&EntityCollection::<Message>::default(), Change::create(Message::default()))
            .expect_err("missing id");
        assert_eq!(
            err,
            StoreError::MissingEntityId {
                kind: EntityKind::Messages
            }
        );
    }
}
