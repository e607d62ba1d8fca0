// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Store: central entity, component and group storage

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::atom::{Atom, AtomDescriptor};
use crate::component::Component;
use crate::entity::{Entity, EntityLocation};
use crate::error::{Result, StoreError};
use crate::group::{Group, HashVector};
use crate::handle::Handle;
use crate::query::EntityQuery;
use crate::signal::{ComponentSignalMapper, Signal};
use crate::value::Value;
use crate::version::Versions;

/// Central entity/component store.
///
/// Owns the component registry, the entity table and free-id pool, the
/// archetype groups with their chunks, the floating queue and the version
/// counters. Mutations take effect immediately on the entity; archetype
/// membership is reconciled once per tick by [`EntityStore::commit`].
pub struct EntityStore {
    components: Vec<Box<dyn Component>>,
    component_names: AHashMap<String, usize>,

    entities: Vec<Entity>,
    free: Vec<u32>,
    floating: Vec<Handle>,

    groups: Vec<Group>,
    group_buckets: AHashMap<u64, SmallVec<[usize; 2]>>,

    atoms: AHashMap<String, Atom>,
    mappers: RefCell<FxHashMap<u32, ComponentSignalMapper>>,

    versions: Rc<Versions>,
    signal: Signal,
    emitted: u64,
}

impl EntityStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            component_names: AHashMap::new(),
            entities: Vec::new(),
            free: Vec::new(),
            floating: Vec::new(),
            groups: Vec::with_capacity(16),
            group_buckets: AHashMap::with_capacity(16),
            atoms: AHashMap::new(),
            mappers: RefCell::new(FxHashMap::default()),
            versions: Rc::new(Versions::default()),
            signal: Signal::new(),
            emitted: 0,
        }
    }

    // ========== Component registry ==========

    /// Register a storage strategy under `name` and assign it the next
    /// index. Indices are monotonic and never reused.
    ///
    /// # Panics
    /// Panics on a duplicate name or on registration after entities exist;
    /// both are setup-time programmer errors, not runtime conditions.
    pub fn register_component(
        &mut self,
        name: impl Into<String>,
        mut component: Box<dyn Component>,
    ) -> usize {
        let name = name.into();
        if self.component_names.contains_key(&name) {
            panic!("Duplicate component registration: {name}");
        }
        if !self.entities.is_empty() {
            panic!("Component registered after entities exist: {name}");
        }
        let index = self.components.len();
        component.register(index);
        debug!(name = %name, index, "component registered");
        self.components.push(component);
        self.component_names.insert(name, index);
        index
    }

    /// Register several strategies at once, in iteration order.
    pub fn register_components<N, I>(&mut self, components: I)
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Box<dyn Component>)>,
    {
        for (name, component) in components {
            self.register_component(name, component);
        }
    }

    /// Registration index for a component name.
    pub fn component_index(&self, name: &str) -> Option<usize> {
        self.component_names.get(name).copied()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // ========== Entity lifecycle ==========

    /// Create an entity, reusing a pooled id when one is available.
    ///
    /// A reused id comes back with its generation incremented, which
    /// invalidates every handle issued to it before the reuse. New entities
    /// always start floating.
    pub fn create(&mut self) -> Handle {
        let handle = if let Some(id) = self.free.pop() {
            let entity = &mut self.entities[id as usize];
            let generation = entity.handle().generation + 1;
            entity.reset(Handle::new(id, generation), self.components.len());
            entity.handle()
        } else {
            let id = self.entities.len() as u32;
            let handle = Handle::new(id, 0);
            self.entities.push(Entity::new(handle, self.components.len()));
            handle
        };
        self.floating.push(handle);
        self.versions.bump_master();
        trace!(id = handle.id, generation = handle.generation, "entity created");
        handle
    }

    /// Resolve a handle. Returns `None` when the id is out of range, the
    /// slot is deleted, or the generation does not match; lookups are a
    /// query, not an assertion.
    pub fn get(&self, handle: Handle) -> Option<&Entity> {
        let entity = self.entities.get(handle.id as usize)?;
        if entity.is_deleted() || entity.handle() != handle {
            return None;
        }
        Some(entity)
    }

    /// Destroy an entity. Silently no-ops when the handle is already
    /// invalid. The chunk slot is cleared without copy-back; the id goes
    /// back to the pool and physical reuse is deferred to the next
    /// [`EntityStore::create`].
    pub fn destroy(&mut self, handle: Handle) {
        let Some(entity) = self.entities.get_mut(handle.id as usize) else {
            return;
        };
        if entity.is_deleted() || entity.handle() != handle {
            return;
        }
        if !entity.is_floating() {
            if let Some(location) = entity.location() {
                let group = &mut self.groups[location.group];
                let release = group.chunk_mut(location.chunk).release(location.offset);
                group.note_release(location.chunk, release);
            }
        }
        entity.mark_deleted();
        self.free.push(handle.id);
        self.mappers.borrow_mut().remove(&handle.id);
        self.versions.forget_entity(handle.id);
        self.versions.bump_master();
        trace!(id = handle.id, "entity destroyed");
    }

    /// Live (non-deleted) entity count.
    pub fn entity_count(&self) -> usize {
        self.entities.len() - self.free.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    // ========== Component values ==========

    /// Set a component value on an entity.
    ///
    /// The value is coerced by the strategy (`InvalidValue` on failure).
    /// When the write changes the component's hash code the entity is
    /// re-floated and re-grouped at the next commit; a chunk-resident write
    /// that keeps the hash code goes straight into the packed column.
    pub fn set_component(
        &mut self,
        handle: Handle,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let index = self
            .component_index(name)
            .ok_or_else(|| StoreError::ComponentNotFound(name.to_string()))?;
        self.set_by_index(handle, index, value.into())
    }

    fn set_by_index(&mut self, handle: Handle, index: usize, value: Value) -> Result<()> {
        if self.get(handle).is_none() {
            return Err(StoreError::EntityNotFound);
        }
        let component = &self.components[index];
        let value = component.coerce(value)?;
        let new_hash = component.hash_code(&value)?;

        let entity = &mut self.entities[handle.id as usize];
        let old_hash = entity.hash_code(index);
        let resident = !entity.is_floating();

        if resident && new_hash == old_hash {
            if let Some(packed) = component.packed() {
                // in-place column write: no archetype change, no re-float
                if let Some(location) = entity.location() {
                    let chunk = self.groups[location.group].chunk_mut(location.chunk);
                    packed.set_chunk(chunk, location.offset, &value)?;
                    self.versions.bump_component(handle.id, index as u32);
                    return Ok(());
                }
            }
        }
        if resident && new_hash != old_hash {
            Self::float_entity(&mut self.groups, &self.components, entity)?;
            self.floating.push(handle);
        }
        entity.set_raw(index, value);
        entity.set_hash(index, new_hash);
        self.versions.bump_component(handle.id, index as u32);
        Ok(())
    }

    /// Remove a component value from an entity. Removing an absent
    /// component is a no-op.
    pub fn remove_component(&mut self, handle: Handle, name: &str) -> Result<()> {
        let index = self
            .component_index(name)
            .ok_or_else(|| StoreError::ComponentNotFound(name.to_string()))?;
        if self.get(handle).is_none() {
            return Err(StoreError::EntityNotFound);
        }
        let entity = &mut self.entities[handle.id as usize];
        if entity.hash_code(index) == 0 {
            return Ok(());
        }
        if !entity.is_floating() {
            Self::float_entity(&mut self.groups, &self.components, entity)?;
            self.floating.push(handle);
        }
        self.components[index].delete(entity);
        entity.set_hash(index, 0);
        self.versions.bump_component(handle.id, index as u32);
        Ok(())
    }

    /// Read a component value. Chunk-resident packed values are read from
    /// the column, everything else from the entity's slot array.
    pub fn get_component(&self, handle: Handle, name: &str) -> Option<Value> {
        let index = self.component_index(name)?;
        let entity = self.get(handle)?;
        self.read_value(entity, index)
    }

    fn read_value(&self, entity: &Entity, index: usize) -> Option<Value> {
        if !entity.is_floating() && entity.hash_code(index) != 0 {
            if let Some(packed) = self.components[index].packed() {
                if let Some(location) = entity.location() {
                    let chunk = self.groups[location.group].chunk(location.chunk);
                    return packed.get_chunk(chunk, location.offset).ok();
                }
            }
        }
        entity.raw(index).cloned()
    }

    /// Pull packed values back into the slot array and vacate the chunk
    /// slot. The entity's recorded location is intentionally left stale
    /// until the next commit reassigns it.
    fn float_entity(
        groups: &mut [Group],
        components: &[Box<dyn Component>],
        entity: &mut Entity,
    ) -> Result<()> {
        if let Some(location) = entity.location() {
            let group = &mut groups[location.group];
            {
                let chunk = group.chunk_mut(location.chunk);
                for component in components {
                    if let Some(packed) = component.packed() {
                        if entity.hash_code(component.index()) != 0 {
                            let value = packed.get_chunk(chunk, location.offset)?;
                            entity.set_raw(component.index(), value);
                        }
                    }
                }
            }
            let release = group.chunk_mut(location.chunk).release(location.offset);
            group.note_release(location.chunk, release);
        }
        entity.set_floating(true);
        Ok(())
    }

    // ========== Commit ==========

    /// The commit barrier (the sort phase), intended to be called exactly
    /// once per tick by the owning scheduler.
    ///
    /// Drains the floating queue and resolves every still-valid floating
    /// entity into its current archetype's group and chunk. This is the only
    /// place membership changes: fast-path iteration reflects archetype
    /// changes made before the most recent commit, the floating path
    /// reflects all changes immediately. Ends by emitting the master signal
    /// once if the store version advanced.
    pub fn commit(&mut self) {
        let queue = std::mem::take(&mut self.floating);
        let drained = queue.len();
        for handle in queue {
            let Some(entity) = self.entities.get(handle.id as usize) else {
                continue;
            };
            if entity.is_deleted() || entity.handle() != handle || !entity.is_floating() {
                continue;
            }
            let group = self.resolve_group(handle.id as usize);
            self.place(handle.id as usize, group);
        }
        trace!(drained, groups = self.groups.len(), "commit");

        if self.versions.master() > self.emitted {
            self.emitted = self.versions.master();
            self.signal.emit();
        }
    }

    /// Find or create the group for an entity's current hash vector.
    ///
    /// Candidates are bucketed by a coarse rolling hash; the bucket list is
    /// linear-scanned with an element-wise comparison to resolve collisions.
    fn resolve_group(&mut self, entity: usize) -> usize {
        let hashes: HashVector = SmallVec::from_slice(self.entities[entity].hashes());
        let mut combined: u64 = 0;
        for &hash in &hashes {
            combined = combined.wrapping_mul(7).wrapping_add(hash as u64);
        }
        let bucket = self.group_buckets.entry(combined).or_default();
        for &candidate in bucket.iter() {
            if self.groups[candidate].matches(&hashes) {
                return candidate;
            }
        }
        let index = self.groups.len();
        debug!(group = index, hashes = ?hashes, "group created");
        self.groups.push(Group::new(hashes));
        bucket.push(index);
        index
    }

    /// Allocate an entity into its group's available chunk, growing one
    /// when none has free capacity.
    fn place(&mut self, entity_index: usize, group_index: usize) {
        let components = &self.components;
        let group = &mut self.groups[group_index];

        let chunk_index = match group.available_chunk() {
            Some(index) => index,
            None => {
                let group_hashes: HashVector = SmallVec::from_slice(group.hashes());
                group.grow(components.len(), |chunk| {
                    let capacity = chunk.capacity();
                    for component in components.iter() {
                        if let Some(packed) = component.packed() {
                            if group_hashes[component.index()] != 0 {
                                packed.init_chunk(chunk, capacity);
                            }
                        }
                    }
                })
            }
        };

        let entity = &mut self.entities[entity_index];
        let offset = group
            .chunk_mut(chunk_index)
            .claim(entity.handle().id)
            .expect("available chunk has a free slot");
        for component in components.iter() {
            if let Some(packed) = component.packed() {
                if entity.hash_code(component.index()) != 0 {
                    if let Some(value) = entity.take_raw(component.index()) {
                        packed
                            .set_chunk(group.chunk_mut(chunk_index), offset, &value)
                            .expect("chunk column initialized at grow");
                    }
                }
            }
        }
        if group.chunk(chunk_index).is_full() {
            group.note_full(chunk_index);
        }
        entity.set_location(Some(EntityLocation {
            group: group_index,
            chunk: chunk_index,
            offset,
        }));
        entity.set_floating(false);
    }

    // ========== Iteration ==========

    /// Iterate all non-deleted entities.
    pub fn for_each<F: FnMut(&Entity)>(&self, mut f: F) {
        for entity in &self.entities {
            if !entity.is_deleted() {
                f(entity);
            }
        }
    }

    /// Iterate entities holding non-null values for every named component.
    ///
    /// Fast path first: groups whose hash vector is non-zero at every
    /// requested index, walked chunk by chunk. Then the floating queue with
    /// the identical per-entity check, so entities mutated since the last
    /// commit are not invisible until the next one. Values are passed in
    /// the order the names were given.
    pub fn for_each_with<F>(&self, names: &[&str], mut f: F) -> Result<()>
    where
        F: FnMut(&Entity, &[Value]),
    {
        let mut with: SmallVec<[usize; 8]> = SmallVec::new();
        for name in names {
            with.push(
                self.component_index(name)
                    .ok_or_else(|| StoreError::ComponentNotFound((*name).to_string()))?,
            );
        }
        self.walk(&with, &[], &mut f);
        Ok(())
    }

    /// Start a query builder.
    pub fn query(&self) -> EntityQuery<'_> {
        EntityQuery::new(self)
    }

    pub(crate) fn walk(
        &self,
        with: &[usize],
        without: &[usize],
        f: &mut dyn FnMut(&Entity, &[Value]),
    ) {
        let mut values: SmallVec<[Value; 8]> = SmallVec::new();

        for group in &self.groups {
            if !with.iter().all(|&i| group.hashes()[i] != 0) {
                continue;
            }
            if !without.iter().all(|&i| group.hashes()[i] == 0) {
                continue;
            }
            for chunk in group.chunks() {
                for slot in chunk.entities() {
                    let Some(id) = slot else { continue };
                    let entity = &self.entities[*id as usize];
                    if self.gather(entity, with, &mut values) {
                        f(entity, &values);
                    }
                }
            }
        }

        for handle in &self.floating {
            let Some(entity) = self.get(*handle) else {
                continue;
            };
            if !entity.is_floating() {
                continue;
            }
            if !with.iter().all(|&i| entity.hash_code(i) != 0) {
                continue;
            }
            if !without.iter().all(|&i| entity.hash_code(i) == 0) {
                continue;
            }
            if self.gather(entity, with, &mut values) {
                f(entity, &values);
            }
        }
    }

    fn gather(&self, entity: &Entity, with: &[usize], values: &mut SmallVec<[Value; 8]>) -> bool {
        values.clear();
        for &index in with {
            match self.read_value(entity, index) {
                Some(value) => values.push(value),
                None => return false,
            }
        }
        true
    }

    // ========== Signals ==========

    /// The master signal, emitted once per commit when the store version
    /// advanced.
    pub fn signal(&self) -> Signal {
        self.signal.clone()
    }

    /// Current master version.
    pub fn version(&self) -> u64 {
        self.versions.master()
    }

    /// Find or create the named atom.
    pub fn atom(&mut self, descriptor: &AtomDescriptor) -> Atom {
        if let Some(atom) = self.atoms.get(&descriptor.name) {
            return atom.clone();
        }
        let atom = Atom::new(
            descriptor.name.clone(),
            descriptor.default_state.clone(),
            self.versions.clone(),
            self.signal.clone(),
        );
        self.atoms.insert(descriptor.name.clone(), atom.clone());
        atom
    }

    /// Per-entity signal mapper; one cached derived signal per component.
    pub fn component_signals(&self, handle: Handle) -> Option<ComponentSignalMapper> {
        self.get(handle)?;
        let mut mappers = self.mappers.borrow_mut();
        let mapper = mappers.entry(handle.id).or_insert_with(|| {
            ComponentSignalMapper::new(handle.id, self.signal.clone(), self.versions.clone())
        });
        Some(mapper.clone())
    }

    /// Derived signal for one component on one entity: wakes only when that
    /// component's version advances.
    pub fn component_signal(&self, handle: Handle, name: &str) -> Option<Signal> {
        let index = self.component_index(name)?;
        let mapper = self.component_signals(handle)?;
        Some(mapper.signal(index))
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
