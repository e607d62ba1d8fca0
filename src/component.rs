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

//! Component contract
//!
//! Components are storage strategies registered into a store. A component
//! owns no entities; the store invokes it to coerce values, classify them
//! for archetype grouping and move them in and out of chunk columns.

use crate::chunk::Chunk;
use crate::entity::Entity;
use crate::error::Result;
use crate::value::Value;

/// Contract implemented by every registered storage strategy.
///
/// The index is assigned at registration time and immutable afterwards;
/// indices are monotonic and never reused. The provided `get`/`set`/`delete`
/// operate on the entity's sparse slot array; values of chunk-resident
/// entities for packed components are read through the store instead.
pub trait Component {
    /// Bind the component to its registration index.
    fn register(&mut self, index: usize);

    /// Release the registration binding.
    fn unregister(&mut self);

    /// Registration index assigned by the store.
    fn index(&self) -> usize;

    /// Normalize a value to the stored representation.
    ///
    /// Fails with [`crate::error::StoreError::InvalidValue`] when the value
    /// cannot be coerced.
    fn coerce(&self, value: Value) -> Result<Value>;

    /// Integer classification of a value for archetype purposes.
    ///
    /// Must be a pure function of the value's shape, stable across calls.
    /// Zero is reserved for "absent" and never returned for a live value.
    fn hash_code(&self, value: &Value) -> Result<u32>;

    /// Structure-of-arrays capability, for strategies that pack
    /// chunk-resident values into a column.
    fn packed(&self) -> Option<&dyn PackedStorage> {
        None
    }

    /// Read the sparse value.
    fn get<'a>(&self, entity: &'a Entity) -> Option<&'a Value> {
        entity.raw(self.index())
    }

    /// Coerce and write the sparse value.
    fn set(&self, entity: &mut Entity, value: Value) -> Result<()> {
        let value = self.coerce(value)?;
        entity.set_raw(self.index(), value);
        Ok(())
    }

    /// Remove the sparse value, returning it.
    fn delete(&self, entity: &mut Entity) -> Option<Value> {
        entity.take_raw(self.index())
    }
}

/// Chunk-packing capability.
///
/// Opting in moves the component's values for chunk-resident entities out of
/// the entity slot array and into one packed array per chunk.
pub trait PackedStorage {
    /// Number of floats stored per entity.
    fn dimensions(&self) -> usize;

    /// Allocate the backing column for a freshly grown chunk.
    fn init_chunk(&self, chunk: &mut Chunk, capacity: usize);

    /// Read the packed value at `offset`.
    fn get_chunk(&self, chunk: &Chunk, offset: usize) -> Result<Value>;

    /// Write a packed value at `offset`.
    ///
    /// Fails with [`crate::error::StoreError::UninitializedColumn`] when
    /// called before `init_chunk` allocated the backing array.
    fn set_chunk(&self, chunk: &mut Chunk, offset: usize, value: &Value) -> Result<()>;
}
