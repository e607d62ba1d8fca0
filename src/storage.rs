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

//! Concrete storage strategies
//!
//! Three strategies cover the store's needs: boxed any-value storage,
//! packed fixed-arity float storage (chunk-aware), and string-shape
//! interning for components whose archetype identity depends on the value.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::chunk::Chunk;
use crate::component::{Component, PackedStorage};
use crate::error::{Result, StoreError};
use crate::value::Value;

const UNREGISTERED: usize = usize::MAX;

/// Boxed-value storage: accepts any value, hash code 1 when present.
#[derive(Debug)]
pub struct ObjectComponent {
    index: usize,
}

impl ObjectComponent {
    pub fn new() -> Self {
        Self {
            index: UNREGISTERED,
        }
    }
}

impl Default for ObjectComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ObjectComponent {
    fn register(&mut self, index: usize) {
        self.index = index;
    }

    fn unregister(&mut self) {
        self.index = UNREGISTERED;
    }

    fn index(&self) -> usize {
        self.index
    }

    fn coerce(&self, value: Value) -> Result<Value> {
        Ok(value)
    }

    fn hash_code(&self, _value: &Value) -> Result<u32> {
        Ok(1)
    }
}

/// Packed-float storage: fixed-arity vectors living in chunk columns while
/// the entity is resident.
///
/// A lone float coerces to a 1-vector when `dimensions == 1`; everything
/// else of the wrong shape is rejected.
#[derive(Debug)]
pub struct VectorComponent {
    index: usize,
    dimensions: usize,
}

impl VectorComponent {
    /// # Panics
    /// Panics on zero dimensions.
    pub fn new(dimensions: usize) -> Self {
        assert!(dimensions >= 1, "VectorComponent needs at least 1 dimension");
        Self {
            index: UNREGISTERED,
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

impl Component for VectorComponent {
    fn register(&mut self, index: usize) {
        self.index = index;
    }

    fn unregister(&mut self) {
        self.index = UNREGISTERED;
    }

    fn index(&self) -> usize {
        self.index
    }

    fn coerce(&self, value: Value) -> Result<Value> {
        match value {
            Value::Vector(v) if v.len() == self.dimensions => Ok(Value::Vector(v)),
            Value::Float(f) if self.dimensions == 1 => {
                Ok(Value::Vector(SmallVec::from_slice(&[f as f32])))
            }
            Value::Int(i) if self.dimensions == 1 => {
                Ok(Value::Vector(SmallVec::from_slice(&[i as f32])))
            }
            other => Err(StoreError::InvalidValue(format!(
                "expected {}-float vector, got {}",
                self.dimensions,
                other.kind()
            ))),
        }
    }

    fn hash_code(&self, _value: &Value) -> Result<u32> {
        Ok(1)
    }

    fn packed(&self) -> Option<&dyn PackedStorage> {
        Some(self)
    }
}

impl PackedStorage for VectorComponent {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn init_chunk(&self, chunk: &mut Chunk, capacity: usize) {
        chunk.init_column(self.index, capacity * self.dimensions);
    }

    fn get_chunk(&self, chunk: &Chunk, offset: usize) -> Result<Value> {
        let column = chunk
            .column(self.index)
            .ok_or(StoreError::UninitializedColumn)?;
        let start = offset * self.dimensions;
        Ok(Value::Vector(SmallVec::from_slice(
            &column[start..start + self.dimensions],
        )))
    }

    fn set_chunk(&self, chunk: &mut Chunk, offset: usize, value: &Value) -> Result<()> {
        let floats = value.as_vector().ok_or_else(|| {
            StoreError::InvalidValue(format!(
                "expected {}-float vector, got {}",
                self.dimensions,
                value.kind()
            ))
        })?;
        if floats.len() != self.dimensions {
            return Err(StoreError::InvalidValue(format!(
                "expected {}-float vector, got {} floats",
                self.dimensions,
                floats.len()
            )));
        }
        let column = chunk
            .column_mut(self.index)
            .ok_or(StoreError::UninitializedColumn)?;
        let start = offset * self.dimensions;
        column[start..start + self.dimensions].copy_from_slice(floats);
        Ok(())
    }
}

/// Value-interning storage: classifies string shapes into a stable index
/// so entities sharing a shape share an archetype.
///
/// The intern table only grows; an index handed out for a shape is stable
/// for the component's lifetime.
#[derive(Debug)]
pub struct InternComponent {
    index: usize,
    shapes: RefCell<FxHashMap<String, u32>>,
}

impl InternComponent {
    pub fn new() -> Self {
        Self {
            index: UNREGISTERED,
            shapes: RefCell::new(FxHashMap::default()),
        }
    }

    /// Number of distinct shapes seen so far.
    pub fn shape_count(&self) -> usize {
        self.shapes.borrow().len()
    }
}

impl Default for InternComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for InternComponent {
    fn register(&mut self, index: usize) {
        self.index = index;
    }

    fn unregister(&mut self) {
        self.index = UNREGISTERED;
    }

    fn index(&self) -> usize {
        self.index
    }

    fn coerce(&self, value: Value) -> Result<Value> {
        match value {
            Value::Str(_) => Ok(value),
            other => Err(StoreError::InvalidValue(format!(
                "expected str shape, got {}",
                other.kind()
            ))),
        }
    }

    fn hash_code(&self, value: &Value) -> Result<u32> {
        let shape = value.as_str().ok_or_else(|| {
            StoreError::InvalidValue(format!("expected str shape, got {}", value.kind()))
        })?;
        let mut shapes = self.shapes.borrow_mut();
        let next = shapes.len() as u32 + 1;
        Ok(*shapes.entry(shape.to_string()).or_insert(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_accepts_anything() {
        let component = ObjectComponent::new();
        assert!(component.coerce(Value::Bool(true)).is_ok());
        assert!(component.coerce(Value::from("anything")).is_ok());
        assert_eq!(component.hash_code(&Value::Bool(true)).unwrap(), 1);
    }

    #[test]
    fn test_vector_coercion() {
        let component = VectorComponent::new(3);
        assert!(component.coerce(Value::from([1.0f32, 2.0, 3.0])).is_ok());
        assert!(matches!(
            component.coerce(Value::from([1.0f32, 2.0])),
            Err(StoreError::InvalidValue(_))
        ));
        assert!(matches!(
            component.coerce(Value::from("not a vector")),
            Err(StoreError::InvalidValue(_))
        ));

        let scalar = VectorComponent::new(1);
        assert_eq!(
            scalar.coerce(Value::Float(2.5)).unwrap(),
            Value::from([2.5f32])
        );
    }

    #[test]
    fn test_vector_chunk_round_trip() {
        let mut component = VectorComponent::new(2);
        component.register(0);

        let mut chunk = Chunk::new(4, 1);
        component.init_chunk(&mut chunk, 4);
        component
            .set_chunk(&mut chunk, 2, &Value::from([5.0f32, 6.0]))
            .unwrap();
        assert_eq!(
            component.get_chunk(&chunk, 2).unwrap(),
            Value::from([5.0f32, 6.0])
        );
    }

    #[test]
    fn test_set_chunk_before_init_fails() {
        let mut component = VectorComponent::new(2);
        component.register(0);
        let mut chunk = Chunk::new(4, 1);
        assert_eq!(
            component.set_chunk(&mut chunk, 0, &Value::from([0.0f32, 0.0])),
            Err(StoreError::UninitializedColumn)
        );
    }

    #[test]
    fn test_intern_indices_are_stable() {
        let component = InternComponent::new();
        let lambert = component.hash_code(&Value::from("lambert")).unwrap();
        let phong = component.hash_code(&Value::from("phong")).unwrap();
        assert_ne!(lambert, phong);
        assert_ne!(lambert, 0);
        assert_eq!(component.hash_code(&Value::from("lambert")).unwrap(), lambert);
        assert_eq!(component.shape_count(), 2);
    }

    #[test]
    fn test_intern_rejects_non_strings() {
        let component = InternComponent::new();
        assert!(matches!(
            component.hash_code(&Value::Float(1.0)),
            Err(StoreError::InvalidValue(_))
        ));
    }
}
