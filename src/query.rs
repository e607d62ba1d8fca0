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

//! Query builder over the store's dual-path iteration.

use smallvec::SmallVec;

use crate::entity::Entity;
use crate::error::{Result, StoreError};
use crate::store::EntityStore;
use crate::value::Value;

/// Builder for filtered entity iteration.
///
/// `with` components must be present (their values are passed to the
/// callback in declaration order), `without` components must be absent.
/// Names are resolved at the terminal call; an unknown name yields
/// `ComponentNotFound` there rather than panicking mid-build.
pub struct EntityQuery<'s> {
    store: &'s EntityStore,
    with: SmallVec<[String; 4]>,
    without: SmallVec<[String; 4]>,
}

impl<'s> EntityQuery<'s> {
    pub(crate) fn new(store: &'s EntityStore) -> Self {
        Self {
            store,
            with: SmallVec::new(),
            without: SmallVec::new(),
        }
    }

    /// Require a component to be present.
    pub fn with(mut self, name: &str) -> Self {
        self.with.push(name.to_string());
        self
    }

    /// Require a component to be absent.
    pub fn without(mut self, name: &str) -> Self {
        self.without.push(name.to_string());
        self
    }

    /// Invoke the callback for every matching entity, committed or
    /// floating. Values correspond to the `with` components in order.
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&Entity, &[Value]),
    {
        let (with, without) = self.resolve()?;
        self.store.walk(&with, &without, &mut f);
        Ok(())
    }

    /// Count matching entities.
    pub fn count(&self) -> Result<usize> {
        let mut count = 0;
        self.for_each(|_, _| count += 1)?;
        Ok(count)
    }

    fn resolve(&self) -> Result<(SmallVec<[usize; 8]>, SmallVec<[usize; 8]>)> {
        let mut with: SmallVec<[usize; 8]> = SmallVec::new();
        let mut without: SmallVec<[usize; 8]> = SmallVec::new();
        for name in &self.with {
            with.push(
                self.store
                    .component_index(name)
                    .ok_or_else(|| StoreError::ComponentNotFound(name.clone()))?,
            );
        }
        for name in &self.without {
            without.push(
                self.store
                    .component_index(name)
                    .ok_or_else(|| StoreError::ComponentNotFound(name.clone()))?,
            );
        }
        Ok((with, without))
    }
}
