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

//! Versioned value cells.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::signal::{Signal, UpstreamSignal};
use crate::value::Value;
use crate::version::Versions;

/// Find-or-create key for [`crate::store::EntityStore::atom`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtomDescriptor {
    pub name: String,
    pub default_state: Value,
}

impl AtomDescriptor {
    pub fn new(name: impl Into<String>, default_state: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default_state: default_state.into(),
        }
    }
}

/// A single versioned value cell participating in the signal graph without
/// being attached to any entity.
///
/// For reactive purposes an atom behaves exactly like a component value: its
/// signal derives from the store's master signal, filtered to the atom's own
/// version, so consumers wake only when this cell actually advanced.
#[derive(Clone)]
pub struct Atom {
    inner: Rc<AtomInner>,
}

struct AtomInner {
    name: String,
    state: RefCell<Value>,
    version: Rc<Cell<u64>>,
    versions: Rc<Versions>,
    signal: UpstreamSignal,
}

impl Atom {
    pub(crate) fn new(
        name: String,
        default_state: Value,
        versions: Rc<Versions>,
        upstream: Signal,
    ) -> Self {
        let version = Rc::new(Cell::new(0u64));
        let signal = UpstreamSignal::new(upstream, {
            let version = version.clone();
            move || version.get()
        });
        Self {
            inner: Rc::new(AtomInner {
                name,
                state: RefCell::new(default_state),
                version,
                versions,
                signal,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn state(&self) -> Value {
        self.inner.state.borrow().clone()
    }

    /// Replace the state and advance the cell's version. The notification
    /// reaches subscribers at the store's next commit, not inline.
    pub fn set_state(&self, value: impl Into<Value>) {
        *self.inner.state.borrow_mut() = value.into();
        self.inner.version.set(self.inner.versions.bump_master());
    }

    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub fn signal(&self) -> Signal {
        self.inner.signal.signal()
    }
}
