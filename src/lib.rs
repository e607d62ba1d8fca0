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

//! Chunked entity store
//!
//! Archetype-grouped entity/component storage with reactive change
//! detection. Entities are dynamically typed records grouped into
//! fixed-capacity structure-of-arrays chunks by the hash codes of their
//! component values; membership changes are batched into an explicit
//! per-tick commit, and a signal graph over monotonic version counters
//! tells consumers when to re-read.

pub mod atom;
pub mod chunk;
pub mod component;
pub mod entity;
pub mod error;
pub mod group;
pub mod handle;
pub mod prelude;
pub mod query;
pub mod signal;
pub mod storage;
pub mod store;
pub mod value;

mod version;


pub use atom::*;
pub use chunk::*;
pub use component::*;
pub use entity::*;
pub use error::*;
pub use group::*;
pub use handle::*;
pub use query::*;
pub use signal::*;
pub use storage::*;
pub use store::*;
pub use value::*;
