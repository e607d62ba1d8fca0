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

//! Entity handles.

use serde::{Deserialize, Serialize};

/// Stable entity identity: an id slot plus the generation it was issued at.
///
/// A handle resolves only while its slot's generation still matches. Reusing
/// an id bumps the generation, which invalidates every handle issued to that
/// id before the reuse (the ABA problem).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Handle {
    pub id: u32,
    pub generation: u32,
}

impl Handle {
    /// Create a handle from raw parts.
    pub const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }
}
