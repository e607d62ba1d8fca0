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

//! Error types

use std::fmt;

/// Store error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Entity not found (dead or stale handle)
    EntityNotFound,

    /// Component name not registered
    ComponentNotFound(String),

    /// Value cannot be coerced to the component's stored representation
    InvalidValue(String),

    /// Chunk column accessed before the backing array was allocated
    UninitializedColumn,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::EntityNotFound => write!(f, "Entity not found"),
            StoreError::ComponentNotFound(name) => write!(f, "Component not found: {name}"),
            StoreError::InvalidValue(msg) => write!(f, "Invalid value: {msg}"),
            StoreError::UninitializedColumn => {
                write!(f, "Chunk column accessed before initialization")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
