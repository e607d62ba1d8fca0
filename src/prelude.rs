//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use chunk_store::prelude::*;
//! ```

pub use crate::atom::{Atom, AtomDescriptor};
pub use crate::component::{Component, PackedStorage};
pub use crate::entity::{Entity, EntityLocation};
pub use crate::error::{Result, StoreError};
pub use crate::handle::Handle;
pub use crate::signal::{Signal, Subscription, UpstreamSignal};
pub use crate::storage::{InternComponent, ObjectComponent, VectorComponent};
pub use crate::store::EntityStore;
pub use crate::value::Value;
