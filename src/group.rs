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

//! Archetype groups: chunks sharing one exact hash-code vector.

use smallvec::SmallVec;
use tracing::trace;

use crate::chunk::{Chunk, SlotRelease};

/// Per-component hash-code vector identifying an archetype.
pub type HashVector = SmallVec<[u32; 8]>;

/// Capacity schedule: the first 5 chunks of a group get 32 slots, after
/// which capacity doubles per chunk index up to the 2048 cap.
pub(crate) fn capacity_for(chunk_index: usize) -> usize {
    if chunk_index < 5 {
        32
    } else {
        1usize << chunk_index.min(11)
    }
}

/// The set of chunks sharing one exact per-component hash-code vector.
///
/// Groups are created lazily the first time a hash vector is seen and
/// persist for the store's lifetime. The `available` list tracks chunks
/// with free capacity; a chunk that drains to zero occupancy is evicted
/// from it and never reused.
#[derive(Debug)]
pub struct Group {
    hashes: HashVector,
    chunks: Vec<Chunk>,
    available: Vec<usize>,
}

impl Group {
    pub(crate) fn new(hashes: HashVector) -> Self {
        Self {
            hashes,
            chunks: Vec::new(),
            available: Vec::new(),
        }
    }

    /// The archetype identity vector (0 = component absent).
    pub fn hashes(&self) -> &[u32] {
        &self.hashes
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> &Chunk {
        &self.chunks[index]
    }

    pub(crate) fn chunk_mut(&mut self, index: usize) -> &mut Chunk {
        &mut self.chunks[index]
    }

    /// Element-wise archetype match (resolves coarse-hash collisions).
    pub(crate) fn matches(&self, hashes: &[u32]) -> bool {
        self.hashes.as_slice() == hashes
    }

    /// Index of a chunk with free capacity, if any.
    pub(crate) fn available_chunk(&self) -> Option<usize> {
        self.available.last().copied()
    }

    /// Grow a new chunk; `init` allocates its packed columns.
    pub(crate) fn grow<F: FnOnce(&mut Chunk)>(&mut self, components: usize, init: F) -> usize {
        let index = self.chunks.len();
        let capacity = capacity_for(index);
        let mut chunk = Chunk::new(capacity, components);
        init(&mut chunk);
        self.chunks.push(chunk);
        self.available.push(index);
        trace!(chunk = index, capacity, "chunk grown");
        index
    }

    pub(crate) fn note_full(&mut self, chunk: usize) {
        self.available.retain(|&c| c != chunk);
    }

    pub(crate) fn note_release(&mut self, chunk: usize, release: SlotRelease) {
        if release.was_full {
            self.available.push(chunk);
        }
        if release.now_empty {
            self.available.retain(|&c| c != chunk);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_capacity_schedule() {
        for index in 0..5 {
            assert_eq!(capacity_for(index), 32);
        }
        assert_eq!(capacity_for(5), 32);
        assert_eq!(capacity_for(6), 64);
        assert_eq!(capacity_for(10), 1024);
        assert_eq!(capacity_for(11), 2048);
        assert_eq!(capacity_for(12), 2048);
        assert_eq!(capacity_for(40), 2048);
    }

    #[test]
    fn test_empty_chunk_evicted_from_available() {
        let mut group = Group::new(smallvec![1, 0]);
        let chunk = group.grow(2, |_| {});
        let offset = group.chunk_mut(chunk).claim(7).unwrap();
        assert_eq!(group.available_chunk(), Some(chunk));

        let release = group.chunk_mut(chunk).release(offset);
        group.note_release(chunk, release);
        assert_eq!(group.available_chunk(), None);
    }

    #[test]
    fn test_full_chunk_returns_on_release() {
        let mut group = Group::new(smallvec![1]);
        let chunk = group.grow(1, |_| {});
        for id in 0..32 {
            group.chunk_mut(chunk).claim(id).unwrap();
        }
        group.note_full(chunk);
        assert_eq!(group.available_chunk(), None);

        let release = group.chunk_mut(chunk).release(3);
        group.note_release(chunk, release);
        assert_eq!(group.available_chunk(), Some(chunk));
    }
}
