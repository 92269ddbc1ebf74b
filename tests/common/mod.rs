//! Shared fixtures: a minimal in-memory column store implementing the
//! bridge's store traits, plus a deterministic inline executor.
#![allow(dead_code)]

use std::any::{Any, TypeId};
use std::cell::UnsafeCell;
use std::sync::Arc;

use chunk_jobs::{ArchetypeID, ChunkAccess, ChunkID, ColumnRef, Executor, QueryChunks};

/// Heap-stable backing buffer for one test column.
///
/// Jobs access elements through raw pointers handed out via `ColumnRef`;
/// the `UnsafeCell` makes that mutation well-defined while the fixture
/// still holds the buffer.
pub struct ColumnBuffer<T> {
    cells: UnsafeCell<Vec<T>>,
}

// Access is serialized by the bridge's handle dependencies in every test.
unsafe impl<T: Send> Send for ColumnBuffer<T> {}
unsafe impl<T: Send> Sync for ColumnBuffer<T> {}

type ColumnProducer = Box<dyn Fn() -> ColumnRef>;

/// One fixture chunk: an entity count plus typed columns.
pub struct TestChunk {
    archetype: ArchetypeID,
    id: ChunkID,
    entities: usize,
    columns: Vec<(TypeId, ColumnProducer)>,
    buffers: Vec<(TypeId, Arc<dyn Any + Send + Sync>)>,
}

impl TestChunk {
    pub fn new(archetype: ArchetypeID, id: ChunkID, entities: usize) -> Self {
        Self {
            archetype,
            id,
            entities,
            columns: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Adds a column of type `T` holding `values`.
    pub fn with_column<T: Clone + Send + Sync + 'static>(mut self, values: Vec<T>) -> Self {
        assert!(
            values.len() >= self.entities,
            "column shorter than chunk entity count"
        );
        let buffer = Arc::new(ColumnBuffer {
            cells: UnsafeCell::new(values),
        });
        self.buffers
            .push((TypeId::of::<T>(), Arc::clone(&buffer) as Arc<dyn Any + Send + Sync>));

        let producer_buffer = Arc::clone(&buffer);
        self.columns.push((
            TypeId::of::<T>(),
            Box::new(move || {
                let vec = unsafe { &mut *producer_buffer.cells.get() };
                let keep_alive = Arc::clone(&producer_buffer) as Arc<dyn Any + Send + Sync>;
                unsafe { ColumnRef::from_raw_parts(vec.as_mut_ptr(), vec.len(), keep_alive) }
            }),
        ));
        self
    }

    /// Copies the current contents of the `T` column out of the fixture.
    pub fn snapshot<T: Clone + Send + Sync + 'static>(&self) -> Vec<T> {
        let buffer = self.backing::<T>();
        let vec = unsafe { &*buffer.cells.get() };
        vec.clone()
    }

    /// The typed backing buffer for column `T`.
    pub fn backing<T: Send + Sync + 'static>(&self) -> Arc<ColumnBuffer<T>> {
        let (_, erased) = self
            .buffers
            .iter()
            .find(|(element, _)| *element == TypeId::of::<T>())
            .expect("fixture chunk has no such column");
        Arc::clone(erased)
            .downcast::<ColumnBuffer<T>>()
            .expect("fixture column type mismatch")
    }

    /// Strong count of the `T` column's backing buffer. Rises while the
    /// bridge holds a pin on it.
    pub fn backing_strong_count<T: Send + Sync + 'static>(&self) -> usize {
        let buffer = self.backing::<T>();
        // Subtract the count added by this call itself.
        Arc::strong_count(&buffer) - 1
    }
}

impl ChunkAccess for TestChunk {
    fn entity_count(&self) -> usize {
        self.entities
    }

    fn archetype_id(&self) -> ArchetypeID {
        self.archetype
    }

    fn chunk_id(&self) -> ChunkID {
        self.id
    }

    fn has_column(&self, element: TypeId) -> bool {
        self.columns.iter().any(|(id, _)| *id == element)
    }

    fn column(&self, element: TypeId) -> Option<ColumnRef> {
        self.columns
            .iter()
            .find(|(id, _)| *id == element)
            .map(|(_, produce)| produce())
    }
}

/// A resolved fixture query: a plain list of chunks.
#[derive(Default)]
pub struct TestQuery {
    pub chunks: Vec<TestChunk>,
}

impl TestQuery {
    pub fn new(chunks: Vec<TestChunk>) -> Self {
        Self { chunks }
    }
}

impl QueryChunks for TestQuery {
    fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    fn for_each_chunk(&self, visit: &mut dyn FnMut(&dyn ChunkAccess)) {
        for chunk in &self.chunks {
            visit(chunk);
        }
    }
}

/// Executor that runs work on the submitting thread.
///
/// Makes scheduling fully deterministic: work runs either during
/// `JobRuntime::flush` (dependencies already satisfied) or on the thread
/// that completes the last dependency.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, work: Box<dyn FnOnce() + Send>) {
        work();
    }
}
