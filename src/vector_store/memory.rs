//! In-memory vector store implementation.
//!
//! Each course gets its own namespace behind its own lock, so ingesting one course
//! never blocks readers of another. Useful for testing and small datasets.

use super::{
    check_dimensions, group_by_course, is_valid_course_id, rank_chunks, validate_replacement,
    Chunk, DeleteScope, IndexedCourse, RetrievedMatch, SearchFilter, VectorStore,
};
use crate::error::{CoursebotError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// Chunks of one course, in insertion order.
#[derive(Debug, Default)]
struct CourseIndex {
    chunks: Vec<Chunk>,
    positions: HashMap<String, usize>,
}

impl CourseIndex {
    /// Dimension of the stored chunks that `keeps` says will survive the write.
    fn stored_dimension<F: Fn(&Chunk) -> bool>(&self, keeps: F) -> Option<usize> {
        self.chunks
            .iter()
            .find(|&c| keeps(c))
            .map(|c| c.embedding.len())
    }

    fn put(&mut self, chunk: Chunk) {
        match self.positions.get(&chunk.id) {
            Some(&pos) => self.chunks[pos] = chunk,
            None => {
                self.positions.insert(chunk.id.clone(), self.chunks.len());
                self.chunks.push(chunk);
            }
        }
    }

    fn remove_where<F: Fn(&Chunk) -> bool>(&mut self, predicate: F) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|c| !predicate(c));
        self.positions = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        before - self.chunks.len()
    }
}

/// In-memory vector store.
pub struct MemoryVectorStore {
    courses: RwLock<HashMap<String, Arc<RwLock<CourseIndex>>>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(HashMap::new()),
        }
    }

    fn lock_error<E: std::fmt::Display>(e: E) -> CoursebotError {
        CoursebotError::VectorStore(format!("Failed to acquire lock: {}", e))
    }

    fn course(&self, course_id: &str) -> Result<Option<Arc<RwLock<CourseIndex>>>> {
        let courses = self.courses.read().map_err(Self::lock_error)?;
        Ok(courses.get(course_id).cloned())
    }

    fn course_or_create(&self, course_id: &str) -> Result<Arc<RwLock<CourseIndex>>> {
        if let Some(index) = self.course(course_id)? {
            return Ok(index);
        }
        let mut courses = self.courses.write().map_err(Self::lock_error)?;
        Ok(courses.entry(course_id.to_string()).or_default().clone())
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, chunk: &Chunk) -> Result<()> {
        self.upsert_batch(std::slice::from_ref(chunk)).await.map(|_| ())
    }

    async fn upsert_batch(&self, chunks: &[Chunk]) -> Result<usize> {
        for chunk in chunks {
            chunk.validate()?;
        }

        // Lock every touched course in id order and check them all before writing any
        let mut groups = group_by_course(chunks);
        groups.sort_by_key(|(course_id, _)| *course_id);
        let indexes = groups
            .iter()
            .map(|(course_id, _)| self.course_or_create(course_id))
            .collect::<Result<Vec<_>>>()?;
        let mut guards = indexes
            .iter()
            .map(|index| index.write().map_err(Self::lock_error))
            .collect::<Result<Vec<_>>>()?;

        for ((course_id, group), index) in groups.iter().zip(&guards) {
            let ids: HashSet<&str> = group.iter().map(|c| c.id.as_str()).collect();
            let stored = index.stored_dimension(|c| !ids.contains(c.id.as_str()));
            check_dimensions(course_id, group, stored)?;
        }

        for ((_, group), index) in groups.iter().zip(guards.iter_mut()) {
            for chunk in group {
                index.put((*chunk).clone());
            }
        }
        Ok(chunks.len())
    }

    async fn replace_source(
        &self,
        course_id: &str,
        source_path: &str,
        chunks: &[Chunk],
    ) -> Result<usize> {
        validate_replacement(course_id, source_path, chunks)?;

        let index = self.course_or_create(course_id)?;
        let mut index = index.write().map_err(Self::lock_error)?;

        let ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        let incoming: Vec<&Chunk> = chunks.iter().collect();
        let stored =
            index.stored_dimension(|c| c.source_path != source_path && !ids.contains(c.id.as_str()));
        check_dimensions(course_id, &incoming, stored)?;

        index.remove_where(|c| c.source_path == source_path && !ids.contains(c.id.as_str()));
        for chunk in chunks {
            index.put(chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn search(
        &self,
        course_id: &str,
        query_embedding: &[f32],
        top_k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<RetrievedMatch>> {
        if !is_valid_course_id(course_id) || top_k == 0 {
            return Ok(Vec::new());
        }
        let Some(index) = self.course(course_id)? else {
            return Ok(Vec::new());
        };
        let index = index.read().map_err(Self::lock_error)?;
        Ok(rank_chunks(
            index.chunks.iter().cloned(),
            query_embedding,
            top_k,
            filter,
        ))
    }

    async fn delete(&self, course_id: &str, scope: &DeleteScope) -> Result<usize> {
        if let DeleteScope::Course = scope {
            let mut courses = self.courses.write().map_err(Self::lock_error)?;
            let Some(index) = courses.remove(course_id) else {
                return Ok(0);
            };
            let count = index.read().map_err(Self::lock_error)?.chunks.len();
            return Ok(count);
        }

        let Some(index) = self.course(course_id)? else {
            return Ok(0);
        };
        let mut index = index.write().map_err(Self::lock_error)?;
        let removed = match scope {
            DeleteScope::Chunk(id) => index.remove_where(|c| &c.id == id),
            DeleteScope::Source(path) => index.remove_where(|c| &c.source_path == path),
            DeleteScope::Course => 0,
        };
        Ok(removed)
    }

    async fn course_chunks(&self, course_id: &str) -> Result<Vec<Chunk>> {
        let Some(index) = self.course(course_id)? else {
            return Ok(Vec::new());
        };
        let index = index.read().map_err(Self::lock_error)?;
        Ok(index.chunks.clone())
    }

    async fn chunk_count(&self, course_id: &str) -> Result<usize> {
        let Some(index) = self.course(course_id)? else {
            return Ok(0);
        };
        let index = index.read().map_err(Self::lock_error)?;
        Ok(index.chunks.len())
    }

    async fn list_courses(&self) -> Result<Vec<IndexedCourse>> {
        let courses = self.courses.read().map_err(Self::lock_error)?;

        let mut listed = Vec::new();
        for (course_id, index) in courses.iter() {
            let index = index.read().map_err(Self::lock_error)?;
            let Some(latest) = index.chunks.iter().map(|c| c.indexed_at).max() else {
                continue;
            };
            let sources: HashSet<&str> = index
                .chunks
                .iter()
                .map(|c| c.source_path.as_str())
                .collect();
            listed.push(IndexedCourse {
                course_id: course_id.clone(),
                chunk_count: index.chunks.len() as u32,
                source_count: sources.len() as u32,
                indexed_at: latest,
            });
        }

        listed.sort_by(|a, b| a.course_id.cmp(&b.course_id));
        Ok(listed)
    }
}
