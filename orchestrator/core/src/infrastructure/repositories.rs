// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Board repository implementations
//!
//! - **InMemoryBoardRepository** - process-local store for tests, resumable
//!   CLI sessions and development

use crate::domain::board::Board;
use crate::domain::repository::{BoardRepository, RepositoryError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Stores board snapshots (JSON bytes) keyed by run id.
///
/// Boards are serialized on save and restored on load, so callers never
/// share state with the stored copy.
#[derive(Clone, Default)]
pub struct InMemoryBoardRepository {
    boards: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryBoardRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.boards.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.read().is_empty()
    }
}

#[async_trait]
impl BoardRepository for InMemoryBoardRepository {
    async fn load(&self, id: &str) -> Result<Option<Board>, RepositoryError> {
        let snapshot = self.boards.read().get(id).cloned();
        snapshot
            .map(|bytes| Board::restore(&bytes))
            .transpose()
            .map_err(RepositoryError::from)
    }

    async fn save(&self, id: &str, board: &Board) -> Result<(), RepositoryError> {
        let bytes = board.snapshot()?;
        self.boards.write().insert(id.to_string(), bytes);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.boards.write().remove(id);
        Ok(())
    }

    async fn exists(&self, id: &str) -> Result<bool, RepositoryError> {
        Ok(self.boards.read().contains_key(id))
    }
}
