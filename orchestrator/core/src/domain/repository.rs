// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Board Repository Interface
//!
//! Persistence contract for boards between runs. A run can be started from a
//! previously saved board (resume) and its final board saved under a run id.
//! Implementations live in `crate::infrastructure::repositories`.

use crate::domain::board::{Board, BoardError};
use async_trait::async_trait;

#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// Load an independent copy of the board stored under `id`.
    async fn load(&self, id: &str) -> Result<Option<Board>, RepositoryError>;

    /// Save (create or replace) the board under `id`.
    async fn save(&self, id: &str, board: &Board) -> Result<(), RepositoryError>;

    /// Delete the board under `id`. Absent ids are a no-op.
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    async fn exists(&self, id: &str) -> Result<bool, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<BoardError> for RepositoryError {
    fn from(err: BoardError) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
