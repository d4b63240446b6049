// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors.
//!
//! Domain outcomes (failed tests, merge conflicts) are values on their
//! result types, not errors. `EngineError` covers the infrastructure
//! surprises: missing records, store/session/git failures.

use sf_core::AgentId;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("steward not found: {0}")]
    StewardNotFound(AgentId),
    #[error("no active docs session")]
    NoActiveDocsSession,
    #[error(transparent)]
    Store(#[from] sf_adapters::StoreError),
    #[error(transparent)]
    Session(#[from] sf_adapters::SessionError),
    #[error(transparent)]
    Git(#[from] sf_adapters::GitError),
}
