// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sf-adapters: boundary contracts the steward engine consumes, plus the
//! subprocess-backed implementations for git and worktrees.
//!
//! The task store, agent registry, dispatch service, and session manager
//! are external collaborators — this crate defines their contracts and
//! ships fake implementations behind the `test-support` feature. Git and
//! worktree operations are owned here and executed through argv-form
//! subprocess calls.

pub mod dispatch;
pub mod git;
pub mod local;
pub mod registry;
pub mod session;
pub mod store;
pub mod subprocess;
pub mod worktree;

pub use dispatch::{Dispatch, DispatchError, NoopDispatch};
pub use git::{escape_quotes, CliGit, GitError, GitOps, MergeOutcome, MergeRequest};
pub use local::LocalStore;
pub use registry::StewardRegistry;
pub use session::{
    NoopSessionManager, SessionError, SessionEvent, SessionManager, SessionOptions,
    SessionSpawn, SessionStatus, StopOptions,
};
pub use store::{Document, NewTask, StoreError, TaskFilter, TaskStore};
pub use subprocess::{run_with_timeout, CmdOutput, SubprocessError, GIT_TIMEOUT};
pub use worktree::{GitWorktrees, WorktreeManager};

#[cfg(any(test, feature = "test-support"))]
pub use dispatch::FakeDispatch;
#[cfg(any(test, feature = "test-support"))]
pub use git::FakeGit;
#[cfg(any(test, feature = "test-support"))]
pub use registry::FakeRegistry;
#[cfg(any(test, feature = "test-support"))]
pub use session::FakeSessionManager;
#[cfg(any(test, feature = "test-support"))]
pub use store::FakeTaskStore;
#[cfg(any(test, feature = "test-support"))]
pub use worktree::FakeWorktrees;
