// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed identifier newtypes.
//!
//! Every id the subsystem handles is an opaque string minted elsewhere (the
//! entity store, the session manager) or composed locally from a prefix and
//! a random suffix. Ids are small and copied freely, so they are backed by
//! [`smol_str::SmolStr`].

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    if s.len() <= n {
        s
    } else {
        &s[..n]
    }
}

/// Define a newtype id wrapper around [`SmolStr`] with a type prefix.
///
/// Generates `new()` for random id generation, `from_string()` for ids
/// minted elsewhere, `as_str()`, `short()`, `Display`, `From` conversions,
/// `PartialEq<str>`, and `Borrow<str>` so the id can key a `HashMap<_, V>`
/// looked up by `&str`.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the id type.
///     pub struct TaskId("task-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(smol_str::SmolStr);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random id with the type prefix.
            pub fn new() -> Self {
                Self(smol_str::SmolStr::new(format!(
                    "{}{}",
                    Self::PREFIX,
                    nanoid::nanoid!(12)
                )))
            }

            /// Create an id from an existing string (store-minted ids).
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self(smol_str::SmolStr::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// Returns the id truncated to at most `n` characters.
            pub fn short(&self, n: usize) -> &str {
                $crate::id::short(self.0.as_str(), n)
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0.as_str() == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

define_id! {
    /// Identifier of an agent entity. Stewards are agents, so steward ids
    /// share this type with assignees and notification targets.
    pub struct AgentId("agt-");
}

define_id! {
    /// Identifier of a task in the entity store.
    pub struct TaskId("task-");
}

define_id! {
    /// Identifier of a document in the entity store (playbooks, role prompts).
    pub struct DocumentId("doc-");
}

define_id! {
    /// Identifier of an agent's message channel.
    pub struct ChannelId("chan-");
}

define_id! {
    /// Identifier of a live agent session.
    ///
    /// Distinct from [`AgentId`]: the agent is the durable entity, a
    /// session is one spawned run of it. Session ids are minted by the
    /// session runtime and arrive through `from_string`.
    pub struct SessionId("sess-");
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
