//! In-memory store of declared (event, role, command) triples.
//!
//! Triples are keyed by `(event, role)` with an insertion-ordered set of
//! commands under each key, so replaying the registry always visits triples
//! in the order they were first declared. Entries are never removed.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One declaration unit. A `role` of `None` applies regardless of role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub event: String,
    pub role: Option<String>,
    pub command: String,
}

impl Triple {
    pub fn new(event: impl Into<String>, role: Option<String>, command: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            role,
            command: command.into(),
        }
    }

    /// Triple that applies regardless of role.
    pub fn without_role(event: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(event, None, command)
    }

    pub fn with_role(
        event: impl Into<String>,
        role: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self::new(event, Some(role.into()), command)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            Some(role) => write!(f, "{}/{}/{}", self.event, role, self.command),
            None => write!(f, "{}/*/{}", self.event, self.command),
        }
    }
}

type Key = (String, Option<String>);

/// Append-only registry of declared triples.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: IndexMap<Key, IndexSet<String>>,
    len: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `triple` unless already present. Returns whether it was new.
    pub fn record_if_absent(&mut self, triple: &Triple) -> bool {
        let inserted = self
            .commands
            .entry((triple.event.clone(), triple.role.clone()))
            .or_default()
            .insert(triple.command.clone());
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.commands
            .get(&(triple.event.clone(), triple.role.clone()))
            .is_some_and(|set| set.contains(&triple.command))
    }

    /// Number of distinct triples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Lazily visit every stored triple in first-declared order.
    ///
    /// Does not consume or mutate the registry; repeated traversals yield
    /// the same sequence.
    pub fn triples(&self) -> impl Iterator<Item = Triple> + '_ {
        self.commands.iter().flat_map(|((event, role), commands)| {
            commands
                .iter()
                .map(move |command| Triple::new(event.clone(), role.clone(), command.clone()))
        })
    }

    /// Call `visitor` for every stored triple, in the same order as [`triples`](Self::triples).
    pub fn for_each_triple(&self, mut visitor: impl FnMut(&Triple)) {
        for triple in self.triples() {
            visitor(&triple);
        }
    }

    /// Commands declared for an `(event, role)` pair, in declaration order.
    pub fn commands_for<'a>(
        &'a self,
        event: &str,
        role: Option<&str>,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.commands
            .get(&(event.to_string(), role.map(str::to_string)))
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}
