//! Normalization of declaration arguments.
//!
//! Each dimension of a declaration accepts either a single value or a list.
//! Both forms become a list here, and [`expand`] turns three lists into
//! their cartesian product of triples.

use crate::services::registry::Triple;

/// One or more event or command names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names(Vec<String>);

impl Names {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Names {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<String> for Names {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<&String> for Names {
    fn from(value: &String) -> Self {
        Self(vec![value.clone()])
    }
}

impl From<Vec<String>> for Names {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<Vec<&str>> for Names {
    fn from(values: Vec<&str>) -> Self {
        Self(values.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Names {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|v| v.to_string()).collect())
    }
}

impl From<&[String]> for Names {
    fn from(values: &[String]) -> Self {
        Self(values.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for Names {
    fn from(values: [&str; N]) -> Self {
        Self(values.iter().map(|v| v.to_string()).collect())
    }
}

/// One or more roles. `None` is the implicit "any role" level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roles(Vec<Option<String>>);

impl Roles {
    /// The single implicit role used by deployments without a role dimension.
    pub fn any() -> Self {
        Self(vec![None])
    }

    pub fn as_slice(&self) -> &[Option<String>] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Roles {
    fn from(value: &str) -> Self {
        Self(vec![Some(value.to_string())])
    }
}

impl From<String> for Roles {
    fn from(value: String) -> Self {
        Self(vec![Some(value)])
    }
}

impl From<Option<&str>> for Roles {
    fn from(value: Option<&str>) -> Self {
        Self(vec![value.map(str::to_string)])
    }
}

impl From<Option<String>> for Roles {
    fn from(value: Option<String>) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for Roles {
    fn from(values: Vec<String>) -> Self {
        Self(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<&str>> for Roles {
    fn from(values: Vec<&str>) -> Self {
        Self(values.into_iter().map(|v| Some(v.to_string())).collect())
    }
}

impl From<&[&str]> for Roles {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|v| Some(v.to_string())).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Roles {
    fn from(values: [&str; N]) -> Self {
        Self(values.iter().map(|v| Some(v.to_string())).collect())
    }
}

/// Cartesian product of the three dimensions: events outermost, then roles,
/// then commands. Any empty dimension yields no triples.
pub fn expand<'a>(
    events: &'a Names,
    roles: &'a Roles,
    commands: &'a Names,
) -> impl Iterator<Item = Triple> + 'a {
    events.0.iter().flat_map(move |event| {
        roles.0.iter().flat_map(move |role| {
            commands
                .0
                .iter()
                .map(move |command| Triple::new(event.clone(), role.clone(), command.clone()))
        })
    })
}
