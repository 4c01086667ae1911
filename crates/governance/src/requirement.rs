//! Declarative per-operation governance requirements.
//!
//! A [`Requirement`] is plain data attached to an operation when the route
//! table is built at startup. Nothing here executes policy; the evaluator
//! reads these values on every request.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::{Capability, Role};

/// Which governance checks apply to an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub require_tenant_isolation: bool,
    /// Only consulted for department heads.
    pub require_department_scope: bool,
    /// Only consulted for faculty.
    pub required_capability: Option<Capability>,
    pub roles_forbidden: BTreeSet<Role>,
}

impl Requirement {
    /// No governance constraints.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn tenant_isolated(mut self) -> Self {
        self.require_tenant_isolation = true;
        self
    }

    pub fn department_scoped(mut self) -> Self {
        self.require_department_scope = true;
        self
    }

    pub fn requires(mut self, capability: Capability) -> Self {
        self.required_capability = Some(capability);
        self
    }

    pub fn forbid(mut self, role: Role) -> Self {
        self.roles_forbidden.insert(role);
        self
    }

    pub fn forbid_all(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles_forbidden.extend(roles);
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.require_tenant_isolation
            && !self.require_department_scope
            && self.required_capability.is_none()
            && self.roles_forbidden.is_empty()
    }

    pub fn forbids(&self, role: Role) -> bool {
        self.roles_forbidden.contains(&role)
    }
}

/// Stable name of a protected operation (e.g. `"departments.read"`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationId(&'static str);

impl OperationId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl core::fmt::Display for OperationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("operation '{0}' already has a requirement attached")]
    Duplicate(OperationId),
}

/// Central registry of operation → requirement, built once at startup.
///
/// Operations without an entry carry no governance constraints.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: BTreeMap<OperationId, Requirement>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `requirement` to `operation`. Each operation is attached once.
    pub fn register(
        &mut self,
        operation: OperationId,
        requirement: Requirement,
    ) -> Result<&mut Self, RouteTableError> {
        if self.entries.contains_key(&operation) {
            return Err(RouteTableError::Duplicate(operation));
        }
        self.entries.insert(operation, requirement);
        Ok(self)
    }

    pub fn requirement_for(&self, operation: OperationId) -> Option<&Requirement> {
        self.entries.get(&operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OperationId, &Requirement)> {
        self.entries.iter().map(|(op, req)| (*op, req))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
