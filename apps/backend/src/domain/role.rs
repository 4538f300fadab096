//! Roles and the role → permission table.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "profile:read")]
    ProfileRead,
    #[serde(rename = "profile:write")]
    ProfileWrite,
    #[serde(rename = "sessions:read")]
    SessionsRead,
    #[serde(rename = "subjects:manage")]
    SubjectsManage,
}

impl Permission {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Permission::ProfileRead => "profile:read",
            Permission::ProfileWrite => "profile:write",
            Permission::SessionsRead => "sessions:read",
            Permission::SubjectsManage => "subjects:manage",
        }
    }
}

/// Immutable role → permission lookup, loaded once at startup.
#[derive(Debug, Clone)]
pub struct RolePermissions {
    table: HashMap<Role, HashSet<Permission>>,
}

impl RolePermissions {
    pub fn new(table: HashMap<Role, HashSet<Permission>>) -> Self {
        Self { table }
    }

    /// Parse a `{"role": ["permission", ...]}` document. Roles missing from
    /// the document grant nothing.
    pub fn from_json(raw: &str) -> Result<Self, DomainError> {
        let table: HashMap<Role, HashSet<Permission>> = serde_json::from_str(raw)
            .map_err(|e| DomainError::config(format!("invalid ROLE_PERMISSIONS: {e}")))?;
        Ok(Self::new(table))
    }

    pub fn grants(&self, role: Role, permission: Permission) -> bool {
        self.table
            .get(&role)
            .is_some_and(|perms| perms.contains(&permission))
    }

    pub fn permissions(&self, role: Role) -> HashSet<Permission> {
        self.table.get(&role).cloned().unwrap_or_default()
    }
}

impl Default for RolePermissions {
    fn default() -> Self {
        let user = HashSet::from([Permission::ProfileRead, Permission::ProfileWrite]);
        let mut admin = user.clone();
        admin.extend([Permission::SessionsRead, Permission::SubjectsManage]);
        Self::new(HashMap::from([(Role::User, user), (Role::Admin, admin)]))
    }
}
