//! Authenticated principal claims
//!
//! Credentials are verified upstream. What reaches the workflow is a typed
//! principal: who the caller is, their role and the capabilities they hold.
use super::error::WorkflowError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Lecturer,
    Student,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "lecturer" => Ok(Role::Lecturer),
            "student" => Ok(Role::Student),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    ReadAchievements,
    WriteAchievements,
    VerifyAchievements,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadAchievements => "read_achievements",
            Permission::WriteAchievements => "write_achievements",
            Permission::VerifyAchievements => "verify_achievements",
        }
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "read_achievements" => Ok(Permission::ReadAchievements),
            "write_achievements" => Ok(Permission::WriteAchievements),
            "verify_achievements" => Ok(Permission::VerifyAchievements),
            other => Err(format!("unknown permission '{other}'")),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), WorkflowError> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(WorkflowError::forbidden(format!(
                "Access denied: missing permission {permission}"
            )))
        }
    }

    pub fn require_role(&self, role: Role) -> Result<(), WorkflowError> {
        if self.role == role {
            Ok(())
        } else {
            Err(WorkflowError::forbidden(
                "Access denied: your role may not use this endpoint",
            ))
        }
    }
}
