//! Caller identity passed to the evaluator.

use serde::{Deserialize, Serialize};

use super::error::PlaygroundError;

/// Organization every mock owner belongs to.
const MOCK_ORG_ID: &str = "09942665-ba1b-4661-be9f-36bf9f738c83";

/// An RBAC role, optionally scoped to an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacRole {
    pub name: String,
    #[serde(default)]
    pub org_id: String,
}

impl RbacRole {
    fn new(name: &str, org_id: &str) -> Self {
        Self {
            name: name.to_string(),
            org_id: org_id.to_string(),
        }
    }
}

/// The user a preview is evaluated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceOwner {
    pub id: String,
    pub name: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub rbac_roles: Vec<RbacRole>,
    #[serde(default)]
    pub ssh_public_key: String,
    #[serde(default = "default_login_type")]
    pub login_type: String,
}

fn default_login_type() -> String {
    "password".to_string()
}

/// Names of the built-in mock owners, in menu order.
pub const MOCK_OWNER_NAMES: &[&str] = &["admin", "developer", "contractor", "eu-developer", "sales"];

impl WorkspaceOwner {
    fn base(name: &str, full_name: &str, email: &str, groups: &[&str]) -> Self {
        Self {
            id: "8d36e355-e775-4c49-9b8d-ac042ed50440".to_string(),
            name: name.to_string(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            rbac_roles: vec![
                RbacRole::new("member", ""),
                RbacRole::new("organization-member", MOCK_ORG_ID),
            ],
            ssh_public_key: String::new(),
            login_type: default_login_type(),
        }
    }

    fn admin() -> Self {
        let mut owner = Self::base("admin", "Admin", "admin@coder.com", &["admin"]);
        owner.rbac_roles.push(RbacRole::new("owner", ""));
        owner
            .rbac_roles
            .push(RbacRole::new("organization-admin", MOCK_ORG_ID));
        owner
    }

    /// Look up a built-in mock owner by name.
    pub fn mock(name: &str) -> Result<Self, PlaygroundError> {
        let owner = match name {
            "admin" => Self::admin(),
            "developer" => Self::base("developer", "Developer", "dev@coder.com", &["developer"]),
            "contractor" => Self::base(
                "contractor",
                "Contractor",
                "contractor@coder.com",
                &["contractor"],
            ),
            "eu-developer" => Self::base(
                "eu-developer",
                "EU Developer",
                "eu.dev@coder.com",
                &["developer", "eu-helsinki"],
            ),
            "sales" => Self::base("sales", "Sales", "sales@coder.com", &["sales"]),
            other => return Err(PlaygroundError::UnknownOwner(other.to_string())),
        };
        Ok(owner)
    }

    /// All built-in mock owners.
    pub fn mocks() -> Vec<Self> {
        MOCK_OWNER_NAMES
            .iter()
            .filter_map(|name| Self::mock(name).ok())
            .collect()
    }
}

impl Default for WorkspaceOwner {
    fn default() -> Self {
        Self::admin()
    }
}
