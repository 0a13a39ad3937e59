//! 应用描述（application.xml）：权限、角色与属性声明。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationPermission {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "$text", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleRef {
    #[serde(rename = "@id")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationRole {
    #[serde(rename = "@admin-role", skip_serializing_if = "Option::is_none")]
    pub admin_role: Option<bool>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "permission", default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<RoleRef>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationProperty {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "$text", default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PermissionList {
    #[serde(rename = "permission", default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<ApplicationPermission>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleList {
    #[serde(rename = "role", default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<ApplicationRole>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyList {
    #[serde(rename = "property", default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<ApplicationProperty>,
}

/// 应用描述。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApplicationInfo {
    pub name: String,
    #[serde(rename = "display-name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub permissions: PermissionList,
    #[serde(default)]
    pub roles: RoleList,
    #[serde(default)]
    pub properties: PropertyList,
}

impl ApplicationInfo {
    pub fn has_permission(&self, id: &str) -> bool {
        self.permissions
            .permissions
            .iter()
            .any(|permission| permission.id == id)
    }

    pub fn permission_ids(&self) -> Vec<&str> {
        self.permissions
            .permissions
            .iter()
            .map(|permission| permission.id.as_str())
            .collect()
    }
}
