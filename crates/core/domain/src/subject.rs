/// 角色：属于某个应用，持有一组权限名。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub application: String,
    pub permissions: Vec<String>,
}

impl Role {
    pub fn new(name: impl Into<String>, application: impl Into<String>, permissions: &[&str]) -> Self {
        Self {
            name: name.into(),
            application: application.into(),
            permissions: permissions.iter().map(|item| item.to_string()).collect(),
        }
    }
}

/// 用户组。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub roles: Vec<Role>,
}

/// 当前用户。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
    pub authenticated: bool,
    pub groups: Vec<Group>,
}

impl Subject {
    pub fn new(name: impl Into<String>, groups: Vec<Group>) -> Self {
        Self {
            name: name.into(),
            authenticated: true,
            groups,
        }
    }

    /// 当前应用下可用的权限名（去重、保持首次出现顺序）。
    pub fn permissions_for(&self, application: &str) -> Vec<&str> {
        let mut result: Vec<&str> = Vec::new();
        for role in self
            .groups
            .iter()
            .flat_map(|group| group.roles.iter())
            .filter(|role| role.application == application)
        {
            for permission in &role.permissions {
                if !result.contains(&permission.as_str()) {
                    result.push(permission);
                }
            }
        }
        result
    }

    pub fn has_permission(&self, application: &str, permission: &str) -> bool {
        self.groups
            .iter()
            .flat_map(|group| group.roles.iter())
            .filter(|role| role.application == application)
            .any(|role| role.permissions.iter().any(|item| item == permission))
    }
}
