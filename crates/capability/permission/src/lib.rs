//! 权限判定。
//!
//! 查找路径：Subject → Group → Role（仅限当前应用）→ Permission。
//! SET 模式的权限全部为真才允许访问；READ/未设置模式只记录判定结果。

use appng_schema::{
    Action, ActionRef, Datasource, DatasourceRef, Event, FieldDef, FieldPermissionMode, Link,
    PageDefinition, Permission, Permissions,
};
use domain::Subject;
use tracing::debug;

/// 携带权限声明的配置元素。
pub trait PermissionOwner {
    fn owner_name(&self) -> String;
    fn permissions_mut(&mut self) -> &mut [Permission];
}

fn slice_of(permissions: &mut Option<Permissions>) -> &mut [Permission] {
    match permissions {
        Some(permissions) => permissions.permissions.as_mut_slice(),
        None => &mut [],
    }
}

impl PermissionOwner for Datasource {
    fn owner_name(&self) -> String {
        format!("datasource:{}", self.id)
    }

    fn permissions_mut(&mut self) -> &mut [Permission] {
        slice_of(&mut self.config.permissions)
    }
}

impl PermissionOwner for Action {
    fn owner_name(&self) -> String {
        format!("action:{}", self.id)
    }

    fn permissions_mut(&mut self) -> &mut [Permission] {
        slice_of(&mut self.config.permissions)
    }
}

impl PermissionOwner for Event {
    fn owner_name(&self) -> String {
        format!("event:{}", self.id)
    }

    fn permissions_mut(&mut self) -> &mut [Permission] {
        slice_of(&mut self.config.permissions)
    }
}

impl PermissionOwner for PageDefinition {
    fn owner_name(&self) -> String {
        format!("page:{}", self.id)
    }

    fn permissions_mut(&mut self) -> &mut [Permission] {
        slice_of(&mut self.config.permissions)
    }
}

impl PermissionOwner for DatasourceRef {
    fn owner_name(&self) -> String {
        format!("datasource-ref:{}", self.id)
    }

    fn permissions_mut(&mut self) -> &mut [Permission] {
        slice_of(&mut self.permissions)
    }
}

impl PermissionOwner for ActionRef {
    fn owner_name(&self) -> String {
        format!("action-ref:{}:{}", self.event_id, self.id)
    }

    fn permissions_mut(&mut self) -> &mut [Permission] {
        slice_of(&mut self.permissions)
    }
}

impl PermissionOwner for Link {
    fn owner_name(&self) -> String {
        format!("link:{}", self.target)
    }

    fn permissions_mut(&mut self) -> &mut [Permission] {
        slice_of(&mut self.permissions)
    }
}

/// 权限判定接口。
pub trait PermissionProcessor: Send + Sync {
    /// 单个权限引用是否授予。
    fn has_permission(&self, reference: &str) -> bool;

    /// 是否存在当前用户。
    fn has_subject(&self) -> bool;

    /// 判定并记录元素的全部权限；SET 模式权限全部为真才返回 true。
    fn has_permissions(&self, owner: &mut dyn PermissionOwner) -> bool {
        let name = owner.owner_name();
        let has_subject = self.has_subject();
        let mut accessible = has_subject;
        for permission in owner.permissions_mut() {
            let granted = has_subject && self.has_permission(&permission.reference);
            permission.value = Some(granted);
            if permission.is_set_mode() && !granted {
                accessible = false;
            }
        }
        if !accessible {
            debug!(
                target: "appng.permission",
                owner = %name,
                has_subject = has_subject,
                "permission_denied"
            );
        }
        accessible
    }

    /// 字段读权限（READ 列表全部授予）。
    fn has_read_permission(&self, field: &mut FieldDef) -> bool {
        field_permissions(self, field, FieldPermissionMode::Read)
    }

    /// 字段写权限（可读、非只读且 WRITE 列表全部授予）。
    fn has_write_permission(&self, field: &mut FieldDef) -> bool {
        if !self.has_read_permission(field) {
            return false;
        }
        let writable = field_permissions(self, field, FieldPermissionMode::Write);
        writable && !field.is_readonly()
    }
}

fn field_permissions<P: PermissionProcessor + ?Sized>(
    processor: &P,
    field: &mut FieldDef,
    mode: FieldPermissionMode,
) -> bool {
    if !processor.has_subject() {
        return false;
    }
    let mut granted_all = true;
    for permissions in field
        .permissions
        .iter_mut()
        .filter(|permissions| permissions.mode == mode)
    {
        for permission in permissions.permissions.iter_mut() {
            let granted = processor.has_permission(&permission.reference);
            permission.value = Some(granted);
            granted_all &= granted;
        }
    }
    granted_all
}

/// 基于 Subject 的默认实现。
#[derive(Debug, Clone)]
pub struct DefaultPermissionProcessor {
    subject: Option<Subject>,
    application: String,
}

impl DefaultPermissionProcessor {
    pub fn new(subject: Option<Subject>, application: impl Into<String>) -> Self {
        Self {
            subject,
            application: application.into(),
        }
    }
}

impl PermissionProcessor for DefaultPermissionProcessor {
    fn has_permission(&self, reference: &str) -> bool {
        match &self.subject {
            Some(subject) => subject.has_permission(&self.application, reference),
            None => {
                debug!(
                    target: "appng.permission",
                    permission = %reference,
                    "permission_check_without_subject"
                );
                false
            }
        }
    }

    fn has_subject(&self) -> bool {
        self.subject.is_some()
    }
}

/// 全部放行（内部可信上下文）。
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyPermissionProcessor;

impl PermissionProcessor for DummyPermissionProcessor {
    fn has_permission(&self, _reference: &str) -> bool {
        true
    }

    fn has_subject(&self) -> bool {
        true
    }
}
