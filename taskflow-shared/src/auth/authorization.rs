/// Permission checks for groups and tasks
///
/// Both checks are pure functions over already-loaded records, so handlers
/// load first, decide here, then write. Nothing in this module touches the
/// database.
///
/// # Group permissions
///
/// | Action | Requires |
/// |---|---|
/// | view, leave | membership |
/// | update, delete, promote, remove, refresh-code | admin role |
///
/// # Task permissions
///
/// | Action | Allowed |
/// |---|---|
/// | view | creator, assignee, any member of the task's group |
/// | update | creator, admin of the task's group |
/// | update status | creator, assignee, admin of the task's group |
/// | delete | creator |
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use taskflow_shared::auth::authorization::{can_act, AuthzError, GroupAction};
/// use taskflow_shared::membership::{MemberRole, Roster};
/// use uuid::Uuid;
///
/// let admin = Uuid::new_v4();
/// let roster = Roster::founded_by(admin, Utc::now());
///
/// assert_eq!(can_act(admin, &roster, GroupAction::Delete), Ok(MemberRole::Admin));
/// assert_eq!(
///     can_act(Uuid::new_v4(), &roster, GroupAction::View),
///     Err(AuthzError::NotMember)
/// );
/// ```

use uuid::Uuid;

use crate::membership::{MemberRole, Roster};
use crate::models::task::Task;

/// Error type for authorization checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Requester is not on the group roster
    #[error("Group not found or access denied")]
    NotMember,

    /// Requester is a member but the action needs admin
    #[error("Group not found or insufficient permissions")]
    NotAdmin,

    /// Requester may not perform the action on the task
    #[error("Task not found or access denied")]
    TaskDenied,
}

/// Actions on a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    View,
    Leave,
    Update,
    Delete,
    Promote,
    Remove,
    RefreshCode,
}

impl GroupAction {
    /// Whether the action needs the admin role
    pub fn requires_admin(&self) -> bool {
        !matches!(self, GroupAction::View | GroupAction::Leave)
    }
}

/// Decides whether `user_id` may perform `action` on a group
///
/// Returns the requester's role on success.
pub fn can_act(user_id: Uuid, roster: &Roster, action: GroupAction) -> Result<MemberRole, AuthzError> {
    let role = roster.role_of(user_id).ok_or(AuthzError::NotMember)?;

    if action.requires_admin() && !role.can_manage_group() {
        return Err(AuthzError::NotAdmin);
    }

    Ok(role)
}

/// Actions on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    View,
    Update,
    UpdateStatus,
    Delete,
}

/// Decides whether `user_id` may perform `action` on a task
///
/// `group` is the roster of the task's group, or `None` for a personal task
/// (or one whose group no longer exists).
pub fn can_act_on_task(
    user_id: Uuid,
    task: &Task,
    group: Option<&Roster>,
    action: TaskAction,
) -> Result<(), AuthzError> {
    let is_creator = task.created_by == user_id;
    let is_assignee = task.assigned_to == Some(user_id);
    let group_role = group.and_then(|roster| roster.role_of(user_id));
    let is_group_admin = group_role == Some(MemberRole::Admin);

    let allowed = match action {
        TaskAction::View => is_creator || is_assignee || group_role.is_some(),
        TaskAction::Update => is_creator || is_group_admin,
        TaskAction::UpdateStatus => is_creator || is_assignee || is_group_admin,
        TaskAction::Delete => is_creator,
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthzError::TaskDenied)
    }
}
