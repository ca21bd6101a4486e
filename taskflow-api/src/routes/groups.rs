/// Group endpoints
///
/// - `POST /api/groups` - create a group (creator becomes its admin)
/// - `GET /api/groups` - groups the requester belongs to
/// - `POST /api/groups/join` - join with an invitation code
/// - `GET /api/groups/:id` - one group (members only)
/// - `PUT /api/groups/:id` - rename / describe (admin)
/// - `DELETE /api/groups/:id` - delete (admin)
/// - `DELETE /api/groups/:id/leave` - leave
/// - `PUT /api/groups/:id/refresh-code` - rotate the invitation code (admin)
/// - `PUT /api/groups/:id/promote/:member_id` - make a member admin (admin)
/// - `DELETE /api/groups/:id/remove/:member_id` - remove a member (admin)
///
/// Every roster change goes through [`update_roster`] and every other admin
/// write through [`guarded_write`]. Both write with a version check and retry
/// against a fresh read when another request got there first.

use crate::{
    app::AppState,
    envelope::Envelope,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::{collections::HashMap, future::Future};
use taskflow_shared::{
    auth::{
        authorization::{can_act, GroupAction},
        middleware::AuthContext,
    },
    invitation::{
        generate_code, is_code_collision, is_well_formed, normalize_code, MAX_CODE_ATTEMPTS,
    },
    membership::{MemberRole, MembershipError, Roster},
    models::{
        group::{CreateGroup, Group, UpdateGroup, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH},
        user::{User, UserSummary},
    },
};
use tracing::{info, warn};
use uuid::Uuid;

/// Attempts at a versioned group write before giving up with 409
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// Create request
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: String,
}

/// Update request; an absent field is left alone, `""` clears the description
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Join request
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JoinGroupRequest {
    #[serde(alias = "invitation_code")]
    pub invitation_code: String,
}

/// A roster entry with the member's display fields
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user: UserSummary,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

/// A group as returned to its members
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub invitation_code: String,
    pub created_by: Option<UserSummary>,
    pub members: Vec<MemberView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupView {
    /// Builds the view from a group and the display fields of its users
    ///
    /// Members whose account no longer exists are left out.
    fn new(group: &Group, users: &HashMap<Uuid, UserSummary>) -> Self {
        let members = group
            .roster()
            .members()
            .iter()
            .filter_map(|member| {
                users.get(&member.user_id).map(|user| MemberView {
                    user: user.clone(),
                    role: member.role,
                    joined_at: member.joined_at,
                })
            })
            .collect();

        Self {
            id: group.id,
            name: group.name.clone(),
            description: group.description.clone(),
            invitation_code: group.invitation_code.clone(),
            created_by: users.get(&group.created_by).cloned(),
            members,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupPayload {
    pub group: GroupView,
}

#[derive(Debug, Serialize)]
pub struct GroupsPayload {
    pub count: usize,
    pub groups: Vec<GroupView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationCodePayload {
    pub invitation_code: String,
}

fn group_not_found() -> ApiError {
    ApiError::NotFound("Group not found or access denied".to_string())
}

/// Trims and checks a group name
fn validate_name(raw: &str) -> ApiResult<String> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(ApiError::invalid_field("name", "Group name is required"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::invalid_field(
            "name",
            format!("Group name cannot be more than {} characters", MAX_NAME_LENGTH),
        ));
    }

    Ok(name.to_string())
}

/// A rename target for updates; blank means "keep the current name"
fn validate_rename(raw: Option<&str>) -> ApiResult<Option<String>> {
    match raw {
        Some(name) if !name.trim().is_empty() => validate_name(name).map(Some),
        _ => Ok(None),
    }
}

/// Trims and checks a description; empty is allowed
fn validate_description(raw: &str) -> ApiResult<String> {
    let description = raw.trim();

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ApiError::invalid_field(
            "description",
            format!(
                "Description cannot be more than {} characters",
                MAX_DESCRIPTION_LENGTH
            ),
        ));
    }

    Ok(description.to_string())
}

async fn load_group(db: &PgPool, id: Uuid) -> ApiResult<Group> {
    Group::find_by_id(db, id).await?.ok_or_else(group_not_found)
}

/// Expands member and creator references with one user lookup
async fn expand_groups(db: &PgPool, groups: &[Group]) -> ApiResult<Vec<GroupView>> {
    let mut ids: Vec<Uuid> = groups
        .iter()
        .flat_map(|group| group.roster().user_ids().chain(std::iter::once(group.created_by)))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let users: HashMap<Uuid, UserSummary> = User::find_summaries(db, &ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    Ok(groups.iter().map(|group| GroupView::new(group, &users)).collect())
}

async fn expand_group(db: &PgPool, group: Group) -> ApiResult<GroupView> {
    let mut views = expand_groups(db, std::slice::from_ref(&group)).await?;
    views.pop().ok_or_else(group_not_found)
}

/// Runs `write` with freshly generated invitation codes until one is free
async fn with_fresh_code<T, F, Fut>(mut write: F) -> ApiResult<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        match write(generate_code()).await {
            Ok(value) => return Ok(value),
            Err(e) if is_code_collision(&e) => {
                warn!(attempt, "Invitation code collision, generating another");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Conflict(
        "Could not generate a unique invitation code, please retry".to_string(),
    ))
}

/// Runs an admin write guarded by the version `action` was authorized against
///
/// `write` gets the expected version and returns `None` when the group moved
/// on. The group is then re-read and `action` re-checked, so a requester who
/// lost admin rights in between is refused.
async fn guarded_write<T, F, Fut>(
    db: &PgPool,
    mut group: Group,
    user_id: Uuid,
    action: GroupAction,
    mut write: F,
) -> ApiResult<T>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = ApiResult<Option<T>>>,
{
    let mut attempt = 1;

    loop {
        can_act(user_id, group.roster(), action)?;

        if let Some(value) = write(group.version).await? {
            return Ok(value);
        }

        if attempt == MAX_WRITE_ATTEMPTS {
            warn!(group_id = %group.id, attempt, "Giving up on contended group update");
            return Err(ApiError::Conflict(
                "Group was modified by another request, please retry".to_string(),
            ));
        }

        warn!(group_id = %group.id, attempt, "Group changed concurrently, retrying");
        attempt += 1;
        group = load_group(db, group.id).await?;
    }
}

/// Applies a roster change with optimistic concurrency
///
/// `group` is the caller's first read. Each attempt checks `action` (when
/// given) for `user_id`, applies `change` to a copy of the roster and writes
/// it only if the group is still at the version that was read. A lost race
/// re-reads the group and starts over.
async fn update_roster<F>(
    db: &PgPool,
    mut group: Group,
    user_id: Uuid,
    action: Option<GroupAction>,
    mut change: F,
) -> ApiResult<Group>
where
    F: FnMut(&mut Roster) -> Result<(), MembershipError>,
{
    let mut attempt = 1;

    loop {
        if let Some(action) = action {
            can_act(user_id, group.roster(), action)?;
        }

        let mut roster = group.roster().clone();
        change(&mut roster)?;

        if let Some(saved) = Group::save_members(db, group.id, group.version, &roster).await? {
            return Ok(saved);
        }

        if attempt == MAX_WRITE_ATTEMPTS {
            warn!(group_id = %group.id, attempt, "Giving up on contended roster update");
            return Err(ApiError::Conflict(
                "Group was modified by another request, please retry".to_string(),
            ));
        }

        warn!(group_id = %group.id, attempt, "Roster changed concurrently, retrying");
        attempt += 1;
        group = load_group(db, group.id).await?;
    }
}

/// Creates a group with the requester as its only admin
///
/// # Errors
///
/// - `400`: name missing or too long, or the requester already belongs to a
///   group with the same name
/// - `409`: no free invitation code after several attempts
pub async fn create_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateGroupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Envelope<GroupPayload>>)> {
    let Json(req) = payload?;

    let name = validate_name(&req.name)?;
    let description = validate_description(&req.description)?;

    if Group::name_taken_for_member(&state.db, auth.user_id, &name, None).await? {
        return Err(ApiError::Duplicate(
            "You already have a group with this name".to_string(),
        ));
    }

    let db = &state.db;
    let user_id = auth.user_id;
    let now = Utc::now();

    let group = with_fresh_code(move |invitation_code| {
        Group::create(
            db,
            CreateGroup {
                name: name.clone(),
                description: description.clone(),
                invitation_code,
                created_by: user_id,
                members: Roster::founded_by(user_id, now),
            },
        )
    })
    .await?;

    info!(group_id = %group.id, user_id = %user_id, "Group created");

    let group = expand_group(db, group).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Group created successfully",
            GroupPayload { group },
        )),
    ))
}

/// Lists the requester's groups, newest first
pub async fn list_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Envelope<GroupsPayload>>> {
    let groups = Group::list_for_member(&state.db, auth.user_id).await?;
    let groups = expand_groups(&state.db, &groups).await?;

    Ok(Json(Envelope::ok(GroupsPayload {
        count: groups.len(),
        groups,
    })))
}

/// Joins the group matching an invitation code
///
/// # Errors
///
/// - `400`: code missing, or the requester is already a member
/// - `404`: no group has this code
pub async fn join_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<JoinGroupRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<GroupPayload>>> {
    let Json(req) = payload?;

    let code = normalize_code(&req.invitation_code)
        .ok_or_else(|| ApiError::invalid_field("invitationCode", "Invitation code is required"))?;

    let invalid_code = || ApiError::NotFound("Invalid invitation code".to_string());
    if !is_well_formed(&code) {
        return Err(invalid_code());
    }

    let group = Group::find_by_invitation_code(&state.db, &code)
        .await?
        .ok_or_else(invalid_code)?;

    let user_id = auth.user_id;
    let group = update_roster(&state.db, group, user_id, None, |roster| {
        roster.join(user_id, Utc::now())
    })
    .await?;

    info!(group_id = %group.id, user_id = %user_id, "Member joined group");

    let message = format!("Successfully joined {}", group.name);
    let group = expand_group(&state.db, group).await?;
    Ok(Json(Envelope::with_message(message, GroupPayload { group })))
}

/// Fetches one group; 404 unless the requester is a member
pub async fn get_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<GroupPayload>>> {
    let Path(id) = path?;

    let group = load_group(&state.db, id).await?;
    can_act(auth.user_id, group.roster(), GroupAction::View)?;

    let group = expand_group(&state.db, group).await?;
    Ok(Json(Envelope::ok(GroupPayload { group })))
}

/// Renames or re-describes a group (admin)
pub async fn update_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateGroupRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<GroupPayload>>> {
    let Path(id) = path?;
    let Json(req) = payload?;

    let group = load_group(&state.db, id).await?;
    can_act(auth.user_id, group.roster(), GroupAction::Update)?;

    let name = validate_rename(req.name.as_deref())?;
    let description = req
        .description
        .as_deref()
        .map(validate_description)
        .transpose()?;

    if let Some(name) = &name {
        if Group::name_taken_for_member(&state.db, auth.user_id, name, Some(id)).await? {
            return Err(ApiError::Duplicate(
                "You already have another group with this name".to_string(),
            ));
        }
    }

    let db = &state.db;
    let group = guarded_write(db, group, auth.user_id, GroupAction::Update, |version| {
        let changes = UpdateGroup {
            name: name.clone(),
            description: description.clone(),
        };
        async move {
            Group::update_details(db, id, version, changes)
                .await
                .map_err(ApiError::from)
        }
    })
    .await?;

    info!(group_id = %id, user_id = %auth.user_id, "Group updated");

    let group = expand_group(&state.db, group).await?;
    Ok(Json(Envelope::with_message(
        "Group updated successfully",
        GroupPayload { group },
    )))
}

/// Deletes a group (admin); its tasks become personal tasks
pub async fn delete_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<crate::envelope::Empty>>> {
    let Path(id) = path?;

    let db = &state.db;
    let group = load_group(db, id).await?;
    guarded_write(db, group, auth.user_id, GroupAction::Delete, |version| async move {
        Group::delete(db, id, version)
            .await
            .map(|deleted| deleted.then_some(()))
            .map_err(ApiError::from)
    })
    .await?;

    info!(group_id = %id, user_id = %auth.user_id, "Group deleted");

    Ok(Json(Envelope::message("Group deleted successfully")))
}

/// Leaves a group
///
/// # Errors
///
/// - `400`: the requester is the group's only admin
/// - `404`: the requester is not a member
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<crate::envelope::Empty>>> {
    let Path(id) = path?;

    let user_id = auth.user_id;
    let group = load_group(&state.db, id).await?;
    let group = update_roster(&state.db, group, user_id, Some(GroupAction::Leave), |roster| {
        roster.leave(user_id)
    })
    .await?;

    info!(group_id = %id, user_id = %user_id, "Member left group");

    Ok(Json(Envelope::message(format!("You have left {}", group.name))))
}

/// Replaces the invitation code (admin)
pub async fn refresh_invitation_code(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Envelope<InvitationCodePayload>>> {
    let Path(id) = path?;

    let db = &state.db;
    let group = load_group(db, id).await?;
    let group = guarded_write(db, group, auth.user_id, GroupAction::RefreshCode, move |version| {
        with_fresh_code(move |code| async move {
            Group::set_invitation_code(db, id, version, &code).await
        })
    })
    .await?;

    info!(group_id = %id, user_id = %auth.user_id, "Invitation code refreshed");

    Ok(Json(Envelope::with_message(
        "Invitation code refreshed successfully",
        InvitationCodePayload {
            invitation_code: group.invitation_code,
        },
    )))
}

/// Promotes a member to admin (admin)
pub async fn promote_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<Json<Envelope<GroupPayload>>> {
    let Path((id, member_id)) = path?;

    let group = load_group(&state.db, id).await?;
    let group = update_roster(
        &state.db,
        group,
        auth.user_id,
        Some(GroupAction::Promote),
        |roster| roster.promote(member_id),
    )
    .await?;

    info!(group_id = %id, user_id = %auth.user_id, member_id = %member_id, "Member promoted");

    let group = expand_group(&state.db, group).await?;
    Ok(Json(Envelope::with_message(
        "Member promoted to admin successfully",
        GroupPayload { group },
    )))
}

/// Removes another member (admin)
///
/// # Errors
///
/// - `400`: the target is the requester (they must leave instead)
/// - `404`: not an admin of the group, or the target is not a member
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<Json<Envelope<GroupPayload>>> {
    let Path((id, member_id)) = path?;

    let user_id = auth.user_id;
    let group = load_group(&state.db, id).await?;
    let group = update_roster(
        &state.db,
        group,
        user_id,
        Some(GroupAction::Remove),
        |roster| roster.remove(user_id, member_id),
    )
    .await?;

    info!(group_id = %id, user_id = %user_id, member_id = %member_id, "Member removed");

    let group = expand_group(&state.db, group).await?;
    Ok(Json(Envelope::with_message(
        "Member removed from group successfully",
        GroupPayload { group },
    )))
}
