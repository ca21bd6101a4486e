/// Group model and database operations
///
/// The roster is embedded in the group row as a JSONB array, so a group and
/// its members are always read and written together. Every write is
/// conditional on `version`; a write that lost a race returns `None` (or
/// `false` for deletes) and the caller re-reads and retries.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE groups (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(50) NOT NULL,
///     description VARCHAR(200) NOT NULL DEFAULT '',
///     invitation_code VARCHAR(8) NOT NULL,
///     created_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     members JSONB NOT NULL DEFAULT '[]'::jsonb,
///     version BIGINT NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT groups_invitation_code_key UNIQUE (invitation_code)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use chrono::Utc;
/// use taskflow_shared::invitation::generate_code;
/// use taskflow_shared::membership::Roster;
/// use taskflow_shared::models::group::{CreateGroup, Group};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, creator: Uuid, joiner: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let group = Group::create(&pool, CreateGroup {
///     name: "Alpha".to_string(),
///     description: String::new(),
///     invitation_code: generate_code(),
///     created_by: creator,
///     members: Roster::founded_by(creator, Utc::now()),
/// })
/// .await?;
///
/// let mut roster = group.roster().clone();
/// roster.join(joiner, Utc::now())?;
/// let saved = Group::save_members(&pool, group.id, group.version, &roster).await?;
/// assert!(saved.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::membership::Roster;

const GROUP_COLUMNS: &str = "id, name, description, invitation_code, created_by, members, \
                             version, created_at, updated_at";

/// Maximum group name length after trimming
pub const MAX_NAME_LENGTH: usize = 50;

/// Maximum description length after trimming
pub const MAX_DESCRIPTION_LENGTH: usize = 200;

/// A group with its embedded roster
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub invitation_code: String,
    pub created_by: Uuid,
    pub members: Json<Roster>,
    /// Bumped on every write; guards roster updates
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// The group's members
    pub fn roster(&self) -> &Roster {
        &self.members.0
    }
}

/// Input for inserting a group
#[derive(Debug, Clone)]
pub struct CreateGroup {
    pub name: String,
    pub description: String,
    pub invitation_code: String,
    pub created_by: Uuid,
    pub members: Roster,
}

/// Name/description changes; `None` leaves a field alone
#[derive(Debug, Clone, Default)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Group {
    /// Inserts a new group
    ///
    /// # Errors
    ///
    /// A taken invitation code surfaces as a unique violation; see
    /// [`crate::invitation::is_code_collision`].
    pub async fn create(pool: &PgPool, data: CreateGroup) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO groups (name, description, invitation_code, created_by, members)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            GROUP_COLUMNS
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(data.name)
            .bind(data.description)
            .bind(data.invitation_code)
            .bind(data.created_by)
            .bind(Json(data.members))
            .fetch_one(pool)
            .await
    }

    /// Finds a group by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM groups WHERE id = $1", GROUP_COLUMNS);

        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a group by its (already normalized) invitation code
    pub async fn find_by_invitation_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM groups WHERE invitation_code = $1", GROUP_COLUMNS);

        sqlx::query_as::<_, Group>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Lists the groups a user belongs to, newest first
    pub async fn list_for_member(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            r#"
            SELECT {}
            FROM groups
            WHERE members @> jsonb_build_array(jsonb_build_object('user_id', $1::uuid))
            ORDER BY created_at DESC
            "#,
            GROUP_COLUMNS
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Whether the user already belongs to a group with this name
    ///
    /// `exclude` skips one group, for renames.
    pub async fn name_taken_for_member(
        pool: &PgPool,
        user_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let (taken,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM groups
                WHERE name = $2
                  AND members @> jsonb_build_array(jsonb_build_object('user_id', $1::uuid))
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(exclude)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    /// Writes a new roster if the group is still at `expected_version`
    ///
    /// Returns `None` if the group was deleted or changed since it was read.
    pub async fn save_members(
        pool: &PgPool,
        id: Uuid,
        expected_version: i64,
        members: &Roster,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE groups
            SET members = $3, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            GROUP_COLUMNS
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .bind(expected_version)
            .bind(Json(members))
            .fetch_optional(pool)
            .await
    }

    /// Applies name/description changes if the group is still at
    /// `expected_version`
    ///
    /// Returns `None` if the group was deleted or changed since it was read.
    pub async fn update_details(
        pool: &PgPool,
        id: Uuid,
        expected_version: i64,
        data: UpdateGroup,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $4
            RETURNING {}
            "#,
            GROUP_COLUMNS
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .bind(data.name)
            .bind(data.description)
            .bind(expected_version)
            .fetch_optional(pool)
            .await
    }

    /// Replaces the invitation code, guarded on `expected_version` like
    /// [`Group::update_details`]
    ///
    /// # Errors
    ///
    /// A taken code surfaces as a unique violation, as in [`Group::create`].
    pub async fn set_invitation_code(
        pool: &PgPool,
        id: Uuid,
        expected_version: i64,
        code: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE groups
            SET invitation_code = $2, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $3
            RETURNING {}
            "#,
            GROUP_COLUMNS
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .bind(code)
            .bind(expected_version)
            .fetch_optional(pool)
            .await
    }

    /// Deletes a group still at `expected_version`; its tasks become personal
    /// tasks
    ///
    /// Returns `false` if the group is gone or changed since it was read.
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        expected_version: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(expected_version)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
