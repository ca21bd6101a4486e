/// Group roster and membership rules
///
/// A group's members are an ordered list owned by the group and stored
/// alongside it. Every rule that changes the list lives here as a pure
/// operation on [`Roster`], so the rules can be exercised without a database.
///
/// # Invariants
///
/// - A user appears at most once in a roster.
/// - A roster that has been founded always holds at least one admin. `join`
///   and `promote` only add members or admins, `remove` refuses to remove
///   the acting admin, and `leave` refuses to let the last admin go.
///
/// # Roles
///
/// - **admin**: rename/describe/delete the group, rotate the invitation code,
///   promote and remove members
/// - **member**: view the group and its tasks, leave
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use taskflow_shared::membership::{MemberRole, MembershipError, Roster};
/// use uuid::Uuid;
///
/// let alice = Uuid::new_v4();
/// let bob = Uuid::new_v4();
///
/// let mut roster = Roster::founded_by(alice, Utc::now());
/// roster.join(bob, Utc::now()).unwrap();
/// assert_eq!(roster.role_of(bob), Some(MemberRole::Member));
///
/// assert_eq!(roster.leave(alice), Err(MembershipError::LastAdmin));
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a user within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Manages the group and its members
    Admin,

    /// Regular member
    Member,
}

impl MemberRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
        }
    }

    /// Whether this role may change the group and its roster
    pub fn can_manage_group(&self) -> bool {
        matches!(self, MemberRole::Admin)
    }
}

/// One entry of a group roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The member's user ID
    pub user_id: Uuid,

    /// Role within the group
    pub role: MemberRole,

    /// When the user joined
    pub joined_at: DateTime<Utc>,
}

/// Refusals raised by roster operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    /// The user is already on the roster
    #[error("You are already a member of this group")]
    AlreadyMember,

    /// The user is not on the roster
    #[error("You are not a member of this group")]
    NotMember,

    /// The target of a promote/remove is not on the roster
    #[error("Member not found in group")]
    MemberNotFound,

    /// Promote target already holds the admin role
    #[error("Member is already an admin")]
    AlreadyAdmin,

    /// Admins must use leave rather than removing themselves
    #[error("Cannot remove yourself. Use leave group instead.")]
    CannotRemoveSelf,

    /// Leaving would leave the group without an admin
    #[error("Cannot leave group as the only admin. Transfer ownership or delete group.")]
    LastAdmin,
}

/// Ordered list of group members
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<Member>);

impl Roster {
    /// Creates the roster of a new group: the creator as sole admin
    pub fn founded_by(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self(vec![Member {
            user_id,
            role: MemberRole::Admin,
            joined_at: now,
        }])
    }

    /// Members in join order
    pub fn members(&self) -> &[Member] {
        &self.0
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the roster has no members
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up a member by user ID
    pub fn find(&self, user_id: Uuid) -> Option<&Member> {
        self.0.iter().find(|m| m.user_id == user_id)
    }

    /// Role of a user, or `None` if they are not a member
    pub fn role_of(&self, user_id: Uuid) -> Option<MemberRole> {
        self.find(user_id).map(|m| m.role)
    }

    /// Whether a user is on the roster
    pub fn contains(&self, user_id: Uuid) -> bool {
        self.find(user_id).is_some()
    }

    /// Number of admins
    pub fn admin_count(&self) -> usize {
        self.0
            .iter()
            .filter(|m| m.role == MemberRole::Admin)
            .count()
    }

    /// User IDs in join order
    pub fn user_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.0.iter().map(|m| m.user_id)
    }

    /// Appends a user as a regular member
    pub fn join(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), MembershipError> {
        if self.contains(user_id) {
            return Err(MembershipError::AlreadyMember);
        }

        self.0.push(Member {
            user_id,
            role: MemberRole::Member,
            joined_at: now,
        });

        Ok(())
    }

    /// Grants the admin role to an existing member
    pub fn promote(&mut self, target: Uuid) -> Result<(), MembershipError> {
        let member = self
            .0
            .iter_mut()
            .find(|m| m.user_id == target)
            .ok_or(MembershipError::MemberNotFound)?;

        if member.role == MemberRole::Admin {
            return Err(MembershipError::AlreadyAdmin);
        }

        member.role = MemberRole::Admin;
        Ok(())
    }

    /// Removes another member on behalf of `actor`
    ///
    /// The actor is never removed, so an admin actor keeps the roster's
    /// last-admin invariant intact.
    pub fn remove(&mut self, actor: Uuid, target: Uuid) -> Result<(), MembershipError> {
        if actor == target {
            return Err(MembershipError::CannotRemoveSelf);
        }

        let before = self.0.len();
        self.0.retain(|m| m.user_id != target);

        if self.0.len() == before {
            return Err(MembershipError::MemberNotFound);
        }

        Ok(())
    }

    /// Removes `user_id` from the roster at their own request
    pub fn leave(&mut self, user_id: Uuid) -> Result<(), MembershipError> {
        let role = self.role_of(user_id).ok_or(MembershipError::NotMember)?;

        if role == MemberRole::Admin && self.admin_count() == 1 {
            return Err(MembershipError::LastAdmin);
        }

        self.0.retain(|m| m.user_id != user_id);
        Ok(())
    }
}
