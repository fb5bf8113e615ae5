//! User directory: accounts and roles.

use std::sync::Arc;

use chrono::Utc;

use crate::audit::{self, AuditAction};
use crate::context::RequestContext;
use crate::error::{AssessmentError, EntityKind, Result};
use crate::guard::{authorize, Actor, Operation};
use crate::locks::{AggregateLocks, LockKey};
use crate::model::{Role, User, UserId};
use crate::store::{EntityStore, ResultFilter};

/// Admin-only management of users.
pub struct UserDirectory {
    store: Arc<dyn EntityStore>,
    locks: Arc<AggregateLocks>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn EntityStore>, locks: Arc<AggregateLocks>) -> Self {
        Self { store, locks }
    }

    /// Create the first ADMIN of an empty directory.
    ///
    /// Fails with `Conflict` once any user exists; from then on accounts are
    /// created through [`create_user`](Self::create_user).
    pub async fn bootstrap_admin(&self, ctx: &RequestContext, username: &str) -> Result<User> {
        let username = check_username(username)?;
        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::Roster).await?;

        let existing = ctx.store("list_users", self.store.list_users()).await?;
        if !existing.is_empty() {
            return Err(AssessmentError::conflict(
                EntityKind::User,
                username,
                format!("directory already has {} user(s)", existing.len()),
            ));
        }

        let admin = User {
            id: UserId::new(),
            username: username.to_string(),
            role: Role::Admin,
            created_at: Utc::now(),
        };
        ctx.store("put_user", self.store.put_user(admin.clone()))
            .await?;
        let as_admin = RequestContext {
            actor: Actor::new(admin.id, Role::Admin),
            timeout: ctx.timeout,
        };
        audit::record(&*self.store, &as_admin, AuditAction::UserCreated, admin.id).await;
        tracing::info!(user = %admin.id, "bootstrapped admin {}", admin.username);
        Ok(admin)
    }

    pub async fn create_user(
        &self,
        ctx: &RequestContext,
        username: &str,
        role: Role,
    ) -> Result<User> {
        authorize(&ctx.actor, Operation::ManageUsers)?;
        let username = check_username(username)?;

        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::Roster).await?;
        if ctx
            .store("find_user", self.store.find_user(username))
            .await?
            .is_some()
        {
            return Err(AssessmentError::conflict(
                EntityKind::User,
                username,
                "username already taken",
            ));
        }

        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            role,
            created_at: Utc::now(),
        };
        ctx.store("put_user", self.store.put_user(user.clone()))
            .await?;
        audit::record(&*self.store, ctx, AuditAction::UserCreated, user.id).await;
        tracing::info!(user = %user.id, role = %user.role, "user created: {}", user.username);
        Ok(user)
    }

    /// Change a user's role.
    ///
    /// The last ADMIN cannot be demoted, and a user who created exams must
    /// stay able to author them.
    pub async fn change_role(
        &self,
        ctx: &RequestContext,
        id: UserId,
        role: Role,
    ) -> Result<User> {
        authorize(&ctx.actor, Operation::ManageUsers)?;

        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::User(id)).await?;
        held.write(LockKey::Roster).await?;
        let mut user = self.get_user(ctx, id).await?;
        if user.role == role {
            return Ok(user);
        }

        if user.role == Role::Admin {
            let users = ctx.store("list_users", self.store.list_users()).await?;
            let admins = users.iter().filter(|u| u.role == Role::Admin).count();
            if admins <= 1 {
                return Err(AssessmentError::conflict(
                    EntityKind::User,
                    id,
                    "cannot demote the last ADMIN",
                ));
            }
        }
        if !role.can_author() {
            let authored = self.exams_created_by(ctx, id).await?;
            if authored > 0 {
                return Err(AssessmentError::conflict(
                    EntityKind::User,
                    id,
                    format!("{} created {authored} exam(s) and must keep authoring rights", user.username),
                ));
            }
        }

        let previous = user.role;
        user.role = role;
        ctx.store("put_user", self.store.put_user(user.clone()))
            .await?;
        audit::record(&*self.store, ctx, AuditAction::RoleChanged, id).await;
        tracing::info!(user = %id, from = %previous, to = %role, "role changed");
        Ok(user)
    }

    /// Remove a user nothing refers to.
    pub async fn delete_user(&self, ctx: &RequestContext, id: UserId) -> Result<()> {
        authorize(&ctx.actor, Operation::ManageUsers)?;

        let mut held = self.locks.session(ctx.timeout);
        held.write(LockKey::User(id)).await?;
        held.write(LockKey::Roster).await?;
        let user = self.get_user(ctx, id).await?;

        if user.role == Role::Admin {
            let users = ctx.store("list_users", self.store.list_users()).await?;
            if users.iter().filter(|u| u.role == Role::Admin).count() <= 1 {
                return Err(AssessmentError::conflict(
                    EntityKind::User,
                    id,
                    "cannot delete the last ADMIN",
                ));
            }
        }
        let authored = self.exams_created_by(ctx, id).await?;
        if authored > 0 {
            return Err(AssessmentError::conflict(
                EntityKind::User,
                id,
                format!("creator of {authored} exam(s)"),
            ));
        }
        let submitted = ctx
            .store(
                "list_submissions",
                self.store.list_submissions(&ResultFilter::student(id)),
            )
            .await?;
        if !submitted.is_empty() {
            return Err(AssessmentError::conflict(
                EntityKind::User,
                id,
                format!("author of {} submission(s)", submitted.len()),
            ));
        }

        ctx.store("delete_user", self.store.delete_user(id)).await?;
        audit::record(&*self.store, ctx, AuditAction::UserDeleted, id).await;
        tracing::info!(user = %id, "user deleted: {}", user.username);
        Ok(())
    }

    pub async fn list_users(&self, ctx: &RequestContext) -> Result<Vec<User>> {
        authorize(&ctx.actor, Operation::ManageUsers)?;
        ctx.store("list_users", self.store.list_users()).await
    }

    pub async fn get_user(&self, ctx: &RequestContext, id: UserId) -> Result<User> {
        ctx.store("get_user", self.store.get_user(id))
            .await?
            .ok_or_else(|| AssessmentError::not_found(EntityKind::User, id))
    }

    /// Resolve a username at the boundary, before an [`Actor`] exists.
    pub async fn find_by_username(&self, ctx: &RequestContext, username: &str) -> Result<User> {
        ctx.store("find_user", self.store.find_user(username.trim()))
            .await?
            .ok_or_else(|| AssessmentError::not_found(EntityKind::User, username))
    }

    async fn exams_created_by(&self, ctx: &RequestContext, id: UserId) -> Result<usize> {
        let exams = ctx.store("list_exams", self.store.list_exams()).await?;
        Ok(exams.iter().filter(|e| e.creator_id == id).count())
    }
}

fn check_username(username: &str) -> Result<&str> {
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return Err(AssessmentError::validation(
            EntityKind::User,
            "username",
            "must not be empty",
        ));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(AssessmentError::validation(
            EntityKind::User,
            "username",
            format!("'{trimmed}' contains whitespace"),
        ));
    }
    Ok(trimmed)
}
