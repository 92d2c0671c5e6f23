use crate::Moderator;
use domain::authz;
use domain::commands::{normalize_optional, require_text, NewUser, SuspendUser};
use domain::{ModerationError, ModerationResult, Role, User};
use tracing::{info, warn};

impl Moderator {
    /// Whether `actor_id` may act on `target_id`. Fails closed: a missing
    /// user or a failed lookup means no.
    pub async fn is_authorized(&self, actor_id: &str, target_id: &str) -> bool {
        let lookup = async {
            let actor = self.db.get_user(actor_id).await?;
            let target = self.db.get_user(target_id).await?;
            Ok::<_, anyhow::Error>((actor, target))
        };
        match self.guarded("authorize", lookup).await {
            Ok((Some(actor), Some(target))) => authz::is_authorized(&actor, &target),
            Ok(_) => {
                warn!(actor_id, target_id, "User or target user not found, cannot authorise");
                false
            }
            Err(_) => {
                warn!(actor_id, target_id, "User lookup failed, cannot authorise");
                false
            }
        }
    }

    /// Loads actor and target once and checks the actor may act on the
    /// target. `verb` completes "You are not authorised to ... this user".
    async fn authorize_over(
        &self,
        op: &'static str,
        verb: &str,
        actor_id: &str,
        target_id: &str,
    ) -> ModerationResult<()> {
        require_text("user ID", target_id)?;
        let lookup = async {
            let target = self.db.get_user(target_id).await?;
            let actor = self.db.get_user(actor_id).await?;
            Ok::<_, anyhow::Error>((actor, target))
        };
        let (actor, target) = self.guarded(op, lookup).await?;
        let target = target.ok_or_else(|| ModerationError::not_found("user", target_id))?;

        match actor {
            Some(actor) if authz::is_authorized(&actor, &target) => Ok(()),
            actor => {
                if actor.is_none() {
                    warn!(actor_id, target_id, "Acting user not found, cannot authorise");
                }
                Err(ModerationError::Forbidden(format!(
                    "You are not authorised to {} this user",
                    verb
                )))
            }
        }
    }

    pub async fn create_user(&self, new: NewUser) -> ModerationResult<User> {
        new.validate()?;
        let user = self
            .guarded("create_user", self.db.insert_user(&new))
            .await?
            .ok_or_else(|| {
                ModerationError::Conflict(format!(
                    "A user with id {} or email {} already exists",
                    new.id, new.email
                ))
            })?;
        info!(id = %user.id, role = user.role.as_str(), "Successfully created user");
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> ModerationResult<User> {
        require_text("user ID", id)?;
        self.guarded("get_user", self.db.get_user(id))
            .await?
            .ok_or_else(|| ModerationError::not_found("user", id))
    }

    pub async fn list_users(&self) -> ModerationResult<Vec<User>> {
        self.guarded("list_users", self.db.list_users()).await
    }

    pub async fn rename_user(&self, id: &str, name: &str) -> ModerationResult<User> {
        require_text("user ID", id)?;
        require_text("name", name)?;
        self.guarded("rename_user", self.db.rename_user(id, name.trim()))
            .await?
            .ok_or_else(|| ModerationError::not_found("user", id))
    }

    #[tracing::instrument(skip_all, fields(target_id = %target_id, actor_id = %cmd.actor_id))]
    pub async fn suspend_user(&self, target_id: &str, cmd: SuspendUser) -> ModerationResult<User> {
        cmd.validate()?;
        self.authorize_over("suspend_user", "suspend", &cmd.actor_id, target_id)
            .await?;

        let reason = normalize_optional(cmd.reason);
        let suspended_by = cmd.suspended.then_some(cmd.actor_id.as_str());
        let user = self
            .guarded(
                "suspend_user",
                self.db
                    .set_suspension(target_id, suspended_by, cmd.until, reason.as_deref()),
            )
            .await?
            .ok_or_else(|| ModerationError::not_found("user", target_id))?;
        info!(suspended = user.suspended, "User suspension updated");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_role(&self, target_id: &str, actor_id: &str, role: Role) -> ModerationResult<User> {
        require_text("updatedById", actor_id)?;
        self.authorize_over("set_role", "update the role of", actor_id, target_id)
            .await?;

        self.guarded("set_role", self.db.set_role(target_id, role))
            .await?
            .ok_or_else(|| ModerationError::not_found("user", target_id))
    }

    /// Soft delete: the row stays so comments and audit entries keep their author.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, target_id: &str, actor_id: &str) -> ModerationResult<User> {
        require_text("deletedById", actor_id)?;
        self.authorize_over("delete_user", "delete", actor_id, target_id)
            .await?;

        self.guarded("delete_user", self.db.soft_delete_user(target_id))
            .await?
            .ok_or_else(|| ModerationError::not_found("user", target_id))
    }
}
