use crate::{
    models::{convert_all, SqlUser, USER_COLUMNS},
    now, Db,
};
use chrono::NaiveDateTime;
use domain::commands::NewUser;
use domain::{ActorRef, Role, User};

impl Db {
    /// Returns `None` when the id or email is already taken.
    pub async fn insert_user(&self, new: &NewUser) -> anyhow::Result<Option<User>> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&new.id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.role.as_str())
        .bind(now())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Ok(None);
        }
        self.get_user(&new.id).await
    }

    pub async fn get_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, SqlUser>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, SqlUser>(&format!(
            "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn resolve_actor(&self, actor: &ActorRef) -> anyhow::Result<Option<User>> {
        match actor {
            ActorRef::ById(id) => self.get_user(id).await,
            ActorRef::ByEmail(email) => self.get_user_by_email(email).await,
        }
    }

    pub async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, SqlUser>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    pub async fn rename_user(&self, id: &str, name: &str) -> anyhow::Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    /// Sets or lifts a suspension. Lifting clears every suspension field.
    pub async fn set_suspension(
        &self,
        id: &str,
        suspended_by: Option<&str>,
        until: Option<NaiveDateTime>,
        reason: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let suspended = suspended_by.is_some();
        let result = sqlx::query(
            r#"
            UPDATE users
            SET suspended = ?, suspended_by_id = ?, suspended_until = ?, suspended_reason = ?
            WHERE id = ?
            "#,
        )
        .bind(suspended)
        .bind(suspended_by)
        .bind(if suspended { until } else { None })
        .bind(if suspended { reason } else { None })
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    pub async fn set_role(&self, id: &str, role: Role) -> anyhow::Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    // 软删除：保留用户行以维持评论与审计记录的引用
    pub async fn soft_delete_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET active = FALSE, deleted = TRUE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    pub async fn count_active_users(&self) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE active = TRUE")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{memory_db, seed_user};
    use chrono::NaiveDate;
    use domain::commands::NewUser;
    use domain::{ActorRef, Role};

    #[tokio::test]
    async fn duplicate_user_is_refused() {
        let db = memory_db().await;
        seed_user(&db, "u1", Role::User).await;

        let dup_id = NewUser {
            id: "u1".into(),
            name: "Other".into(),
            email: "other@example.com".into(),
            role: Role::User,
        };
        assert!(db.insert_user(&dup_id).await.unwrap().is_none());

        let dup_email = NewUser {
            id: "u2".into(),
            name: "Other".into(),
            email: "u1@example.com".into(),
            role: Role::User,
        };
        assert!(db.insert_user(&dup_email).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolves_by_id_or_email() {
        let db = memory_db().await;
        seed_user(&db, "u1", Role::Moderator).await;

        let by_id = db
            .resolve_actor(&ActorRef::ById("u1".into()))
            .await
            .unwrap()
            .unwrap();
        let by_email = db
            .resolve_actor(&ActorRef::ByEmail("U1@Example.com".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id, by_email);
        assert_eq!(by_id.role, Role::Moderator);

        assert!(db
            .resolve_actor(&ActorRef::ById("ghost".into()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn suspension_and_soft_delete() {
        let db = memory_db().await;
        seed_user(&db, "mod", Role::Moderator).await;
        seed_user(&db, "u1", Role::User).await;
        let until = NaiveDate::from_ymd_opt(2030, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let u = db
            .set_suspension("u1", Some("mod"), Some(until), Some("spam"))
            .await
            .unwrap()
            .unwrap();
        assert!(u.suspended);
        assert_eq!(u.suspended_until, Some(until));
        assert_eq!(u.suspended_by_id.as_deref(), Some("mod"));

        let u = db
            .set_suspension("u1", None, Some(until), Some("spam"))
            .await
            .unwrap()
            .unwrap();
        assert!(!u.suspended);
        assert_eq!(u.suspended_until, None);
        assert_eq!(u.suspended_reason, None);

        assert_eq!(db.count_active_users().await.unwrap(), 2);
        let u = db.soft_delete_user("u1").await.unwrap().unwrap();
        assert!(u.deleted);
        assert!(!u.active);
        assert_eq!(db.count_active_users().await.unwrap(), 1);

        assert!(db.set_role("ghost", Role::Admin).await.unwrap().is_none());
    }
}
