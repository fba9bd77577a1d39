use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{AccessGuard, Caller, ProfileUpdate, User, UserAdminUpdate};
use kanban_persistence::Tables;

use super::{fetch, live, KanbanService};

impl KanbanService {
    /// Create or refresh the caller's own user record. First-time callers
    /// listed as bootstrap admins become system administrators.
    pub async fn upsert_profile(&self, caller: &Caller, updates: ProfileUpdate) -> KanbanResult<User> {
        let user_id = caller.user_id().to_string();
        let bootstrap_admin = self.config.is_bootstrap_admin(&user_id);
        let committed = self
            .write(caller, |tables, batch| {
                AccessGuard::authenticate(tables, caller)?;
                match tables.users.get(&user_id) {
                    Some(existing) => {
                        let mut user = existing.clone();
                        user.apply_profile(updates)?;
                        batch.modify(user);
                    }
                    None => {
                        let mut user = User::new(user_id.clone(), user_id.clone());
                        user.apply_profile(updates)?;
                        user.is_admin = bootstrap_admin;
                        tracing::info!(user_id = %user.id, is_admin = user.is_admin, "user registered");
                        batch.add(user);
                    }
                }
                Ok(())
            })
            .await?;
        fetch(&committed.tables.users, &user_id)
    }

    pub async fn get_profile(&self, caller: &Caller) -> KanbanResult<User> {
        let tables = self.db.read().await;
        AccessGuard::authenticate(&*tables, caller)?;
        live(&tables.users, &caller.user_id().to_string(), "user")
    }

    /// All known users, for system administrators.
    pub async fn list_users(&self, caller: &Caller) -> KanbanResult<Vec<User>> {
        let tables = self.db.read().await;
        require_system_admin(&tables, caller)?;
        let mut users: Vec<User> = tables.users.iter().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    /// Grant or revoke system administration, or (de)activate a user.
    pub async fn update_user(
        &self,
        caller: &Caller,
        user_id: &str,
        updates: UserAdminUpdate,
    ) -> KanbanResult<User> {
        let user_id = user_id.to_string();
        let committed = self
            .write(caller, |tables, batch| {
                require_system_admin(tables, caller)?;
                let demotes_self = updates.is_admin == Some(false) || updates.is_active == Some(false);
                if user_id == caller.user_id() && demotes_self {
                    return Err(KanbanError::bad_request(
                        "administrators cannot demote or deactivate themselves",
                    ));
                }
                let mut user = live(&tables.users, &user_id, "user")?;
                user.apply_admin(&updates);
                batch.modify(user);
                Ok(())
            })
            .await?;
        let user = fetch(&committed.tables.users, &user_id)?;
        tracing::info!(
            user_id = %user.id,
            is_admin = user.is_admin,
            is_active = user.is_active,
            by = %caller,
            "user updated"
        );
        Ok(user)
    }
}

fn require_system_admin(tables: &Tables, caller: &Caller) -> KanbanResult<()> {
    AccessGuard::authenticate(tables, caller)?;
    match tables.users.get(&caller.user_id().to_string()) {
        Some(user) if user.is_admin => Ok(()),
        _ => Err(KanbanError::forbidden(format!(
            "{} is not a system administrator",
            caller
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MockFileStorage;
    use crate::notifier::NoopNotifier;
    use kanban_core::AppConfig;
    use kanban_persistence::Database;
    use std::sync::Arc;

    fn service() -> KanbanService {
        let mut config = AppConfig::default();
        config.users.bootstrap_admins = vec!["root".into()];
        KanbanService::new(
            Arc::new(Database::in_memory()),
            Arc::new(NoopNotifier),
            Arc::new(MockFileStorage::new()),
            Arc::new(config),
        )
    }

    #[tokio::test]
    async fn test_bootstrap_admin_on_first_sync() {
        let service = service();
        let root = Caller::from_identity(Some("root")).unwrap();
        let alice = Caller::from_identity(Some("alice")).unwrap();

        let admin = service.upsert_profile(&root, ProfileUpdate::default()).await.unwrap();
        let user = service.upsert_profile(&alice, ProfileUpdate::default()).await.unwrap();
        assert!(admin.is_admin);
        assert!(!user.is_admin);
        assert_eq!(user.display_name, "alice");

        assert_eq!(service.list_users(&root).await.unwrap().len(), 2);
        assert!(matches!(
            service.list_users(&alice).await,
            Err(KanbanError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_deactivated_user_is_unauthorized() {
        let service = service();
        let root = Caller::from_identity(Some("root")).unwrap();
        let alice = Caller::from_identity(Some("alice")).unwrap();
        service.upsert_profile(&root, ProfileUpdate::default()).await.unwrap();
        service.upsert_profile(&alice, ProfileUpdate::default()).await.unwrap();

        service
            .update_user(
                &root,
                "alice",
                UserAdminUpdate {
                    is_admin: None,
                    is_active: Some(false),
                },
            )
            .await
            .unwrap();

        let err = service.get_profile(&alice).await.unwrap_err();
        assert!(matches!(err, KanbanError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_admin_cannot_deactivate_self() {
        let service = service();
        let root = Caller::from_identity(Some("root")).unwrap();
        service.upsert_profile(&root, ProfileUpdate::default()).await.unwrap();

        let err = service
            .update_user(
                &root,
                "root",
                UserAdminUpdate {
                    is_admin: None,
                    is_active: Some(false),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KanbanError::BadRequest(_)));
    }
}
