use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use prism_data::models::{Account, AccountUpdate, NewAccount, Role};
use prism_data::repository::AccountRepositoryTrait;

use crate::auth::logging::{log_failed_login, log_session_revocation, log_successful_login};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::SessionStore;
use crate::entities::{AccountPatch, NewAccountInput};
use crate::error::{ServiceError, ServiceResult};
use crate::services::require_text;

const MIN_PASSWORD_LEN: usize = 8;

#[async_trait]
pub trait AccountServiceTrait: Send + Sync {
    /// Check credentials; unknown, archived and wrong-password all look the same
    async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<Account>;

    async fn create_account(&self, input: NewAccountInput) -> ServiceResult<Account>;

    async fn list_accounts(&self, include_archived: bool) -> ServiceResult<Vec<Account>>;

    async fn get_account(&self, id: Uuid) -> ServiceResult<Account>;

    /// `actor_id` is the administrator making the change
    async fn update_account(&self, actor_id: Uuid, id: Uuid, patch: AccountPatch) -> ServiceResult<Account>;

    /// Create the first administrator when no account exists yet
    async fn ensure_bootstrap_admin(&self, username: &str, password: &str) -> ServiceResult<Option<Account>>;
}

pub struct AccountService<R: AccountRepositoryTrait> {
    repository: R,
    sessions: SessionStore,
}

impl<R: AccountRepositoryTrait> AccountService<R> {
    pub fn new(repository: R, sessions: SessionStore) -> Self {
        Self { repository, sessions }
    }
}

/// Usernames are 3-50 characters of letters, digits, `.`, `_` and `-`
pub fn validate_username(username: &str) -> ServiceResult<()> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(ServiceError::Validation(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ServiceError::Validation(
            "Username may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[async_trait]
impl<R: AccountRepositoryTrait> AccountServiceTrait for AccountService<R> {
    async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<Account> {
        let invalid = || ServiceError::Unauthorized("Invalid username or password".to_string());

        let account = match self.repository.get_account_by_username(username.trim()).await? {
            Some(account) => account,
            None => {
                log_failed_login(username, "unknown username");
                return Err(invalid());
            }
        };

        if account.archived {
            log_failed_login(username, "account archived");
            return Err(invalid());
        }

        if !verify_password(password, &account.password_hash) {
            log_failed_login(username, "wrong password");
            return Err(invalid());
        }

        log_successful_login(&account.username);
        Ok(account)
    }

    async fn create_account(&self, input: NewAccountInput) -> ServiceResult<Account> {
        let username = input.username.trim().to_string();
        validate_username(&username)?;
        validate_password(&input.password)?;
        let full_name = require_text("full_name", &input.full_name)?;

        let password_hash = hash_password(&input.password)?;
        let account = self
            .repository
            .create_account(NewAccount {
                username,
                full_name,
                email: input.email.filter(|e| !e.trim().is_empty()),
                role: input.role,
                password_hash,
            })
            .await?;

        info!("Created {} account {}", account.role, account.username);
        Ok(account)
    }

    async fn list_accounts(&self, include_archived: bool) -> ServiceResult<Vec<Account>> {
        Ok(self.repository.list_accounts(include_archived).await?)
    }

    async fn get_account(&self, id: Uuid) -> ServiceResult<Account> {
        self.repository
            .get_account(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", id)))
    }

    async fn update_account(&self, actor_id: Uuid, id: Uuid, patch: AccountPatch) -> ServiceResult<Account> {
        if actor_id == id {
            if patch.archived == Some(true) {
                return Err(ServiceError::Forbidden("You cannot archive your own account".to_string()));
            }
            if matches!(patch.role, Some(role) if role != Role::Admin) {
                return Err(ServiceError::Forbidden("You cannot remove your own admin role".to_string()));
            }
        }

        let current = self.get_account(id).await?;

        let full_name = match &patch.full_name {
            Some(name) => Some(require_text("full_name", name)?),
            None => None,
        };
        let password_hash = match &patch.password {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let update = AccountUpdate {
            full_name,
            email: patch.email.clone(),
            role: patch.role,
            password_hash,
            archived: patch.archived,
        };

        let updated = self
            .repository
            .update_account(id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Account {} not found", id)))?;

        let reason = if updated.archived && !current.archived {
            Some("account archived")
        } else if updated.role != current.role {
            Some("role changed")
        } else if patch.password.is_some() {
            Some("password changed")
        } else {
            None
        };

        match reason {
            Some(reason) => {
                let revoked = self.sessions.revoke_user(id);
                log_session_revocation(&updated.username, revoked, reason);
            }
            None => {
                self.sessions.refresh_user(&updated);
            }
        }

        Ok(updated)
    }

    async fn ensure_bootstrap_admin(&self, username: &str, password: &str) -> ServiceResult<Option<Account>> {
        if self.repository.count_accounts().await? > 0 {
            return Ok(None);
        }

        warn!("No accounts found, creating bootstrap administrator {}", username);
        let account = self
            .create_account(NewAccountInput {
                username: username.to_string(),
                password: password.to_string(),
                full_name: "Administrator".to_string(),
                email: None,
                role: Role::Admin,
            })
            .await?;
        Ok(Some(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use prism_data::repository::{InMemoryStorage, MockAccountRepositoryTrait, RepositoryError};

    fn service() -> (AccountService<InMemoryStorage>, SessionStore) {
        let sessions = SessionStore::new(Duration::hours(1));
        (AccountService::new(InMemoryStorage::new(), sessions.clone()), sessions)
    }

    fn input(username: &str, role: Role) -> NewAccountInput {
        NewAccountInput {
            username: username.to_string(),
            password: "s3cure-pass".to_string(),
            full_name: "Maria Santos".to_string(),
            email: None,
            role,
        }
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("maria.s").is_ok());
        assert!(validate_username("ms").is_err());
        assert!(validate_username("maria santos").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[tokio::test]
    async fn test_create_and_authenticate() {
        let (service, _) = service();
        let account = service.create_account(input("maria", Role::Staff)).await.unwrap();
        assert!(account.password_hash.starts_with("$argon2id$"));

        let logged_in = service.authenticate("Maria", "s3cure-pass").await.unwrap();
        assert_eq!(logged_in.id, account.id);

        assert!(matches!(
            service.authenticate("maria", "wrong-pass").await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            service.authenticate("nobody", "s3cure-pass").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let (service, _) = service();
        let mut request = input("maria", Role::Staff);
        request.password = "short".to_string();

        assert!(matches!(service.create_account(request).await, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let (service, _) = service();
        service.create_account(input("maria", Role::Staff)).await.unwrap();

        assert!(matches!(
            service.create_account(input("MARIA", Role::Staff)).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_archiving_revokes_sessions_and_blocks_login() {
        let (service, sessions) = service();
        let admin = service.create_account(input("admin", Role::Admin)).await.unwrap();
        let staff = service.create_account(input("maria", Role::Staff)).await.unwrap();
        let session = sessions.create(&staff);

        let patch = AccountPatch { archived: Some(true), ..Default::default() };
        let archived = service.update_account(admin.id, staff.id, patch).await.unwrap();

        assert!(archived.archived);
        assert!(sessions.get(&session.id).is_none());
        assert!(matches!(
            service.authenticate("maria", "s3cure-pass").await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_cannot_archive_or_demote_self() {
        let (service, _) = service();
        let admin = service.create_account(input("admin", Role::Admin)).await.unwrap();

        let archive = AccountPatch { archived: Some(true), ..Default::default() };
        assert!(matches!(
            service.update_account(admin.id, admin.id, archive).await,
            Err(ServiceError::Forbidden(_))
        ));

        let demote = AccountPatch { role: Some(Role::Staff), ..Default::default() };
        assert!(matches!(
            service.update_account(admin.id, admin.id, demote).await,
            Err(ServiceError::Forbidden(_))
        ));

        let rename = AccountPatch { full_name: Some("Clinic Admin".into()), ..Default::default() };
        let renamed = service.update_account(admin.id, admin.id, rename).await.unwrap();
        assert_eq!(renamed.full_name, "Clinic Admin");
    }

    #[tokio::test]
    async fn test_profile_edit_refreshes_live_sessions() {
        let (service, sessions) = service();
        let admin = service.create_account(input("admin", Role::Admin)).await.unwrap();
        let staff = service.create_account(input("maria", Role::Staff)).await.unwrap();
        let session = sessions.create(&staff);

        let patch = AccountPatch { full_name: Some("Maria Cruz".to_string()), ..Default::default() };
        service.update_account(admin.id, staff.id, patch).await.unwrap();

        let live = sessions.get(&session.id).unwrap();
        assert_eq!(live.full_name, "Maria Cruz");
    }

    #[tokio::test]
    async fn test_password_change_rehashes() {
        let (service, _) = service();
        let admin = service.create_account(input("admin", Role::Admin)).await.unwrap();
        let staff = service.create_account(input("maria", Role::Staff)).await.unwrap();

        let patch = AccountPatch { password: Some("another-pass".into()), ..Default::default() };
        service.update_account(admin.id, staff.id, patch).await.unwrap();

        assert!(service.authenticate("maria", "another-pass").await.is_ok());
        assert!(service.authenticate("maria", "s3cure-pass").await.is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_admin_only_when_empty() {
        let (service, _) = service();

        let created = service.ensure_bootstrap_admin("admin", "change-me-now").await.unwrap();
        assert_eq!(created.map(|a| a.role), Some(Role::Admin));

        let again = service.ensure_bootstrap_admin("admin2", "change-me-now").await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_repository_failure_is_reported() {
        let mut repository = MockAccountRepositoryTrait::new();
        repository
            .expect_get_account_by_username()
            .returning(|_| Err(RepositoryError::Lock("poisoned".into())));

        let service = AccountService::new(repository, SessionStore::default());
        assert!(matches!(
            service.authenticate("maria", "whatever").await,
            Err(ServiceError::Repository(_))
        ));
    }
}
