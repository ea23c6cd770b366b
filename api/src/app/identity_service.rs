//! Identity service
//!
//! Registration, token login and request authentication.

use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::auth::{
    generate_api_token, hash_api_token, hash_password, password_problems, verify_password,
    Credentials,
};
use crate::domain::entities::{user, Member, NewUser, User, UserId, DUPLICATE_USERNAME};
use crate::domain::ports::{MemberCodeSource, MemberRepository, UserRepository};
use crate::error::{AppError, DomainError, FieldErrors};

use super::membership_service::{unused_member_code, MAX_CODE_ATTEMPTS};

pub const PASSWORD_MISMATCH: &str = "Password fields didn't match.";

/// Input to the registration use case
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"))
}

fn check_registration(reg: &Registration) -> FieldErrors {
    let mut errors = FieldErrors::new();

    if reg.username.is_empty() {
        errors.add("username", "This field may not be blank.");
    } else if reg.username.chars().count() > user::MAX_USERNAME_LEN {
        errors.add(
            "username",
            format!(
                "Ensure this field has no more than {} characters.",
                user::MAX_USERNAME_LEN
            ),
        );
    } else if !username_pattern().is_match(&reg.username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }

    if reg.email.is_empty() {
        errors.add("email", "This field may not be blank.");
    } else if !email_pattern().is_match(&reg.email) {
        errors.add("email", "Enter a valid email address.");
    }

    for problem in password_problems(&reg.password) {
        errors.add("password", problem);
    }
    if reg.password != reg.password2 {
        errors.add("password", PASSWORD_MISMATCH);
    }

    if reg.first_name.is_empty() {
        errors.add("first_name", "This field may not be blank.");
    }
    if reg.last_name.is_empty() {
        errors.add("last_name", "This field may not be blank.");
    }

    errors
}

/// Service for user accounts and authentication
pub struct IdentityService<UR, MR>
where
    UR: UserRepository,
    MR: MemberRepository,
{
    users: Arc<UR>,
    members: Arc<MR>,
    codes: Arc<dyn MemberCodeSource>,
}

impl<UR, MR> IdentityService<UR, MR>
where
    UR: UserRepository,
    MR: MemberRepository,
{
    pub fn new(users: Arc<UR>, members: Arc<MR>, codes: Arc<dyn MemberCodeSource>) -> Self {
        Self {
            users,
            members,
            codes,
        }
    }

    /// Register a user and their member profile
    ///
    /// Both rows are written in one transaction. A membership code that is
    /// taken between the check and the insert is retried with a new code.
    pub async fn register(&self, mut reg: Registration) -> Result<(User, Member), AppError> {
        reg.username = reg.username.trim().to_string();
        reg.email = reg.email.trim().to_string();
        reg.first_name = reg.first_name.trim().to_string();
        reg.last_name = reg.last_name.trim().to_string();
        check_registration(&reg).into_result()?;

        if self.users.find_by_username(&reg.username).await?.is_some() {
            return Err(DomainError::field("username", DUPLICATE_USERNAME).into());
        }

        let password_hash = hash_password(&reg.password)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        let new_user = NewUser {
            username: reg.username,
            email: reg.email,
            first_name: reg.first_name,
            last_name: reg.last_name,
            password_hash,
        };

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = unused_member_code(self.members.as_ref(), self.codes.as_ref()).await?;
            match self.users.register(&new_user, &code).await {
                Ok((user, member)) => {
                    tracing::info!(
                        user_id = %user.id,
                        member_id = %member.member_id,
                        "User registered"
                    );
                    return Ok((user, member));
                }
                Err(DomainError::Validation(e)) if e.contains("member_id") => {
                    tracing::debug!(code = %code, "Membership code taken during registration");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "Could not allocate a unique membership code".to_string(),
        ))
    }

    /// Exchange a username and password for a fresh API token.
    ///
    /// Issuing a token replaces any token the user held before.
    pub async fn login(&self, username: &str, password: &str) -> Result<(String, User), AppError> {
        let user = self
            .verify_credentials(username, password)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let token = generate_api_token();
        self.users
            .set_token_hash(user.id, &hash_api_token(&token))
            .await?;

        tracing::info!(user_id = %user.id, "API token issued");
        Ok((token, user))
    }

    /// Resolve request credentials to a user, `None` when they do not match
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Option<User>, AppError> {
        match credentials {
            Credentials::Basic { username, password } => {
                self.verify_credentials(username, password).await
            }
            Credentials::Bearer(token) => {
                Ok(self.users.find_by_token_hash(&hash_api_token(token)).await?)
            }
        }
    }

    /// The user and, if one exists, their member profile
    pub async fn profile(&self, user_id: UserId) -> Result<(User, Option<Member>), AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;
        let member = self.members.find_by_user(user_id).await?;
        Ok((user, member))
    }

    async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        let Some(user) = self.users.find_by_username(username).await? else {
            return Ok(None);
        };

        match verify_password(password, &user.password_hash) {
            Ok(true) => Ok(Some(user)),
            Ok(false) => Ok(None),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::is_valid_member_code;
    use crate::test_utils::{
        InMemoryLibrary, InMemoryMemberRepository, InMemoryUserRepository, ScriptedMemberCodes,
    };

    fn create_service(
        library: &InMemoryLibrary,
        codes: ScriptedMemberCodes,
    ) -> IdentityService<InMemoryUserRepository, InMemoryMemberRepository> {
        IdentityService::new(
            Arc::new(library.users()),
            Arc::new(library.members()),
            Arc::new(codes),
        )
    }

    fn registration(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "s3cret-pass".to_string(),
            password2: "s3cret-pass".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    fn field_errors(err: AppError) -> FieldErrors {
        match err {
            AppError::Domain(DomainError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn register_creates_user_and_member() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::new(["M12345"]));

        let (user, member) = service.register(registration("ada")).await.unwrap();

        assert_eq!(user.username, "ada");
        assert_ne!(user.password_hash, "s3cret-pass");
        assert_eq!(member.user_id, user.id);
        assert_eq!(member.member_id, "M12345");
        assert!(member.is_active);
    }

    #[tokio::test]
    async fn mismatched_passwords_create_nothing() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::default());

        let mut reg = registration("ada");
        reg.password2 = "something-else".to_string();
        let errors = field_errors(service.register(reg).await.unwrap_err());

        assert_eq!(
            errors.get("password"),
            Some(&[PASSWORD_MISMATCH.to_string()][..])
        );
        assert_eq!(library.user_count(), 0);
        assert_eq!(library.member_count(), 0);
    }

    #[tokio::test]
    async fn weak_password_and_bad_email_are_reported() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::default());

        let mut reg = registration("ada");
        reg.email = "not-an-email".to_string();
        reg.password = "1234".to_string();
        reg.password2 = "1234".to_string();
        let errors = field_errors(service.register(reg).await.unwrap_err());

        assert!(errors.contains("email"));
        assert_eq!(errors.get("password").map(|m| m.len()), Some(2));
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::default());

        let mut reg = registration("ada");
        reg.first_name = "   ".to_string();
        reg.last_name = String::new();
        let errors = field_errors(service.register(reg).await.unwrap_err());

        assert!(errors.contains("first_name"));
        assert!(errors.contains("last_name"));
        assert_eq!(library.user_count(), 0);
    }

    #[tokio::test]
    async fn names_are_trimmed() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::new(["M12345"]));

        let mut reg = registration("ada");
        reg.first_name = "  Ada ".to_string();
        let (user, _) = service.register(reg).await.unwrap();

        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.last_name, "Lovelace");
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::default());
        service.register(registration("ada")).await.unwrap();

        let errors = field_errors(service.register(registration("ada")).await.unwrap_err());

        assert_eq!(
            errors.get("username"),
            Some(&[DUPLICATE_USERNAME.to_string()][..])
        );
        assert_eq!(library.user_count(), 1);
    }

    #[tokio::test]
    async fn member_codes_stay_unique_through_collisions() {
        let library = InMemoryLibrary::new();
        let service = create_service(
            &library,
            ScriptedMemberCodes::new(["M11111", "M11111", "M11111", "M22222", "M11111", "M33333"]),
        );

        let (_, first) = service.register(registration("ada")).await.unwrap();
        let (_, second) = service.register(registration("grace")).await.unwrap();
        let (_, third) = service.register(registration("hedy")).await.unwrap();

        assert_eq!(first.member_id, "M11111");
        assert_eq!(second.member_id, "M22222");
        assert_eq!(third.member_id, "M33333");
        assert!(is_valid_member_code(&third.member_id));
    }

    #[tokio::test]
    async fn login_issues_rotating_token() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::default());
        let (user, _) = service.register(registration("ada")).await.unwrap();

        let (first, _) = service.login("ada", "s3cret-pass").await.unwrap();
        let found = service
            .authenticate(&Credentials::Bearer(first.clone()))
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        let (second, _) = service.login("ada", "s3cret-pass").await.unwrap();
        assert_ne!(first, second);
        assert!(service
            .authenticate(&Credentials::Bearer(first))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::default());
        service.register(registration("ada")).await.unwrap();

        assert!(matches!(
            service.login("ada", "wrong-pass").await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            service.login("nobody", "s3cret-pass").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn basic_credentials_authenticate() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::default());
        service.register(registration("ada")).await.unwrap();

        let ok = service
            .authenticate(&Credentials::Basic {
                username: "ada".to_string(),
                password: "s3cret-pass".to_string(),
            })
            .await
            .unwrap();
        assert!(ok.is_some());

        let bad = service
            .authenticate(&Credentials::Basic {
                username: "ada".to_string(),
                password: "nope".to_string(),
            })
            .await
            .unwrap();
        assert!(bad.is_none());
    }

    #[tokio::test]
    async fn profile_includes_member() {
        let library = InMemoryLibrary::new();
        let service = create_service(&library, ScriptedMemberCodes::new(["M54321"]));
        let (user, _) = service.register(registration("ada")).await.unwrap();

        let (found, member) = service.profile(user.id).await.unwrap();

        assert_eq!(found.username, "ada");
        assert_eq!(member.map(|m| m.member_id), Some("M54321".to_string()));
    }
}
