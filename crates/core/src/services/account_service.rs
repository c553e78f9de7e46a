use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};

use crate::errors::CoreError;
use crate::models::database::Database;
use crate::models::user::{
    PasswordChangeInput, PasswordResetInput, Profile, ProfileInput, SignupInput, User,
    DEFAULT_AVATARS,
};
use crate::storage::encryption;
use crate::validation::{self, FormErrors, NON_FIELD};

/// A handful of passwords that are always rejected at signup.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "12345678", "123456789", "1234567890", "qwerty123", "qwertyuiop",
    "iloveyou", "11111111", "00000000", "abcd1234", "letmein1", "sunshine", "princess",
    "football", "baseball", "welcome1", "admin123", "passw0rd", "trustno1",
];

/// Passwords the direct reset form refuses outright.
const RESET_BLOCKLIST: &[&str] = &["password", "12345678"];

pub fn hash_password(password: &str) -> Result<String, CoreError> {
    let salt = SaltString::encode_b64(&encryption::generate_salt()?)
        .map_err(|e| CoreError::Encryption(format!("Failed to encode salt: {e}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::Encryption(format!("Failed to hash password: {e}")))
}

/// False for a wrong password and for an unreadable hash alike.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Signup / password-change strength rules, reported on `field`.
fn check_password_strength(
    errors: &mut FormErrors,
    field: &str,
    password: &str,
    attributes: &[&str],
) {
    if password.chars().count() < 8 {
        errors.add(
            field,
            "This password is too short. It must contain at least 8 characters.",
        );
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        errors.add(field, "This password is too common.");
    }
    let similar = attributes.iter().any(|attr| {
        let attr = attr.trim().to_lowercase();
        let attr = attr.split('@').next().unwrap_or_default();
        attr.chars().count() >= 3 && (lowered.contains(attr) || attr.contains(lowered.as_str()))
    });
    if similar {
        errors.add(field, "The password is too similar to your account details.");
    }
}

/// Mismatch and strength errors for a new password, reported on `new_password2`.
fn new_password_errors(user: &User, input: &PasswordChangeInput) -> FormErrors {
    let mut errors = FormErrors::new();
    if input.new_password1 != input.new_password2 {
        errors.add("new_password2", "The two password fields didn't match.");
    } else {
        check_password_strength(
            &mut errors,
            "new_password2",
            &input.new_password1,
            &[&user.username, &user.nickname, &user.email],
        );
    }
    errors
}

/// Argon2 work an account operation needs, detached from the database so it
/// can run on another thread.
#[derive(Debug, Clone, Default)]
pub struct PasswordJob {
    /// Password and the stored hash it must match
    verify: Option<(String, String)>,
    /// Password to hash
    hash: Option<String>,
}

/// Result of a [`PasswordJob`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordOutcome {
    /// The stored hash, when the password matched it
    pub verified_hash: Option<String>,
    pub new_hash: Option<String>,
}

impl PasswordJob {
    fn verify(password: &str, password_hash: &str) -> Self {
        Self {
            verify: Some((password.to_string(), password_hash.to_string())),
            hash: None,
        }
    }

    fn hash(password: &str) -> Self {
        Self {
            verify: None,
            hash: Some(password.to_string()),
        }
    }

    pub fn run(self) -> Result<PasswordOutcome, CoreError> {
        let verified_hash = self
            .verify
            .and_then(|(password, hash)| verify_password(&password, &hash).then_some(hash));
        let new_hash = self.hash.as_deref().map(hash_password).transpose()?;
        Ok(PasswordOutcome {
            verified_hash,
            new_hash,
        })
    }
}

impl PasswordOutcome {
    fn matches(&self, password_hash: &str) -> bool {
        self.verified_hash.as_deref() == Some(password_hash)
    }

    fn take_new_hash(&mut self) -> Result<String, CoreError> {
        self.new_hash
            .take()
            .ok_or_else(|| CoreError::Conflict("The account changed, please try again".into()))
    }
}

fn login_failed() -> CoreError {
    CoreError::Authentication("Please enter a correct username and password.".into())
}

/// Signup fields after validation.
struct CleanSignup {
    username: String,
    nickname: String,
    email: String,
}

/// Registration, login and account self-service.
///
/// Operations that hash or verify a password come in two halves:
/// `prepare_*` validates against the database and returns a [`PasswordJob`],
/// `finish_*` validates again and applies the job's outcome. The plain
/// methods run both halves back to back.
pub struct AccountService;

impl AccountService {
    pub fn new() -> Self {
        Self
    }

    pub fn register(
        &self,
        db: &mut Database,
        input: SignupInput,
        now: DateTime<Utc>,
    ) -> Result<Profile, CoreError> {
        let outcome = self.prepare_register(db, &input)?.run()?;
        self.finish_register(db, &input, outcome, now)
    }

    pub fn prepare_register(&self, db: &Database, input: &SignupInput) -> Result<PasswordJob, CoreError> {
        self.check_signup(db, input)?;
        Ok(PasswordJob::hash(&input.password1))
    }

    pub fn finish_register(
        &self,
        db: &mut Database,
        input: &SignupInput,
        mut outcome: PasswordOutcome,
        now: DateTime<Utc>,
    ) -> Result<Profile, CoreError> {
        let clean = self.check_signup(db, input)?;
        let user = User {
            id: db.next_id(),
            username: clean.username,
            email: clean.email,
            nickname: clean.nickname,
            password_hash: outcome.take_new_hash()?,
            profile_image: None,
            is_staff: false,
            is_superuser: false,
            date_joined: now,
            last_login: None,
        };
        let profile = user.profile();
        db.users.push(user);
        tracing::info!(username = %profile.username, "User registered");
        Ok(profile)
    }

    fn check_signup(&self, db: &Database, input: &SignupInput) -> Result<CleanSignup, CoreError> {
        let mut errors = FormErrors::new();

        let username = validation::required_text(&mut errors, "username", &input.username, 150);
        if !username.is_empty() && !valid_username(&username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        if db.user_by_username(&username).is_some() {
            errors.add("username", "A user with that username already exists.");
        }

        let nickname = validation::required_text(&mut errors, "nickname", &input.nickname, 100);
        if self.nickname_taken(db, &nickname, None) {
            errors.add("nickname", "A user with that nickname already exists.");
        }

        let email = validation::optional_text(&mut errors, "email", &input.email, 254);
        if !email.is_empty() && !validation::is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }

        if input.password1 != input.password2 {
            errors.add("password2", "The two password fields didn't match.");
        } else {
            check_password_strength(
                &mut errors,
                "password2",
                &input.password1,
                &[&username, &nickname, &email],
            );
        }
        errors.into_result()?;
        Ok(CleanSignup {
            username,
            nickname,
            email,
        })
    }

    /// Check credentials and stamp `last_login`.
    pub fn login(
        &self,
        db: &mut Database,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Profile, CoreError> {
        let outcome = self.prepare_login(db, username, password)?.run()?;
        self.finish_login(db, username, outcome, now)
    }

    pub fn prepare_login(
        &self,
        db: &Database,
        username: &str,
        password: &str,
    ) -> Result<PasswordJob, CoreError> {
        let user = db.user_by_username(username.trim()).ok_or_else(login_failed)?;
        Ok(PasswordJob::verify(password, &user.password_hash))
    }

    /// Fails unless the password matched the hash the user still has.
    pub fn finish_login(
        &self,
        db: &mut Database,
        username: &str,
        outcome: PasswordOutcome,
        now: DateTime<Utc>,
    ) -> Result<Profile, CoreError> {
        let user_id = db
            .user_by_username(username.trim())
            .filter(|u| outcome.matches(&u.password_hash))
            .map(|u| u.id)
            .ok_or_else(login_failed)?;
        let user = self.user_mut(db, user_id)?;
        user.last_login = Some(now);
        Ok(user.profile())
    }

    pub fn profile(&self, db: &Database, user_id: u64) -> Result<Profile, CoreError> {
        db.user(user_id)
            .map(User::profile)
            .ok_or_else(|| CoreError::not_found("User", user_id))
    }

    pub fn update_profile(
        &self,
        db: &mut Database,
        user_id: u64,
        input: ProfileInput,
    ) -> Result<Profile, CoreError> {
        let mut errors = FormErrors::new();
        let nickname = validation::required_text(&mut errors, "nickname", &input.nickname, 100);
        if self.nickname_taken(db, &nickname, Some(user_id)) {
            errors.add("nickname", "A user with that nickname already exists.");
        }
        let email = validation::optional_text(&mut errors, "email", &input.email, 254);
        if !email.is_empty() && !validation::is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }
        let avatar = input
            .default_avatar
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        if let Some(avatar) = avatar {
            if !DEFAULT_AVATARS.contains(&avatar) {
                errors.add("default_avatar", "Select a valid choice.");
            }
        }
        errors.into_result()?;

        let avatar = avatar.map(str::to_string);
        let user = self.user_mut(db, user_id)?;
        user.nickname = nickname;
        user.email = email;
        if let Some(path) = avatar {
            user.profile_image = Some(path);
        }
        if input.clear_image {
            user.profile_image = None;
        }
        Ok(user.profile())
    }

    pub fn change_password(
        &self,
        db: &mut Database,
        user_id: u64,
        input: PasswordChangeInput,
    ) -> Result<(), CoreError> {
        let outcome = self.prepare_change_password(db, user_id, &input)?.run()?;
        self.finish_change_password(db, user_id, &input, outcome)
    }

    /// The new password is only hashed when it passes the strength rules.
    pub fn prepare_change_password(
        &self,
        db: &Database,
        user_id: u64,
        input: &PasswordChangeInput,
    ) -> Result<PasswordJob, CoreError> {
        let user = db
            .user(user_id)
            .ok_or_else(|| CoreError::not_found("User", user_id))?;
        let mut job = PasswordJob::verify(&input.old_password, &user.password_hash);
        if new_password_errors(user, input).is_empty() {
            job.hash = Some(input.new_password1.clone());
        }
        Ok(job)
    }

    pub fn finish_change_password(
        &self,
        db: &mut Database,
        user_id: u64,
        input: &PasswordChangeInput,
        mut outcome: PasswordOutcome,
    ) -> Result<(), CoreError> {
        let user = db
            .user(user_id)
            .ok_or_else(|| CoreError::not_found("User", user_id))?;

        let mut errors = FormErrors::new();
        if !outcome.matches(&user.password_hash) {
            errors.add(
                "old_password",
                "Your old password was entered incorrectly. Please enter it again.",
            );
        }
        errors.merge(new_password_errors(user, input));
        errors.into_result()?;

        let hash = outcome.take_new_hash()?;
        self.user_mut(db, user_id)?.password_hash = hash;
        Ok(())
    }

    /// Set a new password for the account registered under `email`.
    ///
    /// Returns the affected user's id so callers can revoke its sessions.
    pub fn reset_password(
        &self,
        db: &mut Database,
        input: PasswordResetInput,
    ) -> Result<u64, CoreError> {
        let outcome = self.prepare_reset_password(db, &input)?.run()?;
        self.finish_reset_password(db, &input, outcome)
    }

    pub fn prepare_reset_password(
        &self,
        db: &Database,
        input: &PasswordResetInput,
    ) -> Result<PasswordJob, CoreError> {
        self.check_reset(db, input)?;
        Ok(PasswordJob::hash(&input.new_password1))
    }

    pub fn finish_reset_password(
        &self,
        db: &mut Database,
        input: &PasswordResetInput,
        mut outcome: PasswordOutcome,
    ) -> Result<u64, CoreError> {
        let user_id = self.check_reset(db, input)?;
        let hash = outcome.take_new_hash()?;
        self.user_mut(db, user_id)?.password_hash = hash;
        tracing::info!(user_id, "Password reset");
        Ok(user_id)
    }

    fn check_reset(&self, db: &Database, input: &PasswordResetInput) -> Result<u64, CoreError> {
        let mut errors = FormErrors::new();
        let email = input.email.trim();

        let user_id = if email.is_empty() {
            errors.add("email", "This field is required.");
            None
        } else {
            let found = db
                .users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .map(|u| u.id);
            if found.is_none() {
                errors.add("email", "No user is registered with that email address.");
            }
            found
        };

        let p1 = &input.new_password1;
        if !p1.is_empty() && !input.new_password2.is_empty() && *p1 != input.new_password2 {
            errors.add("new_password2", "The two password fields didn't match.");
        }
        if p1.chars().count() < 8 {
            errors.add("new_password1", "The password must contain at least 8 characters.");
        }
        if RESET_BLOCKLIST.contains(&p1.to_lowercase().as_str())
            || p1.chars().any(|c| c.is_ascii_digit())
        {
            errors.add(
                "new_password1",
                "The password must not be a common word or contain digits.",
            );
        }
        errors.into_result()?;

        user_id.ok_or_else(|| CoreError::not_found("User", email))
    }

    /// Delete the account after confirming its password; everything it owns goes too.
    pub fn delete_account(
        &self,
        db: &mut Database,
        user_id: u64,
        password: &str,
    ) -> Result<(), CoreError> {
        let outcome = self.prepare_delete_account(db, user_id, password)?.run()?;
        self.finish_delete_account(db, user_id, outcome)
    }

    pub fn prepare_delete_account(
        &self,
        db: &Database,
        user_id: u64,
        password: &str,
    ) -> Result<PasswordJob, CoreError> {
        let user = db
            .user(user_id)
            .ok_or_else(|| CoreError::not_found("User", user_id))?;
        Ok(PasswordJob::verify(password, &user.password_hash))
    }

    pub fn finish_delete_account(
        &self,
        db: &mut Database,
        user_id: u64,
        outcome: PasswordOutcome,
    ) -> Result<(), CoreError> {
        let user = db
            .user(user_id)
            .ok_or_else(|| CoreError::not_found("User", user_id))?;
        if !outcome.matches(&user.password_hash) {
            let mut errors = FormErrors::new();
            errors.add("password", "Incorrect password. Please try again.");
            return Err(errors.into());
        }
        db.cascade_delete_user(user_id);
        tracing::info!(user_id, "Account deleted");
        Ok(())
    }

    /// Create a staff superuser without the signup strength rules.
    pub fn create_superuser(
        &self,
        db: &mut Database,
        username: &str,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Profile, CoreError> {
        let mut errors = FormErrors::new();
        let username = validation::required_text(&mut errors, "username", username, 150);
        if !username.is_empty() && !valid_username(&username) {
            errors.add("username", "Enter a valid username.");
        }
        if db.user_by_username(&username).is_some() {
            errors.add("username", "A user with that username already exists.");
        }
        if password.is_empty() {
            errors.add("password", "This field is required.");
        }
        let email = email.trim().to_string();
        if !email.is_empty() && !validation::is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        }
        // Superusers get their username as nickname; keep nicknames unique.
        if self.nickname_taken(db, &username, None) {
            errors.add(NON_FIELD, "That username is already used as a nickname.");
        }
        errors.into_result()?;

        let user = User {
            id: db.next_id(),
            nickname: username.clone(),
            username,
            email,
            password_hash: hash_password(password)?,
            profile_image: None,
            is_staff: true,
            is_superuser: true,
            date_joined: now,
            last_login: None,
        };
        let profile = user.profile();
        db.users.push(user);
        tracing::info!(username = %profile.username, "Superuser created");
        Ok(profile)
    }

    fn nickname_taken(&self, db: &Database, nickname: &str, except: Option<u64>) -> bool {
        !nickname.is_empty()
            && db
                .users
                .iter()
                .any(|u| Some(u.id) != except && u.nickname.eq_ignore_ascii_case(nickname))
    }

    fn user_mut<'a>(&self, db: &'a mut Database, user_id: u64) -> Result<&'a mut User, CoreError> {
        db.users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| CoreError::not_found("User", user_id))
    }
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}
