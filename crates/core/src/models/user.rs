use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Built-in avatars a user can pick instead of uploading an image.
pub const DEFAULT_AVATARS: [&str; 6] = [
    "avatars/avatar_1.png",
    "avatars/avatar_2.png",
    "avatars/avatar_3.png",
    "avatars/avatar_4.png",
    "avatars/avatar_5.png",
    "avatars/avatar_6.png",
];

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    /// Display name, unique across users
    pub nickname: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub profile_image: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            nickname: self.nickname.clone(),
            profile_image: self.profile_image.clone(),
            is_staff: self.is_staff,
            date_joined: self.date_joined,
            last_login: self.last_login,
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.username)
    }
}

/// Public view of a user (never carries the password hash).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub nickname: String,
    pub profile_image: Option<String>,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupInput {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub nickname: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileInput {
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    /// One of [`DEFAULT_AVATARS`]
    #[serde(default)]
    pub default_avatar: Option<String>,
    /// Remove the current profile image
    #[serde(default)]
    pub clear_image: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordChangeInput {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetInput {
    pub email: String,
    pub new_password1: String,
    pub new_password2: String,
}
