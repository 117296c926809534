//! Request payloads and their client-side validation
//!
//! Everything here is checked before a request is built, so a rejected form
//! never reaches the network and never touches the cache.

use crate::error::{FeedError, FeedResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::fs;

const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// Credentials for `POST /users/signin`
#[derive(Debug, Clone, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> FeedResult<()> {
        validate_email(&self.email)?;
        validate_password("Password", &self.password)
    }
}

/// Gender accepted by the signup endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => f.write_str("male"),
            Self::Female => f.write_str("female"),
        }
    }
}

/// Registration payload for `POST /users/signup`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub re_password: String,
    pub date_of_birth: String,
    pub gender: Gender,
}

impl SignupForm {
    pub fn validate(&self) -> FeedResult<()> {
        if self.name.trim().chars().count() < 3 {
            return Err(FeedError::validation(
                "Name must be at least 3 characters",
            ));
        }
        validate_email(&self.email)?;
        validate_password("Password", &self.password)?;
        if self.password != self.re_password {
            return Err(FeedError::validation("Passwords don't match"));
        }
        if self.date_of_birth.trim().is_empty() {
            return Err(FeedError::validation("Date of birth is required"));
        }
        Ok(())
    }
}

/// Payload for `PATCH /users/change-password`
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current: String,
    pub new: String,
    pub confirm: String,
}

impl PasswordChange {
    pub fn validate(&self) -> FeedResult<()> {
        validate_password("Password", &self.current)?;
        validate_password("New password", &self.new)?;
        if self.new != self.confirm {
            return Err(FeedError::validation("Passwords don't match"));
        }
        Ok(())
    }

    /// Wire body; the confirmation never leaves the client
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "password": self.current,
            "newPassword": self.new,
        })
    }
}

/// A file selected for upload
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = content_type_for(&filename).to_string();
        Self {
            filename,
            content_type,
            bytes,
        }
    }

    /// Read an image from disk
    pub async fn from_path(path: &Path) -> FeedResult<Self> {
        if !path.exists() {
            return Err(FeedError::PathNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)
            .await
            .map_err(|e| FeedError::io(format!("reading {}", path.display()), e))?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::new(filename, bytes))
    }

    /// Reject empty files and files over `max_bytes`
    pub fn check_size(&self, max_bytes: u64) -> FeedResult<()> {
        if self.bytes.is_empty() {
            return Err(FeedError::validation(format!("{} is empty", self.filename)));
        }
        if self.bytes.len() as u64 > max_bytes {
            return Err(FeedError::validation(format!(
                "File too large (max {}MB)",
                max_bytes / (1024 * 1024)
            )));
        }
        Ok(())
    }
}

/// A new post: text, an image, or both
#[derive(Debug, Clone)]
pub struct NewPost {
    pub body: String,
    pub image: Option<ImageUpload>,
}

impl NewPost {
    pub fn validate(&self) -> FeedResult<()> {
        if self.body.trim().is_empty() && self.image.is_none() {
            return Err(FeedError::validation("Please write text or add an image"));
        }
        Ok(())
    }
}

/// What an edit does to the post image
#[derive(Debug, Clone, Default)]
pub enum ImageChange {
    #[default]
    Keep,
    Remove,
    Replace(ImageUpload),
}

/// An edit of an existing post
#[derive(Debug, Clone)]
pub struct PostEdit {
    pub body: String,
    pub image: ImageChange,
}

impl PostEdit {
    /// `had_image` tells whether the post currently carries an image
    pub fn validate(&self, had_image: bool) -> FeedResult<()> {
        let keeps_image = match self.image {
            ImageChange::Keep => had_image,
            ImageChange::Remove => false,
            ImageChange::Replace(_) => true,
        };
        if self.body.trim().is_empty() && !keeps_image {
            return Err(FeedError::validation("Please write text or add an image"));
        }
        Ok(())
    }
}

/// Comment text, for create and edit
pub fn validate_comment(content: &str) -> FeedResult<()> {
    if content.trim().is_empty() {
        return Err(FeedError::validation("Comment cannot be empty"));
    }
    Ok(())
}

fn validate_email(email: &str) -> FeedResult<()> {
    let invalid = || FeedError::validation("Invalid email address");
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || tld.len() < 2 {
        return Err(invalid());
    }
    Ok(())
}

fn validate_password(label: &str, password: &str) -> FeedResult<()> {
    if password.chars().count() < 8 {
        return Err(FeedError::validation(format!(
            "{} must be at least 8 characters",
            label
        )));
    }
    let rules: [(fn(char) -> bool, &str); 4] = [
        (|c| c.is_ascii_uppercase(), "one uppercase letter"),
        (|c| c.is_ascii_lowercase(), "one lowercase letter"),
        (|c| c.is_ascii_digit(), "one number"),
        (|c| PASSWORD_SPECIALS.contains(c), "one special character"),
    ];
    for (check, what) in rules {
        if !password.chars().any(check) {
            return Err(FeedError::validation(format!(
                "{} must contain at least {}",
                label, what
            )));
        }
    }
    Ok(())
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup() -> SignupForm {
        SignupForm {
            name: "Ada".to_string(),
            email: "a@b.com".to_string(),
            password: "Aa1@aaaa".to_string(),
            re_password: "Aa1@aaaa".to_string(),
            date_of_birth: "1990-01-01".to_string(),
            gender: Gender::Female,
        }
    }

    #[test]
    fn login_accepts_valid_credentials() {
        let form = LoginForm {
            email: "a@b.com".to_string(),
            password: "Aa1@aaaa".to_string(),
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn password_rules() {
        for (password, expected) in [
            ("Aa1@", "at least 8 characters"),
            ("aa1@aaaa", "uppercase"),
            ("AA1@AAAA", "lowercase"),
            ("Aaa@aaaa", "number"),
            ("Aa1aaaaa", "special"),
        ] {
            let err = validate_password("Password", password).unwrap_err();
            assert!(err.to_string().contains(expected), "{password}: {err}");
        }
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("user@example.org").is_ok());
        for bad in ["", "user", "user@", "@example.com", "us er@x.com", "a@b", "a@b@c.com"] {
            assert!(validate_email(bad).is_err(), "{bad} accepted");
        }
    }

    #[test]
    fn signup_checks_repeat_and_name() {
        assert!(signup().validate().is_ok());

        let mut form = signup();
        form.re_password = "Bb2@bbbb".to_string();
        assert!(form.validate().unwrap_err().to_string().contains("don't match"));

        let mut form = signup();
        form.name = "Al".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn signup_wire_names() {
        let json = serde_json::to_value(signup()).unwrap();
        assert_eq!(json["rePassword"], "Aa1@aaaa");
        assert_eq!(json["dateOfBirth"], "1990-01-01");
        assert_eq!(json["gender"], "female");
    }

    #[test]
    fn password_change_requires_matching_confirmation() {
        let change = PasswordChange {
            current: "Aa1@aaaa".to_string(),
            new: "Bb2@bbbb".to_string(),
            confirm: "Bb2@bbbc".to_string(),
        };
        assert!(change.validate().is_err());
        assert!(change.to_json().get("confirm").is_none());
    }

    #[test]
    fn empty_post_is_rejected() {
        let post = NewPost {
            body: "   ".to_string(),
            image: None,
        };
        assert!(matches!(post.validate(), Err(FeedError::Validation(_))));

        let with_image = NewPost {
            body: String::new(),
            image: Some(ImageUpload::new("a.png", vec![1, 2, 3])),
        };
        assert!(with_image.validate().is_ok());
    }

    #[test]
    fn edit_may_clear_body_only_when_an_image_remains() {
        let edit = PostEdit {
            body: String::new(),
            image: ImageChange::Keep,
        };
        assert!(edit.validate(true).is_ok());
        assert!(edit.validate(false).is_err());
    }

    #[test]
    fn upload_size_limit() {
        let image = ImageUpload::new("me.JPG", vec![0; 10]);
        assert_eq!(image.content_type, "image/jpeg");
        assert!(image.check_size(10).is_ok());
        assert!(image.check_size(9).is_err());
        assert!(ImageUpload::new("x.png", vec![]).check_size(10).is_err());
    }
}
