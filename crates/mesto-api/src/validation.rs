//! Declarative input validation.
//!
//! Each request type lists its fields with the rules they must satisfy, and
//! [`check`] walks that list. Nothing here touches axum or the store, so a
//! request that fails validation never reaches either.

use std::sync::LazyLock;

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use regex::Regex;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use mesto_types::api::{
    CreateCardRequest, SigninRequest, SignupRequest, UpdateAvatarRequest, UpdateProfileRequest,
};

use crate::error::ApiError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Must contain something other than whitespace.
    NonBlank,
    /// Length in characters, inclusive on both ends.
    Length { min: usize, max: usize },
    Email,
    /// Absolute http or https URL with a host.
    Url,
}

pub const NAME: &[Rule] = &[Rule::Length { min: 2, max: 30 }];
pub const ABOUT: &[Rule] = &[Rule::Length { min: 2, max: 30 }];
pub const AVATAR: &[Rule] = &[Rule::Url];
pub const EMAIL: &[Rule] = &[Rule::Email];
pub const PASSWORD: &[Rule] = &[Rule::NonBlank];
pub const CARD_NAME: &[Rule] = &[Rule::Length { min: 2, max: 30 }];
pub const CARD_LINK: &[Rule] = &[Rule::Url];

pub struct Field<'a> {
    pub name: &'static str,
    pub value: Option<&'a str>,
    pub required: bool,
    pub rules: &'static [Rule],
}

impl<'a> Field<'a> {
    pub fn required(name: &'static str, value: &'a str, rules: &'static [Rule]) -> Self {
        Self {
            name,
            value: Some(value),
            required: true,
            rules,
        }
    }

    pub fn optional(name: &'static str, value: Option<&'a str>, rules: &'static [Rule]) -> Self {
        Self {
            name,
            value,
            required: false,
            rules,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Checks fields in order and reports the first violation.
pub fn check(fields: &[Field<'_>]) -> Result<(), ValidationError> {
    for field in fields {
        let Some(value) = field.value else {
            if field.required {
                return Err(ValidationError::new(field.name, "is required"));
            }
            continue;
        };

        if field.required && value.is_empty() {
            return Err(ValidationError::new(field.name, "is required"));
        }

        for rule in field.rules {
            apply(field.name, value, *rule)?;
        }
    }
    Ok(())
}

fn apply(name: &'static str, value: &str, rule: Rule) -> Result<(), ValidationError> {
    match rule {
        Rule::NonBlank => {
            if value.trim().is_empty() {
                return Err(ValidationError::new(name, "must not be blank"));
            }
        }
        Rule::Length { min, max } => {
            let len = value.chars().count();
            if len < min || len > max {
                return Err(ValidationError::new(
                    name,
                    format!("must be {} to {} characters", min, max),
                ));
            }
        }
        Rule::Email => {
            if !EMAIL_RE.is_match(value) {
                return Err(ValidationError::new(name, "must be a valid email address"));
            }
        }
        Rule::Url => {
            let ok = Url::parse(value)
                .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
                .unwrap_or(false);
            if !ok {
                return Err(ValidationError::new(name, "must be a valid http(s) URL"));
            }
        }
    }
    Ok(())
}

/// Parses a path id. A malformed id is a validation failure, not a 404.
pub fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(raw).map_err(|_| ValidationError::new(field, "is not a valid id"))
}

// -- Request schemas --

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for SignupRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check(&[
            Field::required("email", &self.email, EMAIL),
            Field::required("password", &self.password, PASSWORD),
            Field::optional("name", self.name.as_deref(), NAME),
            Field::optional("about", self.about.as_deref(), ABOUT),
            Field::optional("avatar", self.avatar.as_deref(), AVATAR),
        ])
    }
}

impl Validate for SigninRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check(&[
            Field::required("email", &self.email, EMAIL),
            Field::required("password", &self.password, PASSWORD),
        ])
    }
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check(&[
            Field::required("name", &self.name, NAME),
            Field::required("about", &self.about, ABOUT),
        ])
    }
}

impl Validate for UpdateAvatarRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check(&[Field::required("avatar", &self.avatar, AVATAR)])
    }
}

impl Validate for CreateCardRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check(&[
            Field::required("name", &self.name, CARD_NAME),
            Field::required("link", &self.link, CARD_LINK),
        ])
    }
}

/// JSON body extractor that rejects malformed or invalid input with the
/// structured 400 body, before the handler runs.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
