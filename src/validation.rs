//! Field rules for student submissions.
//!
//! The same functions back the registration form and the API, so a
//! submission the form accepts is one the server accepts. Every rule runs on
//! every submission; callers get the whole set of violations at once.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::StudentFields;

/// Largest accepted photo, in bytes
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_PHOTO_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const COMPANY_MAX_CHARS: usize = 255;
pub const PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    Required,
    TooShort,
    TooLong,
    InvalidCharacters,
    InvalidFormat,
    Duplicate,
    UnsupportedType,
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Company,
    Phone1,
    Phone2,
    Email,
    Photo,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Company => "company",
            Field::Phone1 => "phone1",
            Field::Phone2 => "phone2",
            Field::Email => "email",
            Field::Photo => "photo",
        }
    }
}

/// A single failed rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: Field,
    pub kind: RuleKind,
    pub message: String,
}

impl Violation {
    pub fn new(field: Field, kind: RuleKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

/// Every rule a submission broke, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &Violation> {
        self.0.iter().filter(move |v| v.field == field)
    }

    /// First message reported for a field, for inline form errors
    pub fn message_for(&self, field: Field) -> Option<&str> {
        self.for_field(field).next().map(|v| v.message.as_str())
    }

    pub fn has(&self, field: Field, kind: RuleKind) -> bool {
        self.for_field(field).any(|v| v.kind == kind)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<Vec<Violation>> for ValidationErrors {
    fn from(v: Vec<Violation>) -> Self {
        Self(v)
    }
}

impl Extend<Violation> for ValidationErrors {
    fn extend<T: IntoIterator<Item = Violation>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|v| v.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Toggles that differ between deployments
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSet {
    pub require_company: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoRule {
    Required,
    Optional,
}

/// What the rules need to know about an uploaded photo
#[derive(Debug, Clone, Copy)]
pub struct PhotoInfo<'a> {
    pub content_type: &'a str,
    pub size: usize,
}

/// Digits of a phone number, separators dropped
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn validate_name(name: &str) -> Vec<Violation> {
    let name = name.trim();
    if name.is_empty() {
        return vec![Violation::new(Field::Name, RuleKind::Required, "Full Name is required")];
    }

    let mut out = Vec::new();
    if !name.chars().all(|c| c.is_alphabetic() || c == ' ') {
        out.push(Violation::new(
            Field::Name,
            RuleKind::InvalidCharacters,
            "Name must contain only letters and spaces",
        ));
    }

    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        out.push(Violation::new(
            Field::Name,
            RuleKind::TooShort,
            "Name must be at least 2 characters",
        ));
    } else if len > NAME_MAX_CHARS {
        out.push(Violation::new(
            Field::Name,
            RuleKind::TooLong,
            "Name must not exceed 100 characters",
        ));
    }
    out
}

pub fn validate_company(company: &str, required: bool) -> Vec<Violation> {
    let company = company.trim();
    if company.is_empty() {
        if required {
            return vec![Violation::new(Field::Company, RuleKind::Required, "Company is required")];
        }
        return Vec::new();
    }
    if company.chars().count() > COMPANY_MAX_CHARS {
        return vec![Violation::new(
            Field::Company,
            RuleKind::TooLong,
            "Company must not exceed 255 characters",
        )];
    }
    Vec::new()
}

pub fn validate_email(email: &str) -> Vec<Violation> {
    let email = email.trim();
    if email.is_empty() {
        return vec![Violation::new(Field::Email, RuleKind::Required, "Email is required")];
    }
    if !is_valid_email(email) {
        return vec![Violation::new(
            Field::Email,
            RuleKind::InvalidFormat,
            "Enter a valid email (e.g., user@example.com)",
        )];
    }
    Vec::new()
}

/// `local@domain.tld`: local part of letters, digits and `._%-`, domain of
/// letters, digits and `.-`, final label at least two letters.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '-'));
    if !local_ok {
        return false;
    }

    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
    host_ok && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Exactly ten digits once separators are removed. A required phone with no
/// digits at all counts as missing.
pub fn validate_phone(field: Field, phone: &str, required: bool) -> Vec<Violation> {
    let (label, missing) = match field {
        Field::Phone2 => ("Phone 2", "Alternate phone number is required"),
        _ => ("Phone 1", "Primary phone number is required"),
    };
    let digits = normalize_phone(phone);
    if digits.is_empty() {
        if required {
            return vec![Violation::new(field, RuleKind::Required, missing)];
        }
        if phone.trim().is_empty() {
            return Vec::new();
        }
    }
    if digits.len() != PHONE_DIGITS {
        return vec![Violation::new(
            field,
            RuleKind::InvalidFormat,
            format!("{} must be exactly 10 digits", label),
        )];
    }
    Vec::new()
}

pub fn validate_phone_pair(phone1: &str, phone2: &str) -> Vec<Violation> {
    let p1 = normalize_phone(phone1);
    let p2 = normalize_phone(phone2);
    if !p1.is_empty() && p1 == p2 {
        return vec![Violation::new(
            Field::Phone2,
            RuleKind::Duplicate,
            "Alternate phone number must be different from the primary phone number",
        )];
    }
    Vec::new()
}

/// Lower-cased MIME essence, parameters dropped
pub fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

pub fn is_allowed_photo_type(content_type: &str) -> bool {
    let essence = mime_essence(content_type);
    ALLOWED_PHOTO_TYPES.contains(&essence.as_str())
}

pub fn validate_photo(photo: Option<PhotoInfo<'_>>) -> Vec<Violation> {
    let photo = match photo {
        Some(p) if p.size > 0 => p,
        _ => {
            return vec![Violation::new(
                Field::Photo,
                RuleKind::Required,
                "Student photo is required",
            )]
        }
    };

    let mut out = Vec::new();
    if !is_allowed_photo_type(photo.content_type) {
        out.push(Violation::new(
            Field::Photo,
            RuleKind::UnsupportedType,
            "Only PNG, JPG, GIF files are allowed",
        ));
    }
    if photo.size > MAX_PHOTO_BYTES {
        out.push(Violation::new(
            Field::Photo,
            RuleKind::TooLarge,
            "Photo must not exceed 5MB",
        ));
    }
    out
}

/// Run every rule against a submission
pub fn validate_submission(
    fields: &StudentFields,
    photo: Option<PhotoInfo<'_>>,
    photo_rule: PhotoRule,
    rules: RuleSet,
) -> Result<(), ValidationErrors> {
    let phone2 = fields.phone2.as_deref().unwrap_or("");

    let mut errors = ValidationErrors::default();
    errors.extend(validate_name(&fields.name));
    errors.extend(validate_company(
        fields.company.as_deref().unwrap_or(""),
        rules.require_company,
    ));
    errors.extend(validate_phone(Field::Phone1, &fields.phone1, true));
    errors.extend(validate_phone(Field::Phone2, phone2, false));
    errors.extend(validate_phone_pair(&fields.phone1, phone2));
    errors.extend(validate_email(&fields.email));
    match (photo, photo_rule) {
        (None, PhotoRule::Optional) => {}
        (photo, _) => errors.extend(validate_photo(photo)),
    }
    errors.into_result()
}
