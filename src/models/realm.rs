//! Rules for the name and path segment of a new child realm.

use thiserror::Error;

/// Characters that may not appear anywhere in a path segment.
pub const ILLEGAL_CHARS: &str = "<>\"[\\]^`{|}#%/?";

/// Characters a path segment may not start with.
pub const RESERVED_CHARS: &str = "-+~@_!$&;:.,=*'()";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealmFieldError {
    #[error("This field is required")]
    Required,
    #[error("Must be at least 2 characters long")]
    TooShort,
    #[error("Must not contain whitespace or control characters")]
    Whitespace,
    #[error("Must not contain any of: {}", ILLEGAL_CHARS)]
    IllegalChar,
    #[error("Must not start with any of: {}", RESERVED_CHARS)]
    ReservedStart,
}

/// A child realm that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRealm {
    pub name: String,
    pub path_segment: String,
}

/// Field errors of the add child form. `None` means the field is fine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewRealmErrors {
    pub name: Option<RealmFieldError>,
    pub path_segment: Option<RealmFieldError>,
}

pub fn validate_name(name: &str) -> Result<(), RealmFieldError> {
    if name.trim().is_empty() {
        return Err(RealmFieldError::Required);
    }
    Ok(())
}

pub fn validate_path_segment(segment: &str) -> Result<(), RealmFieldError> {
    if segment.is_empty() {
        return Err(RealmFieldError::Required);
    }
    if segment.chars().count() < 2 {
        return Err(RealmFieldError::TooShort);
    }
    if segment.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RealmFieldError::Whitespace);
    }
    if segment.chars().any(|c| ILLEGAL_CHARS.contains(c)) {
        return Err(RealmFieldError::IllegalChar);
    }
    if segment.starts_with(|c| RESERVED_CHARS.contains(c)) {
        return Err(RealmFieldError::ReservedStart);
    }
    Ok(())
}

impl NewRealm {
    pub fn validate(name: &str, path_segment: &str) -> Result<Self, NewRealmErrors> {
        let errors = NewRealmErrors {
            name: validate_name(name).err(),
            path_segment: validate_path_segment(path_segment).err(),
        };
        if errors.name.is_some() || errors.path_segment.is_some() {
            return Err(errors);
        }
        Ok(Self {
            name: name.trim().to_string(),
            path_segment: path_segment.to_string(),
        })
    }
}
