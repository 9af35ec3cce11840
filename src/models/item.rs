//! Catalog item model and key validation

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Bibliographic metadata of an item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ItemMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub publication_year: String,
    #[serde(default)]
    pub genres: String,
    #[serde(default)]
    pub acquisition_date: String,
    #[serde(default)]
    pub acquisition_location: String,
    /// Shelf the item lives on when checked in
    #[serde(default)]
    pub home_shelf: String,
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub isbn: String,
    #[serde(flatten)]
    pub metadata: ItemMetadata,
}

impl Item {
    pub fn new(isbn: impl Into<String>, metadata: ItemMetadata) -> Self {
        Self {
            isbn: isbn.into(),
            metadata,
        }
    }
}

/// Partial metadata, typically produced by an ISBN lookup.
///
/// Present, non-blank values replace whatever was entered by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MetadataPatch {
    pub title: Option<String>,
    pub authors: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<String>,
    pub genres: Option<String>,
    pub acquisition_date: Option<String>,
    pub acquisition_location: Option<String>,
    pub home_shelf: Option<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        [
            &self.title,
            &self.authors,
            &self.language,
            &self.publisher,
            &self.publication_year,
            &self.genres,
            &self.acquisition_date,
            &self.acquisition_location,
            &self.home_shelf,
        ]
        .iter()
        .all(|field| field.as_deref().map_or(true, |v| v.trim().is_empty()))
    }

    /// Merge into `metadata`, returning the updated copy
    pub fn apply_to(&self, metadata: &ItemMetadata) -> ItemMetadata {
        fn pick(patch: &Option<String>, current: &str) -> String {
            match patch.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => current.to_string(),
            }
        }

        ItemMetadata {
            title: pick(&self.title, &metadata.title),
            authors: pick(&self.authors, &metadata.authors),
            language: pick(&self.language, &metadata.language),
            publisher: pick(&self.publisher, &metadata.publisher),
            publication_year: pick(&self.publication_year, &metadata.publication_year),
            genres: pick(&self.genres, &metadata.genres),
            acquisition_date: pick(&self.acquisition_date, &metadata.acquisition_date),
            acquisition_location: pick(&self.acquisition_location, &metadata.acquisition_location),
            home_shelf: pick(&self.home_shelf, &metadata.home_shelf),
        }
    }
}

/// Normalize a raw item key.
///
/// Blank input is rejected before any lookup so that "no input" is never
/// reported as "not found".
pub fn validate_key(raw: &str, strict_isbn: bool) -> AppResult<String> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(AppError::InvalidKey("ISBN must not be empty".to_string()));
    }
    if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AppError::InvalidKey(format!("'{}' contains whitespace", key)));
    }
    if strict_isbn && !is_valid_isbn(key) {
        return Err(AppError::InvalidKey(format!("'{}' is not a valid ISBN", key)));
    }
    Ok(key.to_string())
}

/// ISBN-10 or ISBN-13 with a correct check digit; hyphens are ignored
pub fn is_valid_isbn(value: &str) -> bool {
    let chars: Vec<char> = value.chars().filter(|c| *c != '-').collect();
    match chars.len() {
        10 => {
            let mut sum = 0u32;
            for (i, c) in chars.iter().enumerate() {
                let digit = match (i, c) {
                    (9, 'X') | (9, 'x') => 10,
                    (_, c) => match c.to_digit(10) {
                        Some(d) => d,
                        None => return false,
                    },
                };
                sum += digit * (10 - i as u32);
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0u32;
            for (i, c) in chars.iter().enumerate() {
                let Some(d) = c.to_digit(10) else {
                    return false;
                };
                sum += if i % 2 == 0 { d } else { d * 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}
