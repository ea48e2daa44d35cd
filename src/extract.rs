//! Reading typed values out of card and photo pages.
use crate::notion::model::{FileObject, Page, PropertyValue, RichText};

/// One way of reading a string out of a property.
pub type Extractor = fn(&PropertyValue) -> Option<String>;

/// Verse-key readers in precedence order.
pub const VERSE_KEY_EXTRACTORS: [Extractor; 3] = [from_rich_text, from_title, from_formula];

fn joined(parts: &[RichText]) -> String {
    parts.iter().map(|t| t.plain_text.as_str()).collect()
}

pub fn from_rich_text(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::RichText { rich_text } => Some(joined(rich_text)),
        _ => None,
    }
}

pub fn from_title(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Title { title } => Some(joined(title)),
        _ => None,
    }
}

pub fn from_formula(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Formula { formula } => formula.string.clone(),
        _ => None,
    }
}

/// Run `extractors` in order; the first non-empty string wins.
pub fn first_text(value: &PropertyValue, extractors: &[Extractor]) -> Option<String> {
    extractors
        .iter()
        .filter_map(|extract| extract(value))
        .find(|s| !s.is_empty())
}

pub fn verse_key(page: &Page, prop: &str) -> Option<String> {
    page.property(prop)
        .and_then(|value| first_text(&value, &VERSE_KEY_EXTRACTORS))
}

/// Select label of `prop`, or `default` when absent or blank.
pub fn version(page: &Page, prop: &str, default: &str) -> String {
    match page.property(prop) {
        Some(PropertyValue::Select {
            select: Some(option),
        }) if !option.name.is_empty() => option.name,
        _ => default.to_string(),
    }
}

/// Whether `prop` exists on the page as a checkbox.
pub fn is_checkbox(page: &Page, prop: &str) -> bool {
    matches!(page.property(prop), Some(PropertyValue::Checkbox { .. }))
}

pub fn is_date(page: &Page, prop: &str) -> bool {
    matches!(page.property(prop), Some(PropertyValue::Date { .. }))
}

/// Whether the text property is missing or has no content.
pub fn text_is_empty(page: &Page, prop: &str) -> bool {
    page.property(prop)
        .and_then(|value| first_text(&value, &[from_rich_text, from_title]))
        .is_none()
}

fn file_url(file: &FileObject) -> Option<String> {
    file.external
        .as_ref()
        .or(file.file.as_ref())
        .map(|u| u.url.clone())
        .filter(|url| !url.is_empty())
}

/// Cover image first, then the first non-empty files property.
pub fn photo_url(page: &Page) -> Option<String> {
    if let Some(url) = page.cover.as_ref().and_then(file_url) {
        return Some(url);
    }
    page.iter_properties()
        .find_map(|(_, value)| match value {
            PropertyValue::Files { files } if !files.is_empty() => Some(files),
            _ => None,
        })
        .and_then(|files| file_url(&files[0]))
}
