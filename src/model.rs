use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One book's metadata as read from the e-reader database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub title: String,
    pub subtitle: Option<String>,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub series: Option<String>,
    pub series_number: Option<String>,
    pub read_percent: u8,
    pub cover_image_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight,
    Note,
}

impl AnnotationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Highlight => "highlight",
            AnnotationKind::Note => "note",
        }
    }

    /// Kobo stores `highlight`, `note` and `dogear` bookmarks. Anything that is not a
    /// plain highlight renders like a note.
    pub fn from_kobo(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "highlight" => AnnotationKind::Highlight,
            _ => AnnotationKind::Note,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub volume_id: String,
    pub text: Option<String>,
    pub note: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub kind: AnnotationKind,
}

impl AnnotationRecord {
    pub fn highlight(text: &str) -> Self {
        Self {
            volume_id: String::new(),
            text: Some(text.to_string()),
            note: None,
            created_at: None,
            kind: AnnotationKind::Highlight,
        }
    }

    pub fn note(note: Option<&str>, text: Option<&str>) -> Self {
        Self {
            volume_id: String::new(),
            text: text.map(str::to_string),
            note: note.map(str::to_string),
            created_at: None,
            kind: AnnotationKind::Note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_kobo() {
        assert_eq!(AnnotationKind::from_kobo("highlight"), AnnotationKind::Highlight);
        assert_eq!(AnnotationKind::from_kobo("Highlight"), AnnotationKind::Highlight);
        assert_eq!(AnnotationKind::from_kobo("note"), AnnotationKind::Note);
        assert_eq!(AnnotationKind::from_kobo("dogear"), AnnotationKind::Note);
    }
}
