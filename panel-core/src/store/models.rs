use serde::{Deserialize, Serialize};

/// Placeholder stored when a comic has no external id.
pub const PLACEHOLDER_ID: &str = "------";
pub const STATUS_IN_PROGRESS: &str = "--------";
pub const STATUS_COMPLETE: &str = "complete";

/// The status a row moves to when toggled.
pub fn next_status(current: &str) -> &'static str {
    if current == STATUS_IN_PROGRESS {
        STATUS_COMPLETE
    } else {
        STATUS_IN_PROGRESS
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterReference {
    pub title: String,
    pub url: String,
}

impl ChapterReference {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// One crawled page: its 0-based index and the image location or the error
/// sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub index: usize,
    pub value: String,
}

impl PageRecord {
    pub fn new(index: usize, value: impl Into<String>) -> Self {
        Self {
            index,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRow {
    pub primary_name: String,
    pub secondary_name: String,
    pub external_id: String,
    pub status: String,
}

impl MenuRow {
    /// A freshly tracked comic, in progress, with the placeholder id when
    /// none is known.
    pub fn new(
        primary_name: impl Into<String>,
        secondary_name: impl Into<String>,
        external_id: Option<String>,
    ) -> Self {
        Self {
            primary_name: primary_name.into(),
            secondary_name: secondary_name.into(),
            external_id: external_id.unwrap_or_else(|| PLACEHOLDER_ID.to_string()),
            status: STATUS_IN_PROGRESS.to_string(),
        }
    }

    pub fn has_external_id(&self) -> bool {
        self.external_id != PLACEHOLDER_ID && !self.external_id.is_empty()
    }

    /// Case-insensitive match of `key` against either name or the external id.
    /// Empty fields and the placeholder id never match.
    pub fn matches_key(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        let id = self.has_external_id().then_some(&self.external_id);
        [Some(&self.primary_name), Some(&self.secondary_name), id]
            .into_iter()
            .flatten()
            .filter(|field| !field.is_empty())
            .any(|field| field.to_lowercase() == key)
    }

    pub fn to_fields(&self) -> [&str; 4] {
        [
            &self.primary_name,
            &self.secondary_name,
            &self.external_id,
            &self.status,
        ]
    }

    /// Builds a row from a delimited record; short records are padded with
    /// empty fields.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        let field = |index: usize| {
            fields
                .get(index)
                .map(|value| value.as_ref().to_string())
                .unwrap_or_default()
        };
        Self {
            primary_name: field(0),
            secondary_name: field(1),
            external_id: field(2),
            status: field(3),
        }
    }
}

/// Fields to overwrite in matching registry rows; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuPatch {
    pub primary_name: Option<String>,
    pub secondary_name: Option<String>,
    pub external_id: Option<String>,
    pub status: Option<String>,
}

impl MenuPatch {
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary_name.is_none()
            && self.secondary_name.is_none()
            && self.external_id.is_none()
            && self.status.is_none()
    }

    pub fn apply(&self, row: &mut MenuRow) {
        if let Some(value) = &self.primary_name {
            row.primary_name = value.clone();
        }
        if let Some(value) = &self.secondary_name {
            row.secondary_name = value.clone();
        }
        if let Some(value) = &self.external_id {
            row.external_id = value.clone();
        }
        if let Some(value) = &self.status {
            row.status = value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_flips_between_literals() {
        assert_eq!(next_status(STATUS_IN_PROGRESS), STATUS_COMPLETE);
        assert_eq!(next_status(STATUS_COMPLETE), STATUS_IN_PROGRESS);
        assert_eq!(next_status(""), STATUS_IN_PROGRESS);
    }

    #[test]
    fn new_row_uses_placeholder_id() {
        let row = MenuRow::new("Alice", "爱丽丝", None);
        assert_eq!(row.external_id, PLACEHOLDER_ID);
        assert!(!row.has_external_id());
        assert_eq!(row.status, STATUS_IN_PROGRESS);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut row = MenuRow::new("Alice", "爱丽丝", Some("4821".into()));
        MenuPatch::status(STATUS_COMPLETE).apply(&mut row);
        assert_eq!(row.status, STATUS_COMPLETE);
        assert_eq!(row.primary_name, "Alice");
        assert_eq!(row.external_id, "4821");
    }

    #[test]
    fn placeholder_id_is_not_a_key() {
        let row = MenuRow::new("Alice", "", None);
        assert!(row.matches_key("ALICE"));
        assert!(!row.matches_key(PLACEHOLDER_ID));
        assert!(!row.matches_key(""));
        assert!(MenuRow::new("Saga", "サガ", Some("4821".into())).matches_key("4821"));
    }

    #[test]
    fn short_records_are_padded() {
        let row = MenuRow::from_fields(&["Alice", "爱丽丝"]);
        assert_eq!(row.external_id, "");
        assert_eq!(row.status, "");
    }
}
