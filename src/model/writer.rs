use serde::{Deserialize, Serialize};

/// A book author.
///
/// Writers are deduplicated by name. `id` stays `None` until the repository
/// has upserted the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Writer {
    pub id: Option<i64>,
    pub name: String,
}

impl Writer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_new_has_no_id() {
        let writer = Writer::new("writer");
        assert_eq!(writer.id, None);
        assert_eq!(writer.name, "writer");
    }
}
