//! Image artifact metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata record for a generated image.
///
/// The record is only ever written after the blob at `storage_ref` is
/// durable, so a stored record never references a missing blob. The reverse
/// (an orphan blob with no record) is possible after a crash and is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// Store-assigned, monotonically increasing identifier
    pub id: u64,
    /// Original prompt text
    pub prompt: String,
    /// Blob name derived from the prompt
    pub storage_ref: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Derive the blob name for a prompt: every whitespace character becomes an
/// underscore and a `.jpg` extension is appended.
///
/// Prompts that differ only in whitespace collide on the same reference and
/// the later blob overwrites the earlier one. That matches the record layout
/// this store inherited; the metadata rows stay distinct.
pub fn storage_ref(prompt: &str) -> String {
    let name: String = prompt
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("{name}.jpg")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_ref_derivation() {
        assert_eq!(storage_ref("a lovely cat"), "a_lovely_cat.jpg");
        assert_eq!(storage_ref("cat"), "cat.jpg");
    }

    #[test]
    fn test_storage_ref_replaces_all_whitespace() {
        assert_eq!(storage_ref("a\tlovely\ncat"), "a_lovely_cat.jpg");
    }

    #[test]
    fn test_whitespace_variants_collide() {
        // Accepted tradeoff: the blob is shared, the records are not.
        assert_eq!(storage_ref("a lovely cat"), storage_ref("a\tlovely cat"));
    }
}
