//! Common type definitions shared across the crate.
//!
//! All entity IDs are UUIDs wrapped in type aliases for better type safety:
//!
//! - [`ArtifactId`]: identifier of a generated document on disk
//! - [`RequestId`]: identifier assigned to a generation request at intake

use uuid::Uuid;

pub type ArtifactId = Uuid;
pub type RequestId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs.
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbrev_takes_first_eight_chars() {
        let id: Uuid = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
