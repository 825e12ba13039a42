//! Command keywords understood by the node

/// Identifier of a command handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandId {
    /// Read fields from the HDC1080 temperature/humidity sensor
    Hdc1080,
    /// Read fields from the MS5637 pressure/temperature sensor
    Ms5637,
    /// Identification
    Id,
    /// No table entry matched. Never stored in [`COMMAND_TABLE`].
    Unknown,
}

/// Keyword to command mapping
pub struct CommandRecord {
    /// Uppercase keyword as sent on the wire
    pub keyword: &'static str,
    pub id: CommandId,
}

pub static COMMAND_TABLE: &[CommandRecord] = &[
    CommandRecord { keyword: "HDC1080", id: CommandId::Hdc1080 },
    CommandRecord { keyword: "MS5637", id: CommandId::Ms5637 },
    CommandRecord { keyword: "ID", id: CommandId::Id },
];

/// Look up an already-uppercased keyword. Matching is exact.
pub fn find_command_id(keyword: &[u8]) -> CommandId {
    COMMAND_TABLE
        .iter()
        .find(|record| record.keyword.as_bytes() == keyword)
        .map_or(CommandId::Unknown, |record| record.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_keywords_are_unique_and_uppercase() {
        for (i, record) in COMMAND_TABLE.iter().enumerate() {
            assert_eq!(record.keyword, record.keyword.to_ascii_uppercase());
            assert_ne!(record.id, CommandId::Unknown);
            assert!(
                COMMAND_TABLE[i + 1..]
                    .iter()
                    .all(|other| other.keyword != record.keyword),
                "Keyword '{}' listed twice",
                record.keyword
            );
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(find_command_id(b"HDC1080"), CommandId::Hdc1080);
        assert_eq!(find_command_id(b"MS5637"), CommandId::Ms5637);
        assert_eq!(find_command_id(b"ID"), CommandId::Id);
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        assert_eq!(find_command_id(b"hdc1080"), CommandId::Unknown);
        assert_eq!(find_command_id(b"HDC"), CommandId::Unknown);
        assert_eq!(find_command_id(b"IDX"), CommandId::Unknown);
        assert_eq!(find_command_id(b""), CommandId::Unknown);
    }
}
