/// Domain record ID (leads, proposals, work orders, invoices, customers,
/// audit entries). Wraps ULID. Records of different kinds live in different
/// tables, so a single id newtype covers all of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RecordId(ulid::Ulid);

impl RecordId {
    /// Generate a new random ULID.
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Get as string for storage/display.
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }

    /// Parse from string.
    pub fn from_string(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
