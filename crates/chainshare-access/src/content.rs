//! Content identifiers and file metadata

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::AccessError;

const MAX_CONTENT_ID_LEN: usize = 128;

/// Content-addressed identifier of a file's bytes; the registry's file key
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    pub fn new(s: &str) -> Result<Self, AccessError> {
        let s = s.trim();
        if s.is_empty() || s.len() > MAX_CONTENT_ID_LEN {
            return Err(AccessError::InvalidContentId(s.to_string()));
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(AccessError::InvalidContentId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentId {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentId::new(s)
    }
}

impl TryFrom<String> for ContentId {
    type Error = AccessError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ContentId::new(&s)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.0
    }
}

/// Metadata for an uploaded file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub content_id: ContentId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    /// Unix timestamp
    pub created_at: u64,
    /// Who uploaded the file
    pub uploader: Address,
}

impl FileRecord {
    pub fn new(
        content_id: ContentId,
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        uploader: Address,
    ) -> Self {
        Self {
            content_id,
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            created_at: crate::unix_now(),
            uploader,
        }
    }
}
