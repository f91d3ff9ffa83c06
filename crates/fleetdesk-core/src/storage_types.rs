use std::fmt;
use std::str::FromStr;

/// Where uploaded documents are kept.
///
/// Lives in core because `Config` picks it before any storage crate is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Local,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::S3 => "s3",
            StorageBackend::Local => "local",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [StorageBackend::S3, StorageBackend::Local]
            .into_iter()
            .find(|b| s.trim().eq_ignore_ascii_case(b.as_str()))
            .ok_or_else(|| anyhow::anyhow!("Unknown STORAGE_BACKEND '{}', expected s3 or local", s))
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
