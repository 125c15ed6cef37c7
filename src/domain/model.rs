use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::protocol::SignatureType;
use crate::utils::error::Result;

/// A key pair generated by the router with `DEST GENERATE`.
///
/// `public` is the base64 destination peers connect to; `secret` is the
/// private destination a session is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationKeys {
    pub public: String,
    pub secret: String,
    #[serde(default)]
    pub signature_type: SignatureType,
}

impl DestinationKeys {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}
