use crate::{AssetKind, ResourceUrn};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError
{
    // unparseable or empty identifier segment
    #[error("Malformed resource urn '{text}': {reason}")]
    MalformedUrn { text: String, reason: &'static str },

    // the asset type was used before a factory was installed
    #[error("Asset type {kind} has no factory installed")]
    NotConfigured { kind: AssetKind },

    // one delta in a chain could not be merged, the target data must be discarded
    #[error("Failed to apply delta '{input}' to {urn}: {reason}")]
    DeltaApplicationFailed { urn: ResourceUrn, input: String, reason: String },

    // recoverable by re-resolving the urn through the asset manager
    #[error("Asset {urn} has already been disposed")]
    AlreadyDisposed { urn: ResourceUrn },

    #[error("No asset type is registered for {kind}")]
    AssetTypeNotRegistered { kind: AssetKind },

    #[error("An asset type is already registered for {kind}")]
    DuplicateAssetKind { kind: AssetKind },
}
impl AssetError
{
    pub(crate) fn malformed(text: &str, reason: &'static str) -> Self
    {
        Self::MalformedUrn { text: text.to_string(), reason }
    }
}
