use crate::{Ash, ResourceUrn};
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use unicase::UniCase;

// Names a kind of asset, e.g. "texture". Case-insensitive
#[derive(Clone, Copy)]
pub struct AssetKind(&'static str);
impl AssetKind
{
    #[inline] #[must_use]
    pub const fn new(name: &'static str) -> Self { Self(name) }

    #[inline] #[must_use]
    pub const fn name(&self) -> &'static str { self.0 }
}
impl PartialEq for AssetKind
{
    fn eq(&self, other: &Self) -> bool { UniCase::unicode(self.0) == UniCase::unicode(other.0) }
}
impl Eq for AssetKind { }
impl Hash for AssetKind
{
    fn hash<H: Hasher>(&self, state: &mut H) { UniCase::unicode(self.0).hash(state) }
}
impl Display for AssetKind
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.0) }
}
impl Debug for AssetKind
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_fmt(format_args!("AssetKind({})", self.0)) }
}

pub trait Asset: Sync + Send + Sized + 'static
{
    // Everything needed to build (or rebuild) this asset
    type Data: Send + Sync + 'static;

    fn asset_kind() -> AssetKind;

    // Broader kinds this asset can also be looked up by
    fn supertypes() -> &'static [AssetKind] { &[] }

    // Replace this asset's contents in place. Identity (and handles) are preserved
    fn reload(&mut self, data: Self::Data);
}

// Builds assets of one kind from their data
pub trait AssetFactory<A: Asset>: Send + Sync
{
    fn build(&self, urn: &ResourceUrn, data: A::Data) -> A;
}
impl<A: Asset, F> AssetFactory<A> for F
    where F: Fn(&ResourceUrn, A::Data) -> A + Send + Sync
{
    #[inline]
    fn build(&self, urn: &ResourceUrn, data: A::Data) -> A { self(urn, data) }
}

/// Something that created an asset and must release its own resources when the asset goes away.
///
/// Called exactly once per owned asset, synchronously, after the asset is disposed. The asset's data is
/// already gone at that point (reads fail with `AlreadyDisposed`). Implementations must not call back
/// into the asset type that held the asset.
pub trait AssetOwner<A: Asset>: Send + Sync
{
    fn on_owned_asset_disposed(&self, asset: &Ash<A>);
}
