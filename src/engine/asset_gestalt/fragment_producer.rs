use crate::{Asset, AssetManager, Name, ResourceUrn};

/// Produces the data for a fragment asset (`module:asset:fragment[#context]`) on request.
///
/// Producers do not cache anything; the asset type of the fragment's kind caches the asset built from the
/// returned data. Returning `None` means the fragment does not exist, which is not an error.
pub trait FragmentDataProducer<F: Asset>: Send + Sync
{
    fn get_asset_data(&self, manager: &AssetManager, urn: &ResourceUrn) -> Option<F::Data>;
}

/// Derives fragments from the already loaded data of a root asset.
///
/// The root is resolved through the asset manager; if it is not loaded, the fragment is absent. Derivation
/// must be pure with respect to the root's data so that deriving the same fragment twice yields equal data.
/// Reloading the root does not touch fragments derived earlier, they must be re-derived
/// (see [`AssetManager::derive_fragment`]).
pub trait FragmentProducer: Send + Sync
{
    type Root: Asset;
    type Fragment: Asset;

    fn derive_fragment(
        &self,
        root: &Self::Root,
        fragment_name: &Name,
        fragment_context: Option<&Name>) -> Option<<Self::Fragment as Asset>::Data>;
}
impl<P: FragmentProducer> FragmentDataProducer<P::Fragment> for P
{
    fn get_asset_data(&self, manager: &AssetManager, urn: &ResourceUrn) -> Option<<P::Fragment as Asset>::Data>
    {
        let fragment_name = urn.fragment_name()?;
        let root = match manager.get_asset::<P::Root>(&urn.root_urn())
        {
            Ok(root) => root?,
            Err(err) =>
            {
                log::warn!("Cannot derive {urn}: {err}");
                return None;
            }
        };

        // a root disposed between lookup and read counts as absent
        let root_payload = root.read().ok()?;
        self.derive_fragment(&root_payload, fragment_name, urn.fragment_context())
    }
}
