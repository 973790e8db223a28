use crate::utils::ShortTypeName;
use crate::{Asset, AssetError, AssetOwner, AssetType, ResourceUrn};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub(crate) struct AssetHandleInner<A: Asset>
{
    urn: ResourceUrn,
    payload: RwLock<Option<A>>, // None once disposed
    disposed: AtomicBool,

    // neither of these keep their target alive
    asset_type: Weak<AssetType<A>>,
    owner: Option<Weak<dyn AssetOwner<A>>>,
}

// A more convenient alias for AssetHandle<A>
pub type Ash<A> = AssetHandle<A>;

// A live (or disposed) asset. Cheap to clone.
// Handles do not keep an asset registered, the asset type's cache does. Re-resolve through the
// asset type/manager rather than holding on to a handle across reloads of its urn
pub struct AssetHandle<A: Asset>
{
    inner: Arc<AssetHandleInner<A>>,
}
impl<A: Asset> AssetHandle<A>
{
    pub(crate) fn new(
        urn: ResourceUrn,
        payload: A,
        asset_type: Weak<AssetType<A>>,
        owner: Option<Weak<dyn AssetOwner<A>>>) -> Self
    {
        Self
        {
            inner: Arc::new(AssetHandleInner
            {
                urn,
                payload: RwLock::new(Some(payload)),
                disposed: AtomicBool::new(false),
                asset_type,
                owner,
            }),
        }
    }

    // The urn uniquely identifying this asset, fixed for its lifetime
    #[inline] #[must_use]
    pub fn urn(&self) -> &ResourceUrn { &self.inner.urn }

    #[inline] #[must_use]
    pub fn is_disposed(&self) -> bool
    {
        self.inner.disposed.load(Ordering::Acquire)
    }

    // Read the current payload. Do not hold the guard longer than necessary, it blocks reloads
    pub fn read(&self) -> Result<MappedRwLockReadGuard<'_, A>, AssetError>
    {
        let guard = self.inner.payload.read();
        RwLockReadGuard::try_map(guard, |p| p.as_ref())
            .map_err(|_| AssetError::AlreadyDisposed { urn: self.urn().clone() })
    }

    // Run a function against the current payload
    pub fn with<R>(&self, f: impl FnOnce(&A) -> R) -> Result<R, AssetError>
    {
        self.read().map(|a| f(&a))
    }

    // Replace this asset's data in place. All handles to this asset observe the new data
    pub fn reload(&self, data: A::Data) -> Result<(), AssetError>
    {
        {
            let mut payload = self.inner.payload.write();
            match payload.as_mut()
            {
                None => return Err(AssetError::AlreadyDisposed { urn: self.urn().clone() }),
                Some(asset) => asset.reload(data),
            }
        }

        log::debug!("{self:#?} reloaded");
        if let Some(asset_type) = self.inner.asset_type.upgrade()
        {
            asset_type.notify_reloaded(self.urn());
        }
        Ok(())
    }

    // Dispose this asset and remove it from its asset type. Only the first call has any effect
    pub fn dispose(&self)
    {
        // owners may dispose again from their callback, which runs under the asset type's lock
        if self.is_disposed() { return; }

        match self.inner.asset_type.upgrade()
        {
            Some(asset_type) => asset_type.dispose_handle(self),
            None => { self.dispose_detached(); },
        }
    }

    // Dispose without touching the owning asset type, which is responsible for the cache entry.
    // Returns false if this was already disposed
    pub(crate) fn dispose_detached(&self) -> bool
    {
        let payload =
        {
            // flag and payload change together so readers never see a disposed asset with data
            let mut locked = self.inner.payload.write();
            if self.inner.disposed.swap(true, Ordering::AcqRel)
            {
                return false;
            }
            locked.take()
        };
        drop(payload); // outside of the lock

        log::debug!("{self:#?} disposed");

        if let Some(owner) = self.inner.owner.as_ref().and_then(Weak::upgrade)
        {
            owner.on_owned_asset_disposed(self);
        }
        true
    }

    // Do both handles point to the same asset instance
    #[inline] #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool
    {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
impl<A: Asset> Clone for AssetHandle<A>
{
    fn clone(&self) -> Self
    {
        Self { inner: self.inner.clone() }
    }
}
impl<A: Asset> PartialEq for AssetHandle<A>
{
    fn eq(&self, other: &Self) -> bool { self.ptr_eq(other) }
}
impl<A: Asset> Eq for AssetHandle<A> { }
impl<A: Asset> PartialEq<ResourceUrn> for AssetHandle<A>
{
    fn eq(&self, urn: &ResourceUrn) -> bool { self.urn() == urn }
}
impl<A: Asset> Debug for AssetHandle<A>
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        match f.alternate()
        {
            true => f.write_fmt(format_args!("{}:{:?}", A::short_type_name(), self.urn())),
            false => Debug::fmt(self.urn(), f),
        }
    }
}
