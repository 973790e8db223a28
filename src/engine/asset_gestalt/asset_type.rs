use crate::utils::ShortTypeName;
use crate::{Ash, Asset, AssetDeltaFormat, AssetDeltaFormats, AssetError, AssetFactory, AssetHandle, AssetInput, AssetKind, AssetNotification, AssetOwner, ResourceUrn};
use crossbeam::channel::Sender;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

type AssetHandleBank<A> = HashMap<ResourceUrn, Ash<A>>;

/// The registry for one kind of asset: owns the urn → live asset cache.
///
/// At most one live asset exists per urn. Loading over a live asset disposes the old one (notifying its
/// owner) before the new one takes its place. All loads and disposals for this type are serialized
/// by a single write lock; lookups only take the read lock and so never observe a half-built asset.
pub struct AssetType<A: Asset>
{
    factory: RwLock<Option<Arc<dyn AssetFactory<A>>>>,
    handles: RwLock<AssetHandleBank<A>>,
    delta_formats: RwLock<AssetDeltaFormats<A::Data>>,
    notifier: Option<Sender<AssetNotification>>,
}
impl<A: Asset> AssetType<A>
{
    #[must_use]
    pub fn new() -> Arc<Self>
    {
        Self::with_notifier(None)
    }

    #[must_use]
    pub(crate) fn with_notifier(notifier: Option<Sender<AssetNotification>>) -> Arc<Self>
    {
        Arc::new(Self
        {
            factory: RwLock::new(None),
            handles: RwLock::new(AssetHandleBank::new()),
            delta_formats: RwLock::new(AssetDeltaFormats::default()),
            notifier,
        })
    }

    #[inline] #[must_use]
    pub fn kind(&self) -> AssetKind { A::asset_kind() }

    // Install the factory used by all future loads. Already loaded assets are unaffected
    pub fn set_factory(&self, factory: impl AssetFactory<A> + 'static)
    {
        let mut locked = self.factory.write();
        if locked.is_some()
        {
            log::debug!("Replacing factory for {} assets", self.kind());
        }
        *locked = Some(Arc::new(factory));
    }

    #[must_use]
    pub fn has_factory(&self) -> bool
    {
        self.factory.read().is_some()
    }

    // Build an asset from data and cache it under urn, replacing (and disposing) any live asset already there
    pub fn load_asset(self: &Arc<Self>, urn: ResourceUrn, data: A::Data) -> Result<Ash<A>, AssetError>
    {
        self.insert(urn, data, None, true)
    }

    // Load unless a live asset is already cached under urn, in which case that asset is returned and data is dropped
    pub fn load_asset_if_absent(self: &Arc<Self>, urn: ResourceUrn, data: A::Data) -> Result<Ash<A>, AssetError>
    {
        self.insert(urn, data, None, false)
    }

    // As load_asset(), but owner is told when the new asset is disposed. The owner is not kept alive by the asset
    pub fn load_owned_asset<O: AssetOwner<A> + 'static>(
        self: &Arc<Self>,
        urn: ResourceUrn,
        data: A::Data,
        owner: &Arc<O>) -> Result<Ash<A>, AssetError>
    {
        let weak_owner = Arc::downgrade(owner) as Weak<dyn AssetOwner<A>>;
        self.insert(urn, data, Some(weak_owner), true)
    }

    // Apply deltas to data with this type's delta formats, then load it
    pub fn load_asset_with_deltas(
        self: &Arc<Self>,
        urn: ResourceUrn,
        mut data: A::Data,
        deltas: &[AssetInput]) -> Result<Ash<A>, AssetError>
    {
        self.apply_deltas(&urn, deltas, &mut data)?;
        self.load_asset(urn, data)
    }

    fn insert(
        self: &Arc<Self>,
        urn: ResourceUrn,
        data: A::Data,
        owner: Option<Weak<dyn AssetOwner<A>>>,
        replace: bool) -> Result<Ash<A>, AssetError>
    {
        let Some(factory) = self.factory.read().clone() else
        {
            return Err(AssetError::NotConfigured { kind: self.kind() });
        };

        // built while holding the lock so that concurrent loads of one urn can't leave two live assets
        let mut handle_bank = self.handles.write();

        if !replace
        {
            if let Some(live) = handle_bank.get(&urn).filter(|h| !h.is_disposed())
            {
                return Ok(live.clone());
            }
        }

        let asset = factory.build(&urn, data);
        let handle = AssetHandle::new(urn.clone(), asset, Arc::downgrade(self), owner);

        if let Some(previous) = handle_bank.remove(&urn)
        {
            if previous.dispose_detached()
            {
                self.notify(AssetNotification::Disposed(self.kind(), urn.clone()));
            }
            log::debug!("{handle:#?} replaced a previously loaded asset");
        }
        else
        {
            log::debug!("{handle:#?} loaded");
        }

        handle_bank.insert(urn.clone(), handle.clone());
        self.notify(AssetNotification::Loaded(self.kind(), urn));
        Ok(handle)
    }

    // The live asset for urn, if one is loaded. Never loads anything
    #[must_use]
    pub fn get_asset(&self, urn: &ResourceUrn) -> Option<Ash<A>>
    {
        let handle_bank = self.handles.read();
        handle_bank.get(urn).filter(|h| !h.is_disposed()).cloned()
    }

    #[must_use]
    pub fn is_loaded(&self, urn: &ResourceUrn) -> bool
    {
        self.get_asset(urn).is_some()
    }

    // All loaded urns, sorted
    #[must_use]
    pub fn loaded_urns(&self) -> Vec<ResourceUrn>
    {
        let mut urns: Vec<_> = self.handles.read().iter()
            .filter(|(_, h)| !h.is_disposed())
            .map(|(u, _)| u.clone())
            .collect();
        urns.sort();
        urns
    }

    #[must_use]
    pub fn loaded_count(&self) -> usize
    {
        self.handles.read().len()
    }

    // Find loaded root urns matching a partial name: either `assetName` (any module) or a full `module:assetName`
    #[must_use]
    pub fn resolve(&self, name: &str) -> Vec<ResourceUrn>
    {
        if name.contains(crate::URN_MODULE_SEPARATOR)
        {
            return match ResourceUrn::parse(name)
            {
                Ok(urn) if !urn.is_fragment() && self.is_loaded(&urn) => vec![urn],
                _ => Vec::new(),
            };
        }

        let mut urns: Vec<_> = self.handles.read().keys()
            .filter(|u| !u.is_fragment() && *u.asset_name() == *name)
            .cloned()
            .collect();
        urns.sort();
        urns
    }

    // Dispose the asset loaded for urn. Returns false if nothing was loaded
    pub fn dispose_asset(&self, urn: &ResourceUrn) -> bool
    {
        let mut handle_bank = self.handles.write();
        let Some(handle) = handle_bank.remove(urn) else { return false; };
        let disposed = handle.dispose_detached();
        if disposed
        {
            self.notify(AssetNotification::Disposed(self.kind(), urn.clone()));
        }
        disposed
    }

    // Called by handles disposing themselves
    pub(crate) fn dispose_handle(&self, handle: &Ash<A>)
    {
        let mut handle_bank = self.handles.write();

        // owner is notified before the entry is removed, both under the lock
        let disposed = handle.dispose_detached();

        let is_current = handle_bank.get(handle.urn()).is_some_and(|stored| stored.ptr_eq(handle));
        if is_current
        {
            handle_bank.remove(handle.urn());
        }
        else if disposed
        {
            log::warn!("Disposed {handle:#?} which was not registered to its asset type");
        }

        if disposed
        {
            self.notify(AssetNotification::Disposed(self.kind(), handle.urn().clone()));
        }
    }

    // Dispose every loaded asset, returns how many were disposed
    pub fn dispose_all(&self) -> usize
    {
        let mut handle_bank = self.handles.write();
        let mut count = 0;
        for (urn, handle) in handle_bank.drain()
        {
            if handle.dispose_detached()
            {
                count += 1;
                self.notify(AssetNotification::Disposed(self.kind(), urn));
            }
        }
        if count > 0
        {
            log::debug!("Disposed all {count} {} asset(s)", self.kind());
        }
        count
    }

    // Later registrations replace earlier ones for any shared extension
    pub fn add_delta_format(&self, format: impl AssetDeltaFormat<A::Data> + 'static)
    {
        self.delta_formats.write().add(Arc::new(format));
    }

    // Apply deltas in order using the registered formats (matched by file extension)
    pub fn apply_deltas(&self, urn: &ResourceUrn, deltas: &[AssetInput], data: &mut A::Data) -> Result<(), AssetError>
    {
        self.delta_formats.read().apply_deltas(urn, deltas, data)
    }

    // The base asset name for a delta filename, if one of this type's formats claims it
    #[must_use]
    pub fn delta_asset_name(&self, filename: &str) -> Option<crate::Name>
    {
        self.delta_formats.read().asset_name(filename)
    }

    pub(crate) fn notify_reloaded(&self, urn: &ResourceUrn)
    {
        self.notify(AssetNotification::Reloaded(self.kind(), urn.clone()));
    }

    fn notify(&self, notification: AssetNotification)
    {
        if let Some(notifier) = &self.notifier
        {
            let _ = notifier.send(notification); // only fails if nobody is listening
        }
    }
}

/// Type-erased access to an [`AssetType`], for code that only knows an [`AssetKind`].
pub trait UntypedAssetType: Send + Sync
{
    fn kind(&self) -> AssetKind;
    fn supertypes(&self) -> &'static [AssetKind];
    fn type_name(&self) -> &'static str;
    fn is_loaded(&self, urn: &ResourceUrn) -> bool;
    fn loaded_urns(&self) -> Vec<ResourceUrn>;
    fn dispose_asset(&self, urn: &ResourceUrn) -> bool;
    fn dispose_all(&self) -> usize;

    // Is this type (or one of its supertypes) of the given kind
    fn is_kind(&self, kind: AssetKind) -> bool
    {
        self.kind() == kind || self.supertypes().contains(&kind)
    }
}
impl<A: Asset> UntypedAssetType for AssetType<A>
{
    fn kind(&self) -> AssetKind { A::asset_kind() }
    fn supertypes(&self) -> &'static [AssetKind] { A::supertypes() }
    fn type_name(&self) -> &'static str { A::short_type_name() }
    fn is_loaded(&self, urn: &ResourceUrn) -> bool { AssetType::is_loaded(self, urn) }
    fn loaded_urns(&self) -> Vec<ResourceUrn> { AssetType::loaded_urns(self) }
    fn dispose_asset(&self, urn: &ResourceUrn) -> bool { AssetType::dispose_asset(self, urn) }
    fn dispose_all(&self) -> usize { AssetType::dispose_all(self) }
}
