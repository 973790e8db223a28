use crate::utils::ShortTypeName;
use crate::{Ash, Asset, AssetError, AssetInput, AssetKind, AssetOwner, AssetType, FragmentDataProducer, ResourceUrn, UntypedAssetType};
use crossbeam::channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetNotification
{
    Loaded(AssetKind, ResourceUrn),
    Reloaded(AssetKind, ResourceUrn), // reloaded in place
    Disposed(AssetKind, ResourceUrn),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig
{
    // send lifecycle notifications to subscribers. Unread notifications queue up, only enable if something listens
    pub enable_notifications: bool,
    // dispose all live assets when the manager is dropped
    pub dispose_on_drop: bool,
}
impl Default for AssetsConfig
{
    fn default() -> Self
    {
        Self
        {
            enable_notifications: false,
            dispose_on_drop: true,
        }
    }
}
impl AssetsConfig
{
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error>
    {
        toml::from_str(text)
    }

    #[cfg(test)]
    pub fn test() -> Self
    {
        Self { enable_notifications: true, dispose_on_drop: true }
    }
}

struct RegisteredAssetType
{
    untyped: Arc<dyn UntypedAssetType>,
    typed: Arc<dyn Any + Send + Sync>, // Arc<AssetType<A>>
}

// each entry is an Arc<dyn FragmentDataProducer<F>> for the kind it is filed under
type FragmentProducerList = Vec<Arc<dyn Any + Send + Sync>>;

/// Routes asset requests to the asset type registered for each kind, deriving fragments on demand.
///
/// This is the one place kind → asset type lookups happen. It is explicitly constructed and passed
/// to whatever needs cross-kind access (fragment producers receive it on every call).
pub struct AssetManager
{
    asset_types: RwLock<IndexMap<AssetKind, RegisteredAssetType>>,
    fragment_producers: RwLock<IndexMap<AssetKind, FragmentProducerList>>,
    notification_channel: (Sender<AssetNotification>, Receiver<AssetNotification>),
    config: AssetsConfig,
}
impl AssetManager
{
    #[must_use]
    pub fn new(config: AssetsConfig) -> Self
    {
        Self
        {
            asset_types: RwLock::new(IndexMap::new()),
            fragment_producers: RwLock::new(IndexMap::new()),
            notification_channel: unbounded(),
            config,
        }
    }

    #[inline] #[must_use]
    pub fn config(&self) -> &AssetsConfig { &self.config }

    // Create the asset type for A. Each kind may only be registered once
    pub fn register_asset_type<A: Asset>(&self) -> Result<Arc<AssetType<A>>, AssetError>
    {
        let kind = A::asset_kind();
        let mut asset_types = self.asset_types.write();
        if asset_types.contains_key(&kind)
        {
            return Err(AssetError::DuplicateAssetKind { kind });
        }

        let notifier = self.config.enable_notifications.then(|| self.notification_channel.0.clone());
        let asset_type = AssetType::<A>::with_notifier(notifier);
        asset_types.insert(kind, RegisteredAssetType
        {
            untyped: asset_type.clone(),
            typed: asset_type.clone(),
        });

        log::debug!("Registered asset type {} for kind '{kind}'", A::short_type_name());
        Ok(asset_type)
    }

    #[must_use]
    pub fn get_asset_type<A: Asset>(&self) -> Option<Arc<AssetType<A>>>
    {
        let asset_types = self.asset_types.read();
        let registered = asset_types.get(&A::asset_kind())?;
        registered.typed.clone().downcast::<AssetType<A>>().ok()
    }

    #[must_use]
    pub fn get_asset_type_untyped(&self, kind: AssetKind) -> Option<Arc<dyn UntypedAssetType>>
    {
        self.asset_types.read().get(&kind).map(|r| r.untyped.clone())
    }

    // Every asset type of kind, or listing kind as a supertype, in registration order
    #[must_use]
    pub fn get_asset_types(&self, kind: AssetKind) -> Vec<Arc<dyn UntypedAssetType>>
    {
        self.asset_types.read().values()
            .filter(|r| r.untyped.is_kind(kind))
            .map(|r| r.untyped.clone())
            .collect()
    }

    // All registered kinds, in registration order
    #[must_use]
    pub fn asset_kinds(&self) -> Vec<AssetKind>
    {
        self.asset_types.read().keys().copied().collect()
    }

    fn require_asset_type<A: Asset>(&self) -> Result<Arc<AssetType<A>>, AssetError>
    {
        self.get_asset_type::<A>().ok_or(AssetError::AssetTypeNotRegistered { kind: A::asset_kind() })
    }

    // Producers are consulted in registration order, the first to return data wins
    pub fn register_fragment_producer<F: Asset, P: FragmentDataProducer<F> + 'static>(&self, producer: P)
    {
        let producer: Arc<dyn FragmentDataProducer<F>> = Arc::new(producer);
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(producer);
        self.fragment_producers.write().entry(F::asset_kind()).or_default().push(erased);
        log::debug!("Registered {} fragment producer {}", F::asset_kind(), P::short_type_name());
    }

    fn fragment_producers<F: Asset>(&self) -> Vec<Arc<dyn FragmentDataProducer<F>>>
    {
        let producers = self.fragment_producers.read();
        match producers.get(&F::asset_kind())
        {
            None => Vec::new(),
            Some(list) => list.iter()
                .filter_map(|p| p.downcast_ref::<Arc<dyn FragmentDataProducer<F>>>().cloned())
                .collect(),
        }
    }

    /// Get the live asset for `urn`.
    ///
    /// Root urns are only looked up, never loaded. A fragment urn that is not already cached is derived by
    /// the fragment producers registered for `A`'s kind and loaded into `A`'s asset type. `Ok(None)`
    /// means the asset (or fragment) does not exist.
    pub fn get_asset<A: Asset>(&self, urn: &ResourceUrn) -> Result<Option<Ash<A>>, AssetError>
    {
        let asset_type = self.require_asset_type::<A>()?;
        if let Some(cached) = asset_type.get_asset(urn)
        {
            return Ok(Some(cached));
        }
        if !urn.is_fragment()
        {
            return Ok(None);
        }
        self.produce_fragment(&asset_type, urn, false)
    }

    // Derive a fragment again from its root's current data, replacing any cached fragment asset.
    // A fragment that no longer exists in its root is disposed
    pub fn derive_fragment<A: Asset>(&self, urn: &ResourceUrn) -> Result<Option<Ash<A>>, AssetError>
    {
        let asset_type = self.require_asset_type::<A>()?;
        if !urn.is_fragment()
        {
            return Ok(asset_type.get_asset(urn));
        }

        let produced = self.produce_fragment(&asset_type, urn, true)?;
        if produced.is_none() && asset_type.dispose_asset(urn)
        {
            log::debug!("Disposed stale fragment {urn}");
        }
        Ok(produced)
    }

    fn produce_fragment<A: Asset>(
        &self,
        asset_type: &Arc<AssetType<A>>,
        urn: &ResourceUrn,
        replace: bool) -> Result<Option<Ash<A>>, AssetError>
    {
        // no manager locks are held here, producers call back in to resolve roots
        for producer in self.fragment_producers::<A>()
        {
            if let Some(data) = producer.get_asset_data(self, urn)
            {
                let loaded = match replace
                {
                    true => asset_type.load_asset(urn.clone(), data),
                    // another caller may have derived the same fragment in the meantime
                    false => asset_type.load_asset_if_absent(urn.clone(), data),
                };
                return loaded.map(Some);
            }
        }
        Ok(None)
    }

    pub fn load_asset<A: Asset>(&self, urn: ResourceUrn, data: A::Data) -> Result<Ash<A>, AssetError>
    {
        self.require_asset_type::<A>()?.load_asset(urn, data)
    }

    pub fn load_owned_asset<A: Asset, O: AssetOwner<A> + 'static>(
        &self,
        urn: ResourceUrn,
        data: A::Data,
        owner: &Arc<O>) -> Result<Ash<A>, AssetError>
    {
        self.require_asset_type::<A>()?.load_owned_asset(urn, data, owner)
    }

    pub fn load_asset_with_deltas<A: Asset>(
        &self,
        urn: ResourceUrn,
        data: A::Data,
        deltas: &[AssetInput]) -> Result<Ash<A>, AssetError>
    {
        self.require_asset_type::<A>()?.load_asset_with_deltas(urn, data, deltas)
    }

    // Dispose every asset of every type, returns how many were disposed
    pub fn dispose_all(&self) -> usize
    {
        let asset_types: Vec<_> = self.asset_types.read().values().map(|r| r.untyped.clone()).collect();
        asset_types.iter().map(|t| t.dispose_all()).sum()
    }

    // Notifications are only sent if enabled in the config. All subscribers share one queue
    pub fn subscribe_to_notifications(&self) -> Receiver<AssetNotification>
    {
        self.notification_channel.1.clone()
    }
}
impl Drop for AssetManager
{
    fn drop(&mut self)
    {
        if !self.config.dispose_on_drop { return; }

        let disposed = self.dispose_all();
        if disposed > 0
        {
            log::debug!("Disposed {disposed} live asset(s) on shutdown");
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{AssetFactory, FragmentProducer, Name, TomlDeltaFormat};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BOOK: AssetKind = AssetKind::new("book");
    const TEXT: AssetKind = AssetKind::new("text");
    const DOCUMENT: AssetKind = AssetKind::new("document");

    struct Book
    {
        lines: Vec<String>,
    }
    impl Asset for Book
    {
        type Data = Vec<String>;
        fn asset_kind() -> AssetKind { BOOK }
        fn supertypes() -> &'static [AssetKind] { &[DOCUMENT] }
        fn reload(&mut self, data: Vec<String>) { self.lines = data; }
    }

    struct Text
    {
        value: String,
    }
    impl Asset for Text
    {
        type Data = String;
        fn asset_kind() -> AssetKind { TEXT }
        fn supertypes() -> &'static [AssetKind] { &[DOCUMENT] }
        fn reload(&mut self, data: String) { self.value = data; }
    }

    struct Settings
    {
        table: toml::Table,
    }
    impl Asset for Settings
    {
        type Data = toml::Table;
        fn asset_kind() -> AssetKind { AssetKind::new("settings") }
        fn reload(&mut self, data: toml::Table) { self.table = data; }
    }

    struct BookFactory;
    impl AssetFactory<Book> for BookFactory
    {
        fn build(&self, _urn: &ResourceUrn, lines: Vec<String>) -> Book { Book { lines } }
    }

    // fragments are line indices
    #[derive(Default)]
    struct BookLineProducer
    {
        calls: AtomicUsize,
    }
    impl FragmentProducer for BookLineProducer
    {
        type Root = Book;
        type Fragment = Text;

        fn derive_fragment(&self, root: &Book, fragment_name: &Name, _context: Option<&Name>) -> Option<String>
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index: usize = fragment_name.as_str().parse().ok()?;
            root.lines.get(index).cloned()
        }
    }

    fn urn(s: &str) -> ResourceUrn { ResourceUrn::parse(s).unwrap() }

    fn lines(l: &[&str]) -> Vec<String> { l.iter().map(|s| s.to_string()).collect() }

    fn manager() -> AssetManager
    {
        let manager = AssetManager::new(AssetsConfig::test());
        manager.register_asset_type::<Book>().unwrap().set_factory(BookFactory);
        manager.register_asset_type::<Text>().unwrap()
            .set_factory(|_: &ResourceUrn, value: String| Text { value });
        manager.register_fragment_producer::<Text, _>(BookLineProducer::default());
        manager
    }

    fn text(manager: &AssetManager, u: &str) -> Option<String>
    {
        manager.get_asset::<Text>(&urn(u)).unwrap().and_then(|t| t.with(|text| text.value.clone()).ok())
    }

    mod registry
    {
        use super::*;

        #[test]
        fn duplicate_kind()
        {
            let manager = manager();
            assert!(matches!(manager.register_asset_type::<Book>(), Err(AssetError::DuplicateAssetKind { kind }) if kind == BOOK));
        }

        #[test]
        fn typed_lookup()
        {
            let manager = manager();
            assert!(manager.get_asset_type::<Book>().is_some());
            assert!(manager.get_asset_type::<Settings>().is_none());
            assert_eq!(vec![BOOK, TEXT], manager.asset_kinds());
        }

        #[test]
        fn untyped_lookup()
        {
            let manager = manager();
            assert_eq!("Book", manager.get_asset_type_untyped(AssetKind::new("BOOK")).unwrap().type_name());
            assert!(manager.get_asset_type_untyped(DOCUMENT).is_none());
        }

        #[test]
        fn supertype_lookup()
        {
            let manager = manager();
            let documents: Vec<_> = manager.get_asset_types(DOCUMENT).iter().map(|t| t.kind()).collect();
            assert_eq!(vec![BOOK, TEXT], documents);

            let texts: Vec<_> = manager.get_asset_types(TEXT).iter().map(|t| t.kind()).collect();
            assert_eq!(vec![TEXT], texts);
            assert!(manager.get_asset_types(AssetKind::new("audio")).is_empty());
        }

        #[test]
        fn unregistered()
        {
            let manager = manager();
            assert!(matches!(manager.get_asset::<Settings>(&urn("engine:s")), Err(AssetError::AssetTypeNotRegistered { .. })));
            assert!(matches!(manager.load_asset::<Settings>(urn("engine:s"), toml::Table::new()), Err(AssetError::AssetTypeNotRegistered { .. })));
        }
    }

    mod fragments
    {
        use super::*;

        #[test]
        fn lines_of_a_book()
        {
            let manager = manager();
            manager.load_asset::<Book>(urn("book:1"), lines(&["hello", "world"])).unwrap();

            assert_eq!(Some("hello".to_string()), text(&manager, "book:1:0"));
            assert_eq!(Some("world".to_string()), text(&manager, "book:1:1"));
            assert_eq!(None, text(&manager, "book:1:2"));
            assert_eq!(None, text(&manager, "book:1:first"));
        }

        #[test]
        fn missing_root()
        {
            let manager = manager();
            assert_eq!(None, text(&manager, "book:2:0"));
            assert!(!manager.get_asset_type::<Book>().unwrap().is_loaded(&urn("book:2")));
        }

        #[test]
        fn root_urn_is_not_derived()
        {
            let manager = manager();
            manager.load_asset::<Book>(urn("book:1"), lines(&["hello"])).unwrap();
            assert!(manager.get_asset::<Text>(&urn("book:1")).unwrap().is_none());
        }

        #[test]
        fn derived_fragment_is_cached()
        {
            let manager = manager();
            manager.load_asset::<Book>(urn("book:1"), lines(&["hello"])).unwrap();

            let first = manager.get_asset::<Text>(&urn("book:1:0")).unwrap().unwrap();
            let second = manager.get_asset::<Text>(&urn("book:1:0")).unwrap().unwrap();
            assert!(first.ptr_eq(&second));
            assert!(manager.get_asset_type::<Text>().unwrap().is_loaded(&urn("book:1:0")));
        }

        #[test]
        fn derivation_is_idempotent()
        {
            let manager = manager();
            manager.load_asset::<Book>(urn("book:1"), lines(&["hello", "world"])).unwrap();
            let producer = BookLineProducer::default();

            let a = producer.get_asset_data(&manager, &urn("book:1:1"));
            let b = producer.get_asset_data(&manager, &urn("book:1:1"));
            assert_eq!(Some("world".to_string()), a);
            assert_eq!(a, b);
            assert_eq!(2, producer.calls.load(Ordering::SeqCst));
        }

        #[test]
        fn stale_until_rederived()
        {
            let manager = manager();
            let book = manager.load_asset::<Book>(urn("book:1"), lines(&["hello", "world"])).unwrap();
            let line = manager.get_asset::<Text>(&urn("book:1:1")).unwrap().unwrap();

            book.reload(lines(&["goodbye", "moon"])).unwrap();
            assert_eq!(Some("world".to_string()), text(&manager, "book:1:1"));

            let rederived = manager.derive_fragment::<Text>(&urn("book:1:1")).unwrap().unwrap();
            assert_eq!("moon", rederived.read().unwrap().value);
            assert!(line.is_disposed());

            book.reload(lines(&["only"])).unwrap();
            assert!(manager.derive_fragment::<Text>(&urn("book:1:1")).unwrap().is_none());
            assert!(rederived.is_disposed());
            assert_eq!(None, text(&manager, "book:1:1"));
        }

        #[test]
        fn first_producer_wins()
        {
            struct Fallback;
            impl FragmentDataProducer<Text> for Fallback
            {
                fn get_asset_data(&self, _manager: &AssetManager, urn: &ResourceUrn) -> Option<String>
                {
                    Some(format!("fallback for {urn}"))
                }
            }

            let manager = manager();
            manager.register_fragment_producer::<Text, _>(Fallback);
            manager.load_asset::<Book>(urn("book:1"), lines(&["hello"])).unwrap();

            assert_eq!(Some("hello".to_string()), text(&manager, "book:1:0"));
            assert_eq!(Some("fallback for book:1:9".to_string()), text(&manager, "book:1:9"));
        }

        #[test]
        fn unconfigured_fragment_type()
        {
            let manager = AssetManager::new(AssetsConfig::test());
            manager.register_asset_type::<Book>().unwrap().set_factory(BookFactory);
            manager.register_asset_type::<Text>().unwrap();
            manager.register_fragment_producer::<Text, _>(BookLineProducer::default());
            manager.load_asset::<Book>(urn("book:1"), lines(&["hello"])).unwrap();

            assert!(matches!(manager.get_asset::<Text>(&urn("book:1:0")), Err(AssetError::NotConfigured { .. })));
        }
    }

    mod lifecycle
    {
        use super::*;

        #[test]
        fn notifications()
        {
            let manager = manager();
            let notifications = manager.subscribe_to_notifications();

            let book = manager.load_asset::<Book>(urn("book:1"), lines(&["a"])).unwrap();
            book.reload(lines(&["b"])).unwrap();
            manager.load_asset::<Book>(urn("book:1"), lines(&["c"])).unwrap();
            manager.get_asset_type::<Book>().unwrap().dispose_asset(&urn("book:1"));

            let received: Vec<_> = notifications.try_iter().collect();
            assert_eq!(vec![
                AssetNotification::Loaded(BOOK, urn("book:1")),
                AssetNotification::Reloaded(BOOK, urn("book:1")),
                AssetNotification::Disposed(BOOK, urn("book:1")),
                AssetNotification::Loaded(BOOK, urn("book:1")),
                AssetNotification::Disposed(BOOK, urn("book:1")),
            ], received);
        }

        #[test]
        fn notifications_disabled()
        {
            let manager = AssetManager::new(AssetsConfig::default());
            manager.register_asset_type::<Book>().unwrap().set_factory(BookFactory);
            let notifications = manager.subscribe_to_notifications();
            manager.load_asset::<Book>(urn("book:1"), lines(&["a"])).unwrap();
            assert!(notifications.try_recv().is_err());
        }

        #[test]
        fn dispose_all()
        {
            let manager = manager();
            let book = manager.load_asset::<Book>(urn("book:1"), lines(&["a", "b"])).unwrap();
            let line = manager.get_asset::<Text>(&urn("book:1:1")).unwrap().unwrap();

            assert_eq!(2, manager.dispose_all());
            assert!(book.is_disposed());
            assert!(line.is_disposed());
            assert_eq!(None, text(&manager, "book:1:0"));
        }

        #[test]
        fn drop_disposes()
        {
            let manager = manager();
            let book = manager.load_asset::<Book>(urn("book:1"), lines(&["a"])).unwrap();
            drop(manager);
            assert!(book.is_disposed());
        }

        #[test]
        fn drop_without_disposal()
        {
            let manager = AssetManager::new(AssetsConfig { dispose_on_drop: false, ..AssetsConfig::test() });
            manager.register_asset_type::<Book>().unwrap().set_factory(BookFactory);
            let book = manager.load_asset::<Book>(urn("book:1"), lines(&["a"])).unwrap();
            drop(manager);
            assert!(!book.is_disposed());
        }

        #[test]
        fn deltas_through_manager()
        {
            let manager = manager();
            let settings = manager.register_asset_type::<Settings>().unwrap();
            settings.set_factory(|_: &ResourceUrn, table: toml::Table| Settings { table });
            settings.add_delta_format(TomlDeltaFormat);

            let base: toml::Table = toml::from_str("volume = 1").unwrap();
            let deltas = [AssetInput::new("loud", "audio.delta.toml", "volume = 11".as_bytes())];
            let audio = manager.load_asset_with_deltas::<Settings>(urn("engine:audio"), base, &deltas).unwrap();
            assert_eq!(Some(11), audio.read().unwrap().table["volume"].as_integer());
        }
    }

    mod config
    {
        use super::*;

        #[test]
        fn defaults()
        {
            assert_eq!(AssetsConfig::default(), AssetsConfig::from_toml("").unwrap());
        }

        #[test]
        fn from_toml()
        {
            let config = AssetsConfig::from_toml("enable_notifications = true").unwrap();
            assert!(config.enable_notifications);
            assert!(config.dispose_on_drop);
            assert!(AssetsConfig::from_toml("dispose_on_drop = \"yes\"").is_err());
        }
    }
}
