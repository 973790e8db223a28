use gestalt::*;
use parking_lot::Mutex;
use std::sync::{Arc, Once};

static INIT_LOGGING: Once = Once::new();

fn setup()
{
    INIT_LOGGING.call_once(|| { gestalt::init_logging(); });
}

fn urn(s: &str) -> ResourceUrn { ResourceUrn::parse(s).unwrap() }

fn test_config() -> AssetsConfig
{
    AssetsConfig { enable_notifications: true, dispose_on_drop: true }
}

const DOCUMENT: AssetKind = AssetKind::new("document");

struct Book
{
    lines: Vec<String>,
}
impl Asset for Book
{
    type Data = Vec<String>;
    fn asset_kind() -> AssetKind { AssetKind::new("book") }
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
    fn asset_kind() -> AssetKind { AssetKind::new("text") }
    fn supertypes() -> &'static [AssetKind] { &[DOCUMENT] }
    fn reload(&mut self, data: String) { self.value = data; }
}

struct BookLines;
impl FragmentProducer for BookLines
{
    type Root = Book;
    type Fragment = Text;

    fn derive_fragment(&self, root: &Book, fragment_name: &Name, fragment_context: Option<&Name>) -> Option<String>
    {
        let line = root.lines.get(fragment_name.as_str().parse::<usize>().ok()?)?;
        match fragment_context.map(Name::as_str)
        {
            None => Some(line.clone()),
            Some("upper") => Some(line.to_uppercase()),
            Some(_) => None,
        }
    }
}

fn library(config: AssetsConfig) -> AssetManager
{
    let manager = AssetManager::new(config);
    manager.register_asset_type::<Book>().unwrap()
        .set_factory(|_: &ResourceUrn, lines: Vec<String>| Book { lines });
    manager.register_asset_type::<Text>().unwrap()
        .set_factory(|_: &ResourceUrn, value: String| Text { value });
    manager.register_fragment_producer::<Text, _>(BookLines);
    manager
}

fn load_book(manager: &AssetManager, u: &str, lines: &[&str]) -> Ash<Book>
{
    manager.load_asset::<Book>(urn(u), lines.iter().map(|l| l.to_string()).collect()).unwrap()
}

fn line(manager: &AssetManager, u: &str) -> Option<String>
{
    manager.get_asset::<Text>(&urn(u)).unwrap().and_then(|t| t.with(|text| text.value.clone()).ok())
}
