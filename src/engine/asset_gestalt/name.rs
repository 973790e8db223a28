use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// A case-insensitive token. Compares, hashes and orders by its lower-case form but displays as written
#[derive(Clone)]
pub struct Name
{
    text: Arc<str>,
    canonical: Arc<str>,
}
impl Name
{
    #[must_use]
    pub fn new(text: &str) -> Self
    {
        let canonical: Arc<str> = match text.chars().any(char::is_uppercase)
        {
            true => Arc::from(text.to_lowercase()),
            false => Arc::from(text),
        };
        Self { text: Arc::from(text), canonical }
    }

    #[inline] #[must_use]
    pub fn as_str(&self) -> &str { &self.text }

    // The lower-case form used for comparisons
    #[inline] #[must_use]
    pub fn canonical(&self) -> &str { &self.canonical }

    #[inline] #[must_use]
    pub fn is_empty(&self) -> bool { self.text.is_empty() }
}
impl PartialEq for Name
{
    fn eq(&self, other: &Self) -> bool { self.canonical == other.canonical }
}
impl Eq for Name { }
impl PartialEq<str> for Name
{
    fn eq(&self, other: &str) -> bool { *self == Name::new(other) }
}
impl PartialEq<&str> for Name
{
    fn eq(&self, other: &&str) -> bool { *self == Name::new(other) }
}
impl Hash for Name
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.canonical.hash(state) }
}
impl PartialOrd for Name
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for Name
{
    fn cmp(&self, other: &Self) -> Ordering { self.canonical.cmp(&other.canonical) }
}
impl Display for Name
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(&self.text) }
}
impl Debug for Name
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(&*self.text, f) }
}
impl From<&str> for Name
{
    fn from(text: &str) -> Self { Self::new(text) }
}
impl AsRef<str> for Name
{
    fn as_ref(&self) -> &str { &self.text }
}
impl Serialize for Name
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        self.text.serialize(serializer)
    }
}
impl<'de> Deserialize<'de> for Name
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>
    {
        let inp = String::deserialize(deserializer)?;
        Ok(Self::new(&inp))
    }
}
