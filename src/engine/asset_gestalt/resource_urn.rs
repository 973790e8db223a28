use crate::{AssetError, Name};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

pub const URN_MODULE_SEPARATOR: char = ':';
pub const URN_FRAGMENT_SEPARATOR: char = ':';
pub const URN_CONTEXT_SEPARATOR: char = '#';

// Identifies a resource, in the form `module:assetName[:fragmentName[#context]]`
// All parts are case-insensitive. Ordering is (module, asset name, fragment name, context), absent parts first
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceUrn
{
    module: Name,
    asset_name: Name,
    fragment_name: Option<Name>,
    fragment_context: Option<Name>,
}
impl ResourceUrn
{
    // A root urn from its parts
    pub fn new(module: &str, asset_name: &str) -> Result<Self, AssetError>
    {
        let text = format!("{module}{URN_MODULE_SEPARATOR}{asset_name}");
        check_token(&text, module, "empty module", "invalid character in module")?;
        check_token(&text, asset_name, "empty asset name", "invalid character in asset name")?;
        Ok(Self
        {
            module: Name::new(module),
            asset_name: Name::new(asset_name),
            fragment_name: None,
            fragment_context: None,
        })
    }

    pub fn parse(text: &str) -> Result<Self, AssetError>
    {
        let Some((module, rest)) = text.split_once(URN_MODULE_SEPARATOR) else
        {
            return Err(AssetError::malformed(text, "missing module separator"));
        };

        let (asset_name, fragment) = match rest.split_once(URN_FRAGMENT_SEPARATOR)
        {
            None => (rest, None),
            Some((asset_name, fragment)) => (asset_name, Some(fragment)),
        };

        let (fragment_name, fragment_context) = match fragment
        {
            None if asset_name.contains(URN_CONTEXT_SEPARATOR) =>
            {
                return Err(AssetError::malformed(text, "fragment context without a fragment name"));
            }
            None => (None, None),
            Some(fragment) => match fragment.split_once(URN_CONTEXT_SEPARATOR)
            {
                None => (Some(fragment), None),
                Some((name, context)) => (Some(name), Some(context)),
            },
        };

        check_token(text, module, "empty module", "invalid character in module")?;
        check_token(text, asset_name, "empty asset name", "invalid character in asset name")?;
        if let Some(fragment_name) = fragment_name
        {
            check_token(text, fragment_name, "empty fragment name", "invalid character in fragment name")?;
        }
        if let Some(context) = fragment_context
        {
            check_context(text, context)?;
        }

        Ok(Self
        {
            module: Name::new(module),
            asset_name: Name::new(asset_name),
            fragment_name: fragment_name.map(Name::new),
            fragment_context: fragment_context.map(Name::new),
        })
    }

    // Derive a fragment urn sharing this urn's module and asset name
    pub fn with_fragment(&self, fragment_name: &str, context: Option<&str>) -> Result<Self, AssetError>
    {
        let text = match context
        {
            None => format!("{}{URN_FRAGMENT_SEPARATOR}{fragment_name}", self.root_urn()),
            Some(c) => format!("{}{URN_FRAGMENT_SEPARATOR}{fragment_name}{URN_CONTEXT_SEPARATOR}{c}", self.root_urn()),
        };
        check_token(&text, fragment_name, "empty fragment name", "invalid character in fragment name")?;
        if let Some(context) = context
        {
            check_context(&text, context)?;
        }

        Ok(Self
        {
            module: self.module.clone(),
            asset_name: self.asset_name.clone(),
            fragment_name: Some(Name::new(fragment_name)),
            fragment_context: context.map(Name::new),
        })
    }

    // This urn with any fragment parts removed
    #[must_use]
    pub fn root_urn(&self) -> Self
    {
        Self
        {
            module: self.module.clone(),
            asset_name: self.asset_name.clone(),
            fragment_name: None,
            fragment_context: None,
        }
    }

    #[inline] #[must_use]
    pub fn module(&self) -> &Name { &self.module }

    #[inline] #[must_use]
    pub fn asset_name(&self) -> &Name { &self.asset_name }

    #[inline] #[must_use]
    pub fn fragment_name(&self) -> Option<&Name> { self.fragment_name.as_ref() }

    #[inline] #[must_use]
    pub fn fragment_context(&self) -> Option<&Name> { self.fragment_context.as_ref() }

    #[inline] #[must_use]
    pub fn is_fragment(&self) -> bool { self.fragment_name.is_some() }
}

fn check_token(text: &str, token: &str, empty_reason: &'static str, invalid_reason: &'static str) -> Result<(), AssetError>
{
    if token.is_empty()
    {
        return Err(AssetError::malformed(text, empty_reason));
    }
    if token.chars().any(|c| c == URN_MODULE_SEPARATOR || c == URN_CONTEXT_SEPARATOR || c.is_whitespace())
    {
        return Err(AssetError::malformed(text, invalid_reason));
    }
    Ok(())
}

// contexts are free-form, only emptiness is rejected
fn check_context(text: &str, context: &str) -> Result<(), AssetError>
{
    match context.is_empty()
    {
        true => Err(AssetError::malformed(text, "empty fragment context")),
        false => Ok(()),
    }
}

impl Display for ResourceUrn
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{}{URN_MODULE_SEPARATOR}{}", self.module, self.asset_name)?;
        if let Some(fragment_name) = &self.fragment_name
        {
            write!(f, "{URN_FRAGMENT_SEPARATOR}{fragment_name}")?;
            if let Some(context) = &self.fragment_context
            {
                write!(f, "{URN_CONTEXT_SEPARATOR}{context}")?;
            }
        }
        Ok(())
    }
}
impl Debug for ResourceUrn
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Display::fmt(self, f) }
}
impl FromStr for ResourceUrn
{
    type Err = AssetError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}
impl TryFrom<&str> for ResourceUrn
{
    type Error = AssetError;
    fn try_from(value: &str) -> Result<Self, Self::Error> { Self::parse(value) }
}
// serialized as its string form so it can live in TOML files
impl Serialize for ResourceUrn
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>
    {
        self.to_string().serialize(serializer)
    }
}
impl<'de> Deserialize<'de> for ResourceUrn
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>
    {
        let inp = String::deserialize(deserializer)?;
        Self::parse(&inp).map_err(D::Error::custom)
    }
}
