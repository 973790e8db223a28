use crate::{AssetError, Name, ResourceUrn};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use unicase::UniCase;

pub type DeltaResult = Result<(), Box<dyn Error + Send + Sync>>;

// One raw input for an asset, supplied by whatever scans modules. The core never opens files
#[derive(Clone)]
pub struct AssetInput
{
    pub module: Name,
    pub filename: String,
    pub bytes: Arc<[u8]>,
}
impl AssetInput
{
    #[must_use]
    pub fn new(module: &str, filename: &str, bytes: impl Into<Arc<[u8]>>) -> Self
    {
        Self
        {
            module: Name::new(module),
            filename: filename.to_string(),
            bytes: bytes.into(),
        }
    }

    // The text after the last '.' in the filename
    #[must_use]
    pub fn extension(&self) -> Option<&str>
    {
        file_extension(&self.filename)
    }

    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error>
    {
        std::str::from_utf8(&self.bytes)
    }
}
impl Display for AssetInput
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        f.write_fmt(format_args!("{}:{}", self.module, self.filename))
    }
}
impl Debug for AssetInput
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result
    {
        f.write_fmt(format_args!("{} ({} bytes)", self, self.bytes.len()))
    }
}

fn file_extension(filename: &str) -> Option<&str>
{
    match filename.rfind('.')
    {
        Some(i) if i + 1 < filename.len() => Some(&filename[(i + 1)..]),
        _ => None,
    }
}

/// Applies override inputs ("deltas") from later modules onto an asset's data.
///
/// Deltas are applied strictly in the order given: lowest priority module first, so the highest priority
/// module's delta is applied last and wins any conflicting fields.
pub trait AssetDeltaFormat<D>: Send + Sync
{
    // The file extensions this format handles
    fn file_extensions(&self) -> &[UniCase<&'static str>];

    // The name of the asset a delta file applies to, or None if this is not a delta file of this format
    fn asset_name(&self, filename: &str) -> Option<Name>;

    // Merge a single delta into the data
    fn apply_delta(&self, input: &AssetInput, data: &mut D) -> DeltaResult;

    // Apply every input in order. On failure the data is left partially modified and must be discarded
    fn apply_deltas(&self, urn: &ResourceUrn, inputs: &[AssetInput], data: &mut D) -> Result<(), AssetError>
    {
        for input in inputs
        {
            self.apply_delta(input, data).map_err(|err| delta_failed(urn, input, err.to_string()))?;
        }
        Ok(())
    }
}

fn delta_failed(urn: &ResourceUrn, input: &AssetInput, reason: String) -> AssetError
{
    AssetError::DeltaApplicationFailed { urn: urn.clone(), input: input.to_string(), reason }
}

// The delta formats available for one kind of asset data, dispatched by file extension
pub struct AssetDeltaFormats<D>
{
    formats: HashMap<UniCase<String>, Arc<dyn AssetDeltaFormat<D>>>,
}
impl<D> Default for AssetDeltaFormats<D>
{
    fn default() -> Self { Self { formats: HashMap::new() } }
}
impl<D> AssetDeltaFormats<D>
{
    // Later registrations replace earlier ones for any shared extension
    pub fn add(&mut self, format: Arc<dyn AssetDeltaFormat<D>>)
    {
        for ext in format.file_extensions()
        {
            if self.formats.insert(UniCase::new(ext.to_string()), format.clone()).is_some()
            {
                log::debug!("Replacing delta format for extension '{ext}'");
            }
        }
    }

    #[must_use]
    pub fn format_for(&self, filename: &str) -> Option<&Arc<dyn AssetDeltaFormat<D>>>
    {
        let ext = file_extension(filename)?;
        self.formats.get(&UniCase::new(ext.to_string()))
    }

    // The base asset name for a delta filename, if any registered format claims it
    #[must_use]
    pub fn asset_name(&self, filename: &str) -> Option<Name>
    {
        self.format_for(filename)?.asset_name(filename)
    }

    #[must_use]
    pub fn file_extensions(&self) -> Vec<&str>
    {
        let mut exts: Vec<&str> = self.formats.keys().map(|k| k.as_str()).collect();
        exts.sort_unstable();
        exts
    }

    #[inline] #[must_use]
    pub fn is_empty(&self) -> bool { self.formats.is_empty() }

    // Apply each input with the format matching its extension, in order
    pub fn apply_deltas(&self, urn: &ResourceUrn, inputs: &[AssetInput], data: &mut D) -> Result<(), AssetError>
    {
        for input in inputs
        {
            let Some(format) = self.format_for(&input.filename) else
            {
                log::warn!("No delta format registered for {input} (applying to {urn})");
                return Err(delta_failed(urn, input, "no delta format for this file extension".to_string()));
            };
            format.apply_delta(input, data).map_err(|err| delta_failed(urn, input, err.to_string()))?;
            log::debug!("Applied delta {input} to {urn}");
        }
        Ok(())
    }
}

pub const TOML_DELTA_EXTENSIONS: [UniCase<&'static str>; 1] = [UniCase::unicode("toml")];
pub const TOML_DELTA_SUFFIX: &str = ".delta.toml";

// Data that TOML deltas can be merged into
pub trait TomlDeltaTarget
{
    fn toml_table_mut(&mut self) -> &mut toml::Table;
}
impl TomlDeltaTarget for toml::Table
{
    fn toml_table_mut(&mut self) -> &mut toml::Table { self }
}

// Deltas written as TOML documents, in files named `<asset>.delta.toml`.
// Nested tables are merged key by key, anything else is replaced
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlDeltaFormat;
impl TomlDeltaFormat
{
    pub fn merge(target: &mut toml::Table, delta: toml::Table)
    {
        for (key, value) in delta
        {
            match value
            {
                toml::Value::Table(incoming) =>
                {
                    if let Some(toml::Value::Table(existing)) = target.get_mut(&key)
                    {
                        Self::merge(existing, incoming);
                        continue;
                    }
                    target.insert(key, toml::Value::Table(incoming));
                }
                other =>
                {
                    target.insert(key, other);
                }
            }
        }
    }
}
impl<D: TomlDeltaTarget> AssetDeltaFormat<D> for TomlDeltaFormat
{
    fn file_extensions(&self) -> &[UniCase<&'static str>] { &TOML_DELTA_EXTENSIONS }

    fn asset_name(&self, filename: &str) -> Option<Name>
    {
        let split = filename.len().checked_sub(TOML_DELTA_SUFFIX.len())?;
        let (name, suffix) = (filename.get(..split)?, filename.get(split..)?);
        match !name.is_empty() && suffix.eq_ignore_ascii_case(TOML_DELTA_SUFFIX)
        {
            true => Some(Name::new(name)),
            false => None,
        }
    }

    fn apply_delta(&self, input: &AssetInput, data: &mut D) -> DeltaResult
    {
        let delta: toml::Table = toml::from_str(input.as_str()?)?;
        Self::merge(data.toml_table_mut(), delta);
        Ok(())
    }
}
