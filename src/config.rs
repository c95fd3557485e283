use std::{fmt::Debug, path::PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extractor: ExtractorConfig,
    pub display: DisplayConfig,
}
impl Config {
    /// Falls back to the defaults when no path is given.
    pub fn load(path: Option<impl Into<PathBuf> + Debug>) -> anyhow::Result<Self> {
        match path {
            Some(path) => read_toml(path),
            None => Ok(Self::default()),
        }
    }
}

/// Marker strings the extractor looks for inside a column.
#[derive(Clone, PartialEq, Eq, Debug, TypedBuilder, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Leading token of the total-duration label, e.g. `合計: 5h24m`.
    #[builder(default = "合計".to_owned(), setter(into))]
    pub duration_prefix: String,
    /// Substring identifying the break-time paragraph of a kintai column.
    #[builder(default = "休憩".to_owned(), setter(into))]
    pub break_marker: String,
}
impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub locale: DisplayLocale,
    pub pairing: PairingStrategy,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayLocale {
    #[default]
    Ja,
    En,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PairingStrategy {
    /// Sort each source by date and pair entries by position.
    #[default]
    Positional,
    /// Pair entries that share a date; report the rest as unpaired.
    ByDate,
}

pub fn read_toml<P: Into<PathBuf> + Debug, T: for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    (|| toml::from_str(&fs_err::read_to_string(&path)?).map_err(anyhow::Error::new))().with_context(
        || {
            format!(
                "While trying to parse {path:?} as {}",
                std::any::type_name::<T>()
            )
        },
    )
}
