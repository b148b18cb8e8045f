use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    attributes: HashMap<String, String>,
    datasets: HashMap<String, DatasetEntry>,
}

#[derive(Debug, Deserialize)]
struct DatasetEntry {
    records: String,
    #[serde(default)]
    expected: Option<String>,
}

/// Manifest section a fixture name is looked up in.
#[derive(Clone, Copy, Debug)]
enum Section {
    Attributes,
    Datasets,
}

impl Section {
    fn label(self) -> &'static str {
        match self {
            Section::Attributes => "attribute definition",
            Section::Datasets => "dataset",
        }
    }
}

/// Repository-level `fixtures/` directory shared by every crate's tests.
fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn fixture_path(rel: &str) -> PathBuf {
    fixture_dir().join(rel)
}

fn read_fixture(section: Section, rel: &str) -> Result<String> {
    let path = fixture_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("reading {} file {}", section.label(), path.display()))
}

fn parse_fixture<T: DeserializeOwned>(section: Section, rel: &str) -> Result<T> {
    let text = read_fixture(section, rel)?;
    serde_json::from_str(&text)
        .with_context(|| format!("{rel} does not match the expected {} shape", section.label()))
}

fn manifest_entry<'a, T>(entries: &'a HashMap<String, T>, section: Section, name: &str) -> Result<&'a T> {
    entries.get(name).ok_or_else(|| {
        let mut known: Vec<&str> = entries.keys().map(String::as_str).collect();
        known.sort_unstable();
        anyhow!(
            "no {} named '{name}' in fixtures/manifest.json (known: {})",
            section.label(),
            known.join(", ")
        )
    })
}

/// Attribute definition documents, as accepted by `parse_attribute_defs_json`.
pub mod attributes {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.attributes.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = manifest_entry(&MANIFEST.attributes, Section::Attributes, name)?;
        read_fixture(Section::Attributes, rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = manifest_entry(&MANIFEST.attributes, Section::Attributes, name)?;
        Ok(fixture_path(rel))
    }
}

/// Record sets, optionally paired with the buffer contents they should pack to.
pub mod datasets {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.datasets.keys().cloned().collect()
    }

    pub fn records<T: DeserializeOwned>(name: &str) -> Result<Vec<T>> {
        let entry = manifest_entry(&MANIFEST.datasets, Section::Datasets, name)?;
        parse_fixture(Section::Datasets, &entry.records)
    }

    /// Expected buffer contents keyed by attribute name, if the dataset has any.
    pub fn expected(name: &str) -> Result<Option<HashMap<String, Vec<f64>>>> {
        let entry = manifest_entry(&MANIFEST.datasets, Section::Datasets, name)?;
        match &entry.expected {
            Some(rel) => parse_fixture(Section::Datasets, rel).map(Some),
            None => Ok(None),
        }
    }

    pub fn records_path(name: &str) -> Result<PathBuf> {
        let entry = manifest_entry(&MANIFEST.datasets, Section::Datasets, name)?;
        Ok(fixture_path(&entry.records))
    }
}
