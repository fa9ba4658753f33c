//! DSN schema model consumed by the shortcut rewriter.
//!
//! A DSN field such as `S21_G00_30_001` belongs to the bloc `S21.G00.30`
//! and has the short code `30_001`. Several blocs can define the same short
//! code, which is what makes a shortcut ambiguous.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::LazyLock,
};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

static FULL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(S\d+)_(G\d+)_(\d+)_(\d+)$").expect("valid regex"));

/// A field of the schema.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct DsnAttribute {
    /// `S21_G00_30_001`
    pub full_name: String,
    /// `30_001`
    pub short_id: String,
    /// `S21.G00.30`
    pub bloc_name: String,
    pub description: String,
    pub mandatory: bool,
}

impl DsnAttribute {
    pub fn new(full_name: impl Into<String>) -> Self {
        let mut attr = DsnAttribute {
            full_name: full_name.into(),
            ..Default::default()
        };
        attr.fill_derived_names();
        attr
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Derives `short_id` and `bloc_name` from the full name when missing.
    fn fill_derived_names(&mut self) {
        let Some(caps) = FULL_NAME.captures(&self.full_name) else {
            return;
        };
        if self.short_id.is_empty() {
            self.short_id = format!("{}_{}", &caps[3], &caps[4]);
        }
        if self.bloc_name.is_empty() {
            self.bloc_name = format!("{}.{}.{}", &caps[1], &caps[2], &caps[3]);
        }
    }
}

/// A structural group of fields.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct DsnBloc {
    /// `S21.G00.30`
    pub name: String,
    /// `INDIVIDU`
    pub label: String,
    pub description: String,
}

/// Read-only lookups the rewriter needs from a schema.
pub trait SchemaProvider {
    /// Candidates for a short code, in schema order.
    fn find_by_short_code(&self, code: &str) -> &[DsnAttribute];

    fn find_by_full_name(&self, full_name: &str) -> Option<&DsnAttribute>;

    fn find_bloc(&self, name: &str) -> Option<&DsnBloc>;
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Cannot read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid schema: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SchemaFile {
    version: String,
    attributes: Vec<DsnAttribute>,
    blocs: Vec<DsnBloc>,
}

/// In-memory schema indexed by short code and full name.
#[derive(Debug, Clone, Default)]
pub struct DsnSchema {
    version: String,
    shortcuts: HashMap<String, Vec<DsnAttribute>>,
    attributes: BTreeMap<String, DsnAttribute>,
    blocs: Vec<DsnBloc>,
    bloc_index: HashMap<String, usize>,
}

impl DsnSchema {
    pub fn new(version: impl Into<String>) -> Self {
        DsnSchema {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Parses a JSON schema of the form
    /// `{"version": "P25", "attributes": [{"full_name": "S21_G00_30_001"}], "blocs": []}`.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_json::from_str(json)?;
        let mut schema = DsnSchema::new(file.version);
        for attr in file.attributes {
            schema.add_attribute(attr);
        }
        for bloc in file.blocs {
            schema.add_bloc(bloc);
        }
        Ok(schema)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn add_attribute(&mut self, mut attr: DsnAttribute) {
        attr.fill_derived_names();
        if !attr.short_id.is_empty() {
            self.shortcuts
                .entry(attr.short_id.clone())
                .or_default()
                .push(attr.clone());
        }
        self.attributes.insert(attr.full_name.clone(), attr);
    }

    pub fn add_bloc(&mut self, bloc: DsnBloc) {
        match self.bloc_index.get(&bloc.name) {
            Some(&i) => self.blocs[i] = bloc,
            None => {
                self.bloc_index.insert(bloc.name.clone(), self.blocs.len());
                self.blocs.push(bloc);
            }
        }
    }

    pub fn is_ambiguous(&self, code: &str) -> bool {
        self.find_by_short_code(code).len() > 1
    }

    pub fn attributes(&self) -> impl Iterator<Item = &DsnAttribute> {
        self.attributes.values()
    }

    pub fn blocs(&self) -> &[DsnBloc] {
        &self.blocs
    }
}

impl SchemaProvider for DsnSchema {
    fn find_by_short_code(&self, code: &str) -> &[DsnAttribute] {
        self.shortcuts.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    fn find_by_full_name(&self, full_name: &str) -> Option<&DsnAttribute> {
        self.attributes.get(full_name)
    }

    fn find_bloc(&self, name: &str) -> Option<&DsnBloc> {
        self.bloc_index.get(name).map(|&i| &self.blocs[i])
    }
}
