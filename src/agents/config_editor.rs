use crate::error::{ExtMgrError, Result};
use crate::git::ParsedSource;
use crate::utils::PathValidator;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, Table, value};

const EXTENSIONS_TABLE: &str = "extensions";

#[derive(Debug, PartialEq, Eq)]
pub struct AddResult {
    pub name: String,
    /// Source previously configured under the same name.
    pub replaced: Option<String>,
}

/// Edits the `[extensions]` table of the configuration file in place, keeping
/// comments, ordering and formatting of everything else.
pub struct ConfigEditor {
    config_path: PathBuf,
}

impl ConfigEditor {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    /// Validates `name` and `source`, then inserts or replaces the entry.
    pub fn upsert_extension(&self, name: &str, source: &str) -> Result<AddResult> {
        validate_entry(name, source)?;

        let mut doc = self.load_document()?;
        ensure_section(&mut doc, EXTENSIONS_TABLE);

        let extensions = doc[EXTENSIONS_TABLE].as_table_mut().ok_or_else(|| {
            ExtMgrError::Config(format!(
                "'{}' in '{}' is not a table",
                EXTENSIONS_TABLE,
                self.config_path.display()
            ))
        })?;

        let replaced = upsert_source(extensions, name, source)?;
        self.write_document(&doc)?;

        Ok(AddResult {
            name: name.to_string(),
            replaced,
        })
    }

    fn load_document(&self) -> Result<DocumentMut> {
        if !self.config_path.exists() {
            return Ok(DocumentMut::new());
        }

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            ExtMgrError::Config(format!(
                "Failed to read config '{}': {}",
                self.config_path.display(),
                e
            ))
        })?;

        Ok(content.parse::<DocumentMut>()?)
    }

    fn write_document(&self, doc: &DocumentMut) -> Result<()> {
        fs::write(&self.config_path, doc.to_string()).map_err(|e| {
            ExtMgrError::Config(format!(
                "Failed to write config '{}': {}",
                self.config_path.display(),
                e
            ))
        })
    }
}

/// Checks that `name` is a safe directory name and `source` parses with a selector.
///
/// Sources without a `#semver:` selector are refused since they would never be updated.
pub fn validate_entry(name: &str, source: &str) -> Result<ParsedSource> {
    PathValidator::validate_extension_name(name)?;
    let parsed = ParsedSource::parse(source)?;
    if parsed.selector.is_none() {
        return Err(ExtMgrError::ProjectValidation(format!(
            "Source for '{}' has no #semver: selector",
            name
        )));
    }
    Ok(parsed)
}

fn ensure_section(doc: &mut DocumentMut, name: &str) {
    if !doc.contains_key(name) {
        let mut table = Table::new();
        table.set_implicit(false);
        doc[name] = Item::Table(table);
    }
}

fn upsert_source(table: &mut Table, name: &str, source: &str) -> Result<Option<String>> {
    if let Some(existing) = table.get_mut(name) {
        let Some(previous) = existing.as_str().map(str::to_string) else {
            return Err(ExtMgrError::ProjectValidation(format!(
                "Entry '{}' already exists but is not a string",
                name
            )));
        };

        // Preserve trailing comments attached to the old value.
        if let Some(current) = existing.as_value_mut() {
            let decor = current.decor().clone();
            *current = source.into();
            *current.decor_mut() = decor;
        }
        return Ok(Some(previous));
    }

    table.insert(name, value(source));
    Ok(None)
}
