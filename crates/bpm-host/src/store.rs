//! Directory-backed asset store
//!
//! Layout:
//!
//! ```text
//! <root>/classes.yaml          native + component class catalog (or classes.json)
//! <root>/assets/Doors/B_Door.json   one Blueprint document per asset under /Game/
//! ```
//!
//! Saving an asset rewrites only that asset's document, atomically.

use crate::error::{HostError, HostResult};
use crate::model::{Blueprint, ClassCatalog, HostModel};
use bpm_model::AssetPath;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

const CATALOG_FILES: &[&str] = &["classes.yaml", "classes.yml", "classes.json"];
const ASSETS_DIR: &str = "assets";

/// An asset store rooted at a directory
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    /// Store rooted at `root` (nothing is read yet)
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Document file of an asset
    #[must_use]
    pub fn asset_file(&self, asset: &AssetPath) -> PathBuf {
        let mut file = self.root.join(ASSETS_DIR);
        for segment in asset.relative_segments() {
            file.push(segment);
        }
        file.set_extension("json");
        file
    }

    /// Read the catalog and every asset document
    ///
    /// # Errors
    /// Missing catalog, unreadable files, malformed documents, or a document
    /// whose `path` does not match where it is stored.
    pub fn load(&self) -> HostResult<HostModel> {
        let mut model = HostModel::new(self.load_catalog()?);

        let assets = self.root.join(ASSETS_DIR);
        if !assets.is_dir() {
            warn!(store = %self.root.display(), "asset store has no assets directory");
            return Ok(model);
        }

        for entry in WalkDir::new(&assets).sort_by_file_name() {
            let entry = entry.map_err(|e| HostError::Host(format!("walking {}: {e}", assets.display())))?;
            let file = entry.path();
            if !entry.file_type().is_file() || file.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = fs::read_to_string(file)?;
            let blueprint: Blueprint = serde_json::from_str(&text)
                .map_err(|e| HostError::Host(format!("{}: {e}", file.display())))?;
            if self.asset_file(&blueprint.path) != file {
                return Err(HostError::Host(format!(
                    "{} declares {} which belongs at {}",
                    file.display(),
                    blueprint.path,
                    self.asset_file(&blueprint.path).display()
                )));
            }
            model.insert_blueprint(blueprint);
        }
        debug!(store = %self.root.display(), assets = model.blueprints().len(), "asset store loaded");
        Ok(model)
    }

    fn load_catalog(&self) -> HostResult<ClassCatalog> {
        let file = CATALOG_FILES
            .iter()
            .map(|name| self.root.join(name))
            .find(|p| p.is_file())
            .ok_or_else(|| HostError::Host(format!("no class catalog in {}", self.root.display())))?;
        let text = fs::read_to_string(&file)?;
        let catalog = if file.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };
        catalog.map_err(|e| HostError::Host(format!("{}: {e}", file.display())))
    }

    /// Write the class catalog as `classes.json`
    ///
    /// # Errors
    /// I/O errors.
    pub fn write_catalog(&self, catalog: &ClassCatalog) -> HostResult<()> {
        let text = serde_json::to_string_pretty(catalog).map_err(|e| HostError::Host(e.to_string()))?;
        atomic_write(&self.root.join("classes.json"), text.as_bytes())
    }

    /// Write one asset document
    ///
    /// # Errors
    /// I/O errors.
    pub fn write_blueprint(&self, blueprint: &Blueprint) -> HostResult<()> {
        let text = serde_json::to_string_pretty(blueprint).map_err(|e| HostError::Host(e.to_string()))?;
        let file = self.asset_file(&blueprint.path);
        atomic_write(&file, text.as_bytes())?;
        debug!(asset = %blueprint.path, file = %file.display(), "asset written");
        Ok(())
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> HostResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| HostError::Host(format!("{} has no parent directory", path.display())))?;
    fs::create_dir_all(dir)?;
    let temp = tempfile::NamedTempFile::new_in(dir)?;
    fs::write(temp.path(), data)?;
    temp.persist(path).map_err(|e| HostError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NativeClass;
    use bpm_model::{ClassPath, HostValue, PropertyKind};

    fn catalog() -> ClassCatalog {
        ClassCatalog {
            native_classes: vec![NativeClass::new(ClassPath::parse("/Script/Engine.Actor").unwrap(), None)],
            component_classes: Vec::new(),
        }
    }

    #[test]
    fn asset_file_mirrors_virtual_path() {
        let store = AssetStore::new(Path::new("/store"));
        let asset = AssetPath::parse("/Game/Doors/B_Door").unwrap();
        assert_eq!(store.asset_file(&asset), Path::new("/store/assets/Doors/B_Door.json"));
    }

    #[test]
    fn written_store_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path());
        store.write_catalog(&catalog()).unwrap();
        let bp = Blueprint::new(
            AssetPath::parse("/Game/Doors/B_Door").unwrap(),
            ClassPath::parse("/Script/Engine.Actor").unwrap(),
        )
        .with_variable("Speed", PropertyKind::Float, HostValue::Float(2.5));
        store.write_blueprint(&bp).unwrap();

        let model = store.load().unwrap();
        assert_eq!(model.blueprint(&bp.path).unwrap(), &bp);
    }

    #[test]
    fn misplaced_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path());
        store.write_catalog(&catalog()).unwrap();
        let bp = Blueprint::new(
            AssetPath::parse("/Game/A").unwrap(),
            ClassPath::parse("/Script/Engine.Actor").unwrap(),
        );
        let wrong = dir.path().join("assets/B.json");
        fs::create_dir_all(wrong.parent().unwrap()).unwrap();
        fs::write(&wrong, serde_json::to_string(&bp).unwrap()).unwrap();
        assert!(matches!(store.load(), Err(HostError::Host(_))));
    }

    #[test]
    fn missing_catalog_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AssetStore::new(dir.path()).load().is_err());
    }
}
