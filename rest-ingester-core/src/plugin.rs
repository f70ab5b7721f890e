//! Pre-processing plugins run on each top-level package before it is
//! packaged. Plugins are looked up by name in a fixed table that is resolved
//! once at startup.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::metadata::MODS_FILE;
use crate::pid::decoded_dir_name;

pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Prepare `dir` for packaging. An error marks the package as failed.
    fn execute(&self, dir: &Path, config: &IngestConfig) -> Result<(), IngestError>;
}

/// Writes a minimal MODS record titled after the directory when the package
/// has none. An existing `MODS.xml` is never touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateModsStub;

impl Plugin for CreateModsStub {
    fn name(&self) -> &'static str {
        "CreateModsStub"
    }

    fn execute(&self, dir: &Path, _config: &IngestConfig) -> Result<(), IngestError> {
        let mods_path = dir.join(MODS_FILE);
        if mods_path.exists() {
            info!(path = %mods_path.display(), "[PLUGIN] CreateModsStub found an existing MODS file, not replacing it");
            return Ok(());
        }
        let title = decoded_dir_name(dir);
        std::fs::write(&mods_path, mods_stub(&title)).map_err(|e| IngestError::io(&mods_path, e))?;
        info!(path = %mods_path.display(), title = %title, "[PLUGIN] CreateModsStub created MODS file");
        Ok(())
    }
}

fn mods_stub(title: &str) -> String {
    format!(
        r#"<mods xmlns="http://www.loc.gov/mods/v3" xmlns:mods="http://www.loc.gov/mods/v3" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <titleInfo>
    <title>{}</title>
  </titleInfo>
</mods>
"#,
        quick_xml::escape::escape(title)
    )
}

/// Logs the directory it is given. A template for writing new plugins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Example;

impl Plugin for Example {
    fn name(&self) -> &'static str {
        "Example"
    }

    fn execute(&self, dir: &Path, _config: &IngestConfig) -> Result<(), IngestError> {
        info!(path = %dir.display(), "[PLUGIN] Hello from the Example plugin");
        Ok(())
    }
}

/// Name → plugin table.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CreateModsStub));
        registry.register(Arc::new(Example));
        registry
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Look up `names` in order, failing on the first one not registered.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Arc<dyn Plugin>>, IngestError> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.plugins
                    .get(name)
                    .cloned()
                    .ok_or_else(|| IngestError::UnknownPlugin(name.to_string()))
            })
            .collect()
    }
}

/// Run `plugins` in order on `dir`, stopping at the first failure.
pub fn run_plugins(
    plugins: &[Arc<dyn Plugin>],
    dir: &Path,
    config: &IngestConfig,
) -> Result<(), IngestError> {
    for plugin in plugins {
        info!(plugin = plugin.name(), path = %dir.display(), "[PLUGIN] Running");
        plugin.execute(dir, config)?;
    }
    Ok(())
}
