use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{CanvasError, CanvasResult};
use crate::history::HistoryManager;
use crate::layer::Layer;
use crate::manager::LayerManager;
use crate::settings::CanvasSettings;
use crate::stack::LayerStack;

/// Plain, serializable form of a document.
///
/// Image pixels are not included; after loading, image layers carry no
/// handle until their bytes are decoded and attached again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    pub layers: Vec<Layer>,
    pub current_layer_index: usize,
    pub canvas_settings: CanvasSettings,
    /// Version of the crate that wrote the data
    pub version: String,
}

impl ProjectData {
    pub fn to_json(&self) -> CanvasResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let data: Self = serde_json::from_str(json)?;
        if data.version != env!("CARGO_PKG_VERSION") {
            warn!(
                "Project version {} differs from current version {}",
                data.version,
                env!("CARGO_PKG_VERSION")
            );
        }
        Ok(data)
    }
}

impl LayerManager {
    /// Captures the live document (not its history) for saving
    pub fn to_project(&self, settings: &CanvasSettings) -> ProjectData {
        ProjectData {
            layers: self.stack().to_layers(),
            current_layer_index: self.current_index(),
            canvas_settings: settings.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Rebuilds a manager from saved data, with an empty history
    pub fn from_project(data: ProjectData) -> CanvasResult<Self> {
        data.canvas_settings.validate()?;
        let layers = data
            .layers
            .into_iter()
            .map(|mut layer| {
                // Hand-edited files may carry out-of-range values.
                let opacity = layer.opacity();
                layer.set_opacity(if opacity.is_nan() { 1.0 } else { opacity });
                layer
            })
            .collect();
        let stack = LayerStack::from_layers(layers, data.current_layer_index)?;
        info!("Loaded project with {} layers", stack.len());
        Ok(Self::from_stack(
            stack,
            HistoryManager::new(data.canvas_settings.history_limit),
        ))
    }
}

/// Somewhere projects can be saved to and loaded from by name
pub trait ProjectStore {
    fn save(&mut self, name: &str, data: &ProjectData) -> CanvasResult<()>;
    fn load(&self, name: &str) -> CanvasResult<ProjectData>;
    fn list(&self) -> CanvasResult<Vec<String>>;
}

/// Keeps serialized projects in memory
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: HashMap<String, String>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn save(&mut self, name: &str, data: &ProjectData) -> CanvasResult<()> {
        self.projects.insert(name.to_string(), data.to_json()?);
        Ok(())
    }

    fn load(&self, name: &str) -> CanvasResult<ProjectData> {
        let json = self
            .projects
            .get(name)
            .ok_or_else(|| CanvasError::InvalidProject(format!("no project named '{name}'")))?;
        ProjectData::from_json(json)
    }

    fn list(&self) -> CanvasResult<Vec<String>> {
        let mut names: Vec<_> = self.projects.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Stores each project as `<name>.json` in a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> CanvasResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl ProjectStore for JsonFileStore {
    fn save(&mut self, name: &str, data: &ProjectData) -> CanvasResult<()> {
        let path = self.path_for(name);
        fs::write(&path, data.to_json()?)?;
        info!("Saved project to {}", path.display());
        Ok(())
    }

    fn load(&self, name: &str) -> CanvasResult<ProjectData> {
        let json = fs::read_to_string(self.path_for(name))?;
        ProjectData::from_json(&json)
    }

    fn list(&self) -> CanvasResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
