use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::config::AssistantConfig;

use super::backend::DetectorBackend;
use super::backends::{SceneBackend, ScriptBackend};

type BackendFactory =
    Box<dyn Fn(&AssistantConfig) -> Result<Box<dyn DetectorBackend>> + Send + Sync>;

/// Name → constructor table for detector backends.
///
/// Backends are built on demand from the loaded configuration, so an
/// unused backend never loads its model or script.
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every backend compiled into this build.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("scene", |_| Ok(Box::new(SceneBackend::new())));
        registry.register("script", |cfg| {
            let path = cfg
                .detector
                .script_path
                .as_ref()
                .ok_or_else(|| anyhow!("detector 'script' requires detector.script_path"))?;
            Ok(Box::new(ScriptBackend::from_path(path)?))
        });
        #[cfg(feature = "backend-tract")]
        registry.register("tract", |cfg| {
            let path = cfg
                .detector
                .model_path
                .as_ref()
                .ok_or_else(|| anyhow!("detector 'tract' requires detector.model_path"))?;
            Ok(Box::new(super::backends::TractBackend::new(path)?))
        });
        registry
    }

    /// Register a backend constructor, replacing any previous one of that name.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&AssistantConfig) -> Result<Box<dyn DetectorBackend>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Build and warm up the backend named in `cfg.detector.backend`.
    pub fn build(&self, cfg: &AssistantConfig) -> Result<Box<dyn DetectorBackend>> {
        let name = cfg.detector.backend.as_str();
        let factory = self.factories.get(name).ok_or_else(|| {
            anyhow!(
                "backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        let mut backend = factory(cfg)?;
        backend.warm_up()?;
        log::info!("detector backend ready: {}", backend.name());
        Ok(backend)
    }

    /// Registered backend names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
