//! Effect templates
//!
//! Authored, immutable effect data loaded from `assets/config/attacks.ron`.
//! A template names a stat baseline, a spatial extent, an ordered list of
//! behaviors with their parameters, and presentation handles. Templates are
//! only ever read at runtime.
//!
//! ## Example
//! ```ron
//! (
//!     id: "cleave",
//!     stats: { AttackPower: 12.0 },
//!     shape: Fan(radius: 3.0, half_angle_deg: 50.0, segments: 8),
//!     behaviors: [
//!         FanSweep((radius: 3.0, half_angle_deg: 50.0, segments: 8, on_hit: Some("arc_chain"))),
//!     ],
//! )
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::attack::BehaviorList;
use super::behaviors::BehaviorSpec;
use crate::error::ConfigError;
use crate::stats::StatType;
use crate::targeting::AreaShape;
use crate::world::VisualHandle;

/// Default location of the bundled template library.
pub const DEFAULT_TEMPLATES_PATH: &str = "assets/config/attacks.ron";

/// Presentation handles attached to every instance of a template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateVisuals {
    /// Follows the instance while it is active
    #[serde(default)]
    pub body: Option<VisualHandle>,
    /// Connector drawn between chain hops
    #[serde(default)]
    pub beam: Option<VisualHandle>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectTemplate {
    pub id: String,
    #[serde(default)]
    pub stats: BTreeMap<StatType, f32>,
    #[serde(default)]
    pub shape: AreaShape,
    #[serde(default)]
    pub behaviors: Vec<BehaviorSpec>,
    #[serde(default)]
    pub visuals: TemplateVisuals,
}

impl EffectTemplate {
    /// Template with no stats and no behaviors.
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stats: BTreeMap::new(),
            shape: AreaShape::default(),
            behaviors: Vec::new(),
            visuals: TemplateVisuals::default(),
        }
    }

    pub fn with_stat(mut self, stat: StatType, value: f32) -> Self {
        self.stats.insert(stat, value);
        self
    }

    pub fn with_shape(mut self, shape: AreaShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_behavior(mut self, behavior: BehaviorSpec) -> Self {
        self.behaviors.push(behavior);
        self
    }

    pub fn with_visuals(mut self, visuals: TemplateVisuals) -> Self {
        self.visuals = visuals;
        self
    }

    /// Fresh behavior objects in declaration order.
    pub fn build_behaviors(&self) -> BehaviorList {
        self.behaviors.iter().map(BehaviorSpec::build).collect()
    }

    /// Template ids this template may spawn.
    pub fn referenced_templates(&self) -> impl Iterator<Item = &str> {
        self.behaviors
            .iter()
            .flat_map(|behavior| behavior.referenced_templates())
    }

    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("template with an empty id".to_string());
        }
        if let Some((stat, value)) = self.stats.iter().find(|(_, value)| !value.is_finite()) {
            return Err(format!("{}: {:?} is not finite ({})", self.id, stat, value));
        }
        for behavior in &self.behaviors {
            behavior
                .validate()
                .map_err(|e| format!("{}: {}: {}", self.id, behavior.name(), e))?;
        }
        Ok(())
    }
}

/// Identifier → template lookup consumed by the engine.
pub trait TemplateRepository {
    fn template(&self, id: &str) -> Option<&EffectTemplate>;
}

/// Root structure for the attacks.ron file
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    pub templates: Vec<EffectTemplate>,
}

/// Validated, in-memory template repository.
#[derive(Resource, Clone, Debug)]
pub struct TemplateLibrary {
    templates: HashMap<String, EffectTemplate>,
}

impl TemplateLibrary {
    /// Build and validate a library: unique ids, known sub-effect references,
    /// sane numeric parameters.
    pub fn new(config: TemplatesConfig) -> Result<Self, ConfigError> {
        let mut templates = HashMap::with_capacity(config.templates.len());
        for template in config.templates {
            template.validate().map_err(ConfigError::invalid)?;
            if templates.contains_key(&template.id) {
                return Err(ConfigError::invalid(format!(
                    "duplicate template id {:?}",
                    template.id
                )));
            }
            templates.insert(template.id.clone(), template);
        }

        let library = Self { templates };
        let missing = library.missing_references();
        if !missing.is_empty() {
            return Err(ConfigError::invalid(format!(
                "unknown sub-effect templates: {}",
                missing.join(", ")
            )));
        }
        Ok(library)
    }

    pub fn from_templates(templates: impl IntoIterator<Item = EffectTemplate>) -> Result<Self, ConfigError> {
        Self::new(TemplatesConfig {
            templates: templates.into_iter().collect(),
        })
    }

    /// Referenced ids with no template, sorted.
    fn missing_references(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .templates
            .values()
            .flat_map(|template| template.referenced_templates())
            .filter(|id| !self.templates.contains_key(*id))
            .map(str::to_string)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        missing.sort();
        missing
    }

    pub fn get(&self, id: &str) -> Option<&EffectTemplate> {
        self.templates.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Template ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Add or replace a single template (tests, tooling). References are not
    /// re-checked.
    pub fn insert(&mut self, template: EffectTemplate) -> Result<(), ConfigError> {
        template.validate().map_err(ConfigError::invalid)?;
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }
}

impl TemplateRepository for TemplateLibrary {
    fn template(&self, id: &str) -> Option<&EffectTemplate> {
        self.get(id)
    }
}

impl Default for TemplateLibrary {
    /// Load the bundled library from `assets/config/attacks.ron`.
    /// Panics if the file cannot be loaded - use for tests only.
    fn default() -> Self {
        load_template_library(DEFAULT_TEMPLATES_PATH)
            .expect("Failed to load attack templates in Default impl")
    }
}

/// Load and validate a template library from a RON file.
pub fn load_template_library(path: impl AsRef<Path>) -> Result<TemplateLibrary, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let config: TemplatesConfig = ron::from_str(&contents).map_err(|source| ConfigError::Ron {
        path: path.to_path_buf(),
        source,
    })?;
    let library = TemplateLibrary::new(config)?;
    info!("Loaded {} attack templates from {}", library.len(), path.display());
    Ok(library)
}
