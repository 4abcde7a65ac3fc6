//! Recipe domain model
//!
//! Recipes are the documents a distiller starts batches from: spirit type,
//! the pipeline its batches progress through, and free-form production notes
//! (grain bill, botanicals, cut points). They are stored as markdown files
//! with YAML frontmatter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::id::RecipeId;
use super::pipeline::{Pipeline, PipelineTemplate};

/// Metadata for a recipe - extensible key-value pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeMeta(HashMap<String, serde_json::Value>);

impl RecipeMeta {
    /// Creates empty metadata
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Gets a value by key
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Sets a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Removes a value
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    /// Returns true if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all key-value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Returns the inner HashMap
    pub fn inner(&self) -> &HashMap<String, serde_json::Value> {
        &self.0
    }
}

/// A recipe document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique identifier
    pub id: RecipeId,

    /// Human-readable name (e.g. "Wheated Bourbon")
    pub name: String,

    /// Spirit type used for labels and barrel provenance (e.g. "Bourbon")
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub spirit_type: Option<String>,

    /// Template the pipeline was seeded from
    pub template: PipelineTemplate,

    /// Stage sequence batches of this recipe progress through
    pub pipeline: Pipeline,

    /// When the recipe was created
    pub created_at: DateTime<Utc>,

    /// When the recipe was last updated
    pub updated_at: DateTime<Utc>,

    /// Markdown body content (excluding frontmatter)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,

    /// Extensible metadata from frontmatter
    #[serde(default, skip_serializing_if = "RecipeMeta::is_empty")]
    pub meta: RecipeMeta,
}

impl Recipe {
    /// Creates a new recipe with the pipeline expanded from a template
    pub fn new(name: impl Into<String>, template: PipelineTemplate) -> Self {
        let name = name.into();
        let now = Utc::now();
        let id = RecipeId::new(&name, now);

        Self {
            id,
            name,
            spirit_type: None,
            template,
            pipeline: template.stages(),
            created_at: now,
            updated_at: now,
            body: String::new(),
            meta: RecipeMeta::new(),
        }
    }

    /// Creates a recipe bound to an explicitly assembled pipeline
    pub fn with_pipeline(name: impl Into<String>, pipeline: Pipeline) -> Self {
        let mut recipe = Self::new(name, PipelineTemplate::Custom);
        recipe.pipeline = pipeline;
        recipe
    }

    /// The label written into a barrel's provenance when it is emptied:
    /// the spirit type when set, otherwise the recipe name.
    pub fn spirit_label(&self) -> &str {
        self.spirit_type.as_deref().unwrap_or(&self.name)
    }

    /// Sets the spirit type
    pub fn set_spirit_type(&mut self, spirit_type: impl Into<String>) {
        self.spirit_type = Some(spirit_type.into());
        self.updated_at = Utc::now();
    }

    /// Sets the body content
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.updated_at = Utc::now();
    }

    /// Sets a metadata value
    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.meta.set(key, value);
        self.updated_at = Utc::now();
    }

    /// Gets a metadata value
    pub fn get_meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }

    /// Removes a metadata value
    pub fn remove_meta(&mut self, key: &str) -> Option<serde_json::Value> {
        let result = self.meta.remove(key);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }
}

/// Represents the frontmatter section of a recipe file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeFrontmatter {
    pub id: RecipeId,
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub spirit_type: Option<String>,
    pub template: PipelineTemplate,
    pub pipeline: Pipeline,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub meta: HashMap<String, serde_json::Value>,
}

impl From<&Recipe> for RecipeFrontmatter {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id.clone(),
            name: recipe.name.clone(),
            spirit_type: recipe.spirit_type.clone(),
            template: recipe.template,
            pipeline: recipe.pipeline.clone(),
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
            meta: recipe.meta.inner().clone(),
        }
    }
}

impl RecipeFrontmatter {
    /// Converts to a Recipe with the given body
    pub fn into_recipe(self, body: String) -> Recipe {
        Recipe {
            id: self.id,
            name: self.name,
            spirit_type: self.spirit_type,
            template: self.template,
            pipeline: self.pipeline,
            created_at: self.created_at,
            updated_at: self.updated_at,
            body,
            meta: RecipeMeta(self.meta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stage::Stage;

    #[test]
    fn new_recipe_expands_template_pipeline() {
        let recipe = Recipe::new("House Bourbon", PipelineTemplate::GrainBarreled);
        assert_eq!(recipe.template, PipelineTemplate::GrainBarreled);
        assert_eq!(recipe.pipeline.first_stage(), Some(Stage::Mashing));
        assert!(recipe.pipeline.contains(Stage::BarrelAging));
    }

    #[test]
    fn recipe_id_is_generated_from_name() {
        let recipe = Recipe::new("Gin No. 3", PipelineTemplate::Botanical);
        assert!(recipe.id.to_string().starts_with("r-"));
    }

    #[test]
    fn spirit_label_falls_back_to_name() {
        let mut recipe = Recipe::new("House Bourbon", PipelineTemplate::GrainBarreled);
        assert_eq!(recipe.spirit_label(), "House Bourbon");

        recipe.set_spirit_type("Bourbon");
        assert_eq!(recipe.spirit_label(), "Bourbon");
    }

    #[test]
    fn custom_pipeline_recipe() {
        let pipeline = Pipeline::from_names(&["Fermenting", "Distilling", "Proofing"]).unwrap();
        let recipe = Recipe::with_pipeline("Experimental", pipeline);

        assert_eq!(recipe.template, PipelineTemplate::Custom);
        assert_eq!(recipe.pipeline.first_stage(), Some(Stage::Fermenting));
        assert!(recipe.pipeline.contains(Stage::Bottled));
    }

    #[test]
    fn recipe_meta_operations() {
        let mut recipe = Recipe::new("Rye", PipelineTemplate::GrainBarreled);

        recipe.set_meta("grain_bill", "95% rye, 5% malted barley");
        recipe.set_meta("target_proof", 110);

        assert_eq!(
            recipe.get_meta("grain_bill"),
            Some(&serde_json::json!("95% rye, 5% malted barley"))
        );
        assert_eq!(recipe.get_meta("target_proof"), Some(&serde_json::json!(110)));

        recipe.remove_meta("grain_bill");
        assert!(recipe.get_meta("grain_bill").is_none());
    }

    #[test]
    fn recipe_body() {
        let mut recipe = Recipe::new("Gin No. 3", PipelineTemplate::Botanical);
        recipe.set_body("# Botanicals\n\nJuniper, coriander, angelica root.");

        assert_eq!(recipe.body, "# Botanicals\n\nJuniper, coriander, angelica root.");
    }

    #[test]
    fn serde_roundtrip() {
        let mut recipe = Recipe::new("House Bourbon", PipelineTemplate::GrainBarreled);
        recipe.set_spirit_type("Bourbon");
        recipe.set_body("Notes");
        recipe.set_meta("yeast", "DADY");

        let json = serde_json::to_string(&recipe).unwrap();
        let parsed: Recipe = serde_json::from_str(&json).unwrap();

        assert_eq!(recipe.id, parsed.id);
        assert_eq!(recipe.name, parsed.name);
        assert_eq!(recipe.spirit_type, parsed.spirit_type);
        assert_eq!(recipe.pipeline, parsed.pipeline);
        assert_eq!(recipe.body, parsed.body);
    }

    #[test]
    fn frontmatter_conversion() {
        let mut recipe = Recipe::new("Liqueur di Limone", PipelineTemplate::Liqueur);
        recipe.set_meta("citrus", "sorrento lemons");

        let frontmatter = RecipeFrontmatter::from(&recipe);
        let restored = frontmatter.into_recipe(recipe.body.clone());

        assert_eq!(recipe.id, restored.id);
        assert_eq!(recipe.name, restored.name);
        assert_eq!(recipe.pipeline, restored.pipeline);
        assert_eq!(recipe.get_meta("citrus"), restored.get_meta("citrus"));
    }

    #[test]
    fn updated_at_changes_on_modifications() {
        let mut recipe = Recipe::new("Test", PipelineTemplate::Custom);
        let created = recipe.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(10));
        recipe.set_spirit_type("Vodka");

        assert!(recipe.updated_at > created);
    }
}
