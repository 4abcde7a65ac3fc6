//! Markdown storage for recipes
//!
//! Recipes are stored as markdown files in `.stillroom/recipes/`.
//! Each file has YAML frontmatter for metadata and a markdown body for
//! production notes. An index file (`.stillroom/recipes/index.jsonl`)
//! caches metadata for fast queries.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::{PipelineTemplate, Recipe, RecipeFrontmatter, RecipeId};

/// Index entry for quick recipe lookups
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct IndexEntry {
    id: RecipeId,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    spirit_type: Option<String>,
    template: PipelineTemplate,
    updated_at: chrono::DateTime<chrono::Utc>,
    file_name: String,
}

impl From<&Recipe> for IndexEntry {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id.clone(),
            name: recipe.name.clone(),
            spirit_type: recipe.spirit_type.clone(),
            template: recipe.template,
            updated_at: recipe.updated_at,
            file_name: format!("{}.md", recipe.id),
        }
    }
}

/// Store for recipe data as markdown files
pub struct RecipeStore {
    /// Directory containing recipe files
    dir: PathBuf,

    /// Path to the index file
    index_path: PathBuf,
}

impl RecipeStore {
    /// Creates a new recipe store at the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let index_path = dir.join("index.jsonl");
        Self { dir, index_path }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".stillroom").join("recipes"))
    }

    /// Returns the directory containing recipe files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path to a recipe file
    pub fn recipe_path(&self, id: &RecipeId) -> PathBuf {
        self.dir.join(format!("{}.md", id))
    }

    /// Checks if the index needs rebuilding
    fn index_is_stale(&self) -> bool {
        if !self.index_path.exists() {
            return true;
        }

        let index_mtime = match fs::metadata(&self.index_path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return true,
        };

        // Check if any .md file is newer than the index
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(_) => return true,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "md") {
                if let Ok(meta) = fs::metadata(&path) {
                    if let Ok(mtime) = meta.modified() {
                        if mtime > index_mtime {
                            return true;
                        }
                    }
                }
            }
        }

        // Check if any file was deleted (entry in index but no file)
        if let Ok(index) = self.read_index() {
            for entry in index.values() {
                let path = self.dir.join(&entry.file_name);
                if !path.exists() {
                    return true;
                }
            }
        }

        false
    }

    /// Reads the index file
    fn read_index(&self) -> Result<HashMap<RecipeId, IndexEntry>> {
        if !self.index_path.exists() {
            return Ok(HashMap::new());
        }

        let file = File::open(&self.index_path)
            .with_context(|| format!("Failed to open index: {}", self.index_path.display()))?;

        let reader = BufReader::new(file);
        let mut entries = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line =
                line.with_context(|| format!("Failed to read index line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: IndexEntry = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse index entry at line {}", line_num + 1))?;

            entries.insert(entry.id.clone(), entry);
        }

        Ok(entries)
    }

    /// Writes the index file
    fn write_index(&self, entries: &HashMap<RecipeId, IndexEntry>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let file = File::create(&self.index_path)
            .with_context(|| format!("Failed to create index: {}", self.index_path.display()))?;

        let mut writer = BufWriter::new(file);

        let mut sorted: Vec<_> = entries.values().collect();
        sorted.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));

        for entry in sorted {
            let line = serde_json::to_string(entry).context("Failed to serialize index entry")?;
            writeln!(writer, "{}", line).context("Failed to write index entry")?;
        }

        writer.flush().context("Failed to flush index")?;
        Ok(())
    }

    /// Rebuilds the index from files
    fn rebuild_index(&self) -> Result<HashMap<RecipeId, IndexEntry>> {
        let mut entries = HashMap::new();

        if !self.dir.exists() {
            return Ok(entries);
        }

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?
        {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.extension().is_some_and(|e| e == "md") {
                if let Ok(recipe) = self.read_from_file(&path) {
                    entries.insert(recipe.id.clone(), IndexEntry::from(&recipe));
                }
            }
        }

        self.write_index(&entries)?;
        Ok(entries)
    }

    /// Ensures the index is up-to-date
    fn ensure_index(&self) -> Result<HashMap<RecipeId, IndexEntry>> {
        if self.index_is_stale() {
            self.rebuild_index()
        } else {
            self.read_index()
        }
    }

    /// Reads a recipe from a file
    fn read_from_file(&self, path: &Path) -> Result<Recipe> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recipe file: {}", path.display()))?;

        self.parse_markdown(&content)
    }

    /// Parses a markdown string into a Recipe
    fn parse_markdown(&self, content: &str) -> Result<Recipe> {
        // Manual frontmatter parsing
        let content = content.trim();

        if !content.starts_with("---") {
            anyhow::bail!("Missing frontmatter (must start with ---)");
        }

        // Find the end of frontmatter
        let rest = &content[3..];
        let end_pos = rest
            .find("---")
            .ok_or_else(|| anyhow::anyhow!("Missing frontmatter end delimiter (---)"))?;

        let yaml_content = &rest[..end_pos].trim();
        let body = rest[end_pos + 3..].trim();

        // Parse YAML frontmatter
        let fm: RecipeFrontmatter =
            serde_yaml::from_str(yaml_content).context("Failed to parse frontmatter")?;

        Ok(fm.into_recipe(body.to_string()))
    }

    /// Writes a recipe to its file atomically (temp file + rename)
    fn write_to_file(&self, recipe: &Recipe) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create directory: {}", self.dir.display()))?;

        let path = self.recipe_path(&recipe.id);
        let temp_path = path.with_extension("md.tmp");
        let content = self.render_markdown(recipe)?;

        // Write to temp file first
        fs::write(&temp_path, &content)
            .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;

        // Atomic rename
        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Renders a recipe to markdown
    fn render_markdown(&self, recipe: &Recipe) -> Result<String> {
        let frontmatter = RecipeFrontmatter::from(recipe);
        let yaml =
            serde_yaml::to_string(&frontmatter).context("Failed to serialize frontmatter")?;

        let mut content = String::new();
        content.push_str("---\n");
        content.push_str(&yaml);
        content.push_str("---\n\n");
        content.push_str(&recipe.body);

        if !content.ends_with('\n') {
            content.push('\n');
        }

        Ok(content)
    }

    /// Reads all recipes
    pub fn read_all(&self) -> Result<HashMap<RecipeId, Recipe>> {
        let _ = self.ensure_index()?; // Ensure index is fresh
        let mut recipes = HashMap::new();

        if !self.dir.exists() {
            return Ok(recipes);
        }

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?
        {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.extension().is_some_and(|e| e == "md") {
                if let Ok(recipe) = self.read_from_file(&path) {
                    recipes.insert(recipe.id.clone(), recipe);
                }
            }
        }

        Ok(recipes)
    }

    /// Lists recipes with basic info (from index, fast)
    pub fn list(&self) -> Result<Vec<(RecipeId, String, PipelineTemplate)>> {
        let index = self.ensure_index()?;
        Ok(index
            .values()
            .map(|e| (e.id.clone(), e.name.clone(), e.template))
            .collect())
    }

    /// Reads a single recipe by ID
    pub fn read(&self, id: &RecipeId) -> Result<Option<Recipe>> {
        let path = self.recipe_path(id);
        if !path.exists() {
            return Ok(None);
        }

        Ok(Some(self.read_from_file(&path)?))
    }

    /// Writes a recipe
    pub fn write(&self, recipe: &Recipe) -> Result<()> {
        self.write_to_file(recipe)?;

        // Update index
        let mut index = self.read_index().unwrap_or_default();
        index.insert(recipe.id.clone(), IndexEntry::from(recipe));
        self.write_index(&index)?;

        Ok(())
    }

    /// Removes a recipe by ID
    pub fn remove(&self, id: &RecipeId) -> Result<bool> {
        let path = self.recipe_path(id);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove recipe file: {}", path.display()))?;

        // Update index
        let mut index = self.read_index().unwrap_or_default();
        index.remove(id);
        self.write_index(&index)?;

        Ok(true)
    }

    /// Checks if a recipe exists
    pub fn exists(&self, id: &RecipeId) -> bool {
        self.recipe_path(id).exists()
    }
}
