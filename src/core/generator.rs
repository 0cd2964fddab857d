/// The title generator: vocabulary + entity pool + style catalog → titles.
///
/// Wires together loading, style/entity selection, template rendering,
/// and the entity-pool mutations.
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::catalog::{CatalogError, StyleCatalog};
use crate::schema::entity_pool::{EntityPool, PoolError, RecoveryPolicy};
use crate::schema::rules::RuleExamples;
use crate::schema::style::{GeneratedTitle, StyleId};
use crate::schema::vocabulary::Vocabulary;
use crate::schema::warning::LoadWarning;

/// How many entries per category the stats views show.
pub const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("entity pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("invalid style {requested}; available styles: {available}")]
    InvalidStyle { requested: StyleId, available: String },
    #[error("the style catalog is empty")]
    NoStyles,
    #[error("entity name must not be empty")]
    EmptyEntityName,
    #[error("category name must not be empty")]
    EmptyCategory,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-item choices for [`TitleGenerator::generate_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub total: usize,
    /// Fresh style per item; otherwise one style for the whole batch.
    pub random_style: bool,
    /// Fresh entity per item; otherwise one entity for the whole batch.
    /// Ignored when `fixed_entity` is set.
    pub random_entity: bool,
    pub fixed_entity: Option<String>,
}

impl BatchOptions {
    /// A batch with a random style and a random entity for every item.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            random_style: true,
            random_entity: true,
            fixed_entity: None,
        }
    }

    pub fn fixed_style(mut self) -> Self {
        self.random_style = false;
        self
    }

    pub fn fixed_random_entity(mut self) -> Self {
        self.random_entity = false;
        self
    }

    pub fn with_entity(mut self, name: impl Into<String>) -> Self {
        self.fixed_entity = Some(name.into());
        self
    }
}

/// Summary of one category for the stats views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    pub name: String,
    pub count: usize,
    pub samples: Vec<String>,
}

impl CategoryStats {
    fn from_list(name: &str, items: &[String]) -> Self {
        Self {
            name: name.to_string(),
            count: items.len(),
            samples: items.iter().take(SAMPLE_SIZE).cloned().collect(),
        }
    }
}

/// The top-level generator. Built via `TitleGenerator::builder()`.
pub struct TitleGenerator {
    vocabulary: Vocabulary,
    pool: EntityPool,
    catalog: StyleCatalog,
    rules: RuleExamples,
    pool_path: Option<PathBuf>,
    rng: StdRng,
    warnings: Vec<LoadWarning>,
}

/// Builder for constructing a `TitleGenerator`.
#[derive(Default)]
pub struct TitleGeneratorBuilder {
    vocabulary_path: Option<PathBuf>,
    pool_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    catalog_path: Option<PathBuf>,
    seed: Option<u64>,
    recovery_policy: RecoveryPolicy,
    /// Directly provided vocabulary (for testing without files).
    vocabulary: Option<Vocabulary>,
    /// Directly provided entity pool (for testing without files).
    pool: Option<EntityPool>,
    /// Directly provided catalog (for testing without files).
    catalog: Option<StyleCatalog>,
    /// Directly provided rule examples (for testing without files).
    rules: Option<RuleExamples>,
}

impl TitleGenerator {
    pub fn builder() -> TitleGeneratorBuilder {
        TitleGeneratorBuilder::default()
    }

    /// One title. Style and entity are drawn at random when not given.
    pub fn generate_one(
        &mut self,
        style: Option<StyleId>,
        entity: Option<&str>,
    ) -> Result<String, GeneratorError> {
        let style = self.resolve_style(style)?;
        let entity = self.resolve_entity(entity);
        self.render(style, &entity)
    }

    /// `count` titles sharing one style and one entity, each chosen once.
    pub fn generate_n(
        &mut self,
        style: Option<StyleId>,
        entity: Option<&str>,
        count: usize,
    ) -> Result<Vec<String>, GeneratorError> {
        let style = self.resolve_style(style)?;
        let entity = self.resolve_entity(entity);
        (0..count).map(|_| self.render(style, &entity)).collect()
    }

    /// `generate_n` for every style in the catalog, in ascending id order.
    pub fn generate_all_styles(
        &mut self,
        entity: Option<&str>,
        count: usize,
    ) -> Result<BTreeMap<StyleId, Vec<String>>, GeneratorError> {
        let ids: Vec<StyleId> = self.catalog.ids().collect();
        let mut results = BTreeMap::new();
        for id in ids {
            results.insert(id, self.generate_n(Some(id), entity, count)?);
        }
        Ok(results)
    }

    /// One title per item, with style and entity either drawn per item or
    /// fixed for the whole batch.
    pub fn generate_batch(
        &mut self,
        options: &BatchOptions,
    ) -> Result<Vec<GeneratedTitle>, GeneratorError> {
        let batch_style = if options.random_style {
            None
        } else {
            Some(self.resolve_style(None)?)
        };
        let batch_entity = match &options.fixed_entity {
            Some(name) => Some(name.clone()),
            None if !options.random_entity => Some(self.resolve_entity(None)),
            None => None,
        };

        let mut titles = Vec::with_capacity(options.total);
        for _ in 0..options.total {
            let style = match batch_style {
                Some(style) => style,
                None => self.resolve_style(None)?,
            };
            let entity = match &batch_entity {
                Some(entity) => entity.clone(),
                None => self.resolve_entity(None),
            };
            let text = self.render(style, &entity)?;
            titles.push(GeneratedTitle {
                style,
                entity,
                text,
            });
        }
        Ok(titles)
    }

    /// Add an entity and persist the pool when it changed.
    ///
    /// Returns `false` if the name was already in the category.
    pub fn add_entity(&mut self, category: &str, name: &str) -> Result<bool, GeneratorError> {
        let category = category.trim();
        let name = name.trim();
        if category.is_empty() {
            return Err(GeneratorError::EmptyCategory);
        }
        if name.is_empty() {
            return Err(GeneratorError::EmptyEntityName);
        }

        // The in-memory pool changes only after a successful save.
        let mut updated = self.pool.clone();
        if !updated.insert(category, name) {
            tracing::info!(category, name, "entity already present; nothing to add");
            return Ok(false);
        }

        match &self.pool_path {
            Some(path) => {
                updated.save(path)?;
                tracing::info!(category, name, path = %path.display(), "added entity and saved pool");
            }
            None => tracing::info!(category, name, "added entity (no pool file configured)"),
        }
        self.pool = updated;
        Ok(true)
    }

    pub fn vocabulary_stats(&self) -> Vec<CategoryStats> {
        self.vocabulary
            .categories()
            .map(|(name, terms)| CategoryStats::from_list(name, terms))
            .collect()
    }

    pub fn pool_stats(&self) -> Vec<CategoryStats> {
        self.pool
            .categories()
            .map(|(name, names)| CategoryStats::from_list(name, names))
            .collect()
    }

    /// Rule example counts per style label; samples are the generated
    /// column.
    pub fn rule_example_stats(&self) -> Vec<CategoryStats> {
        self.rules
            .styles()
            .map(|(label, rows)| CategoryStats {
                name: label.to_string(),
                count: rows.len(),
                samples: rows
                    .iter()
                    .take(SAMPLE_SIZE)
                    .map(|row| row.generated.clone())
                    .collect(),
            })
            .collect()
    }

    pub fn style_name(&self, id: StyleId) -> Option<&str> {
        self.catalog.get(id).map(|style| style.name.as_str())
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    pub fn catalog(&self) -> &StyleCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &RuleExamples {
        &self.rules
    }

    /// Warnings collected while loading input files.
    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    fn resolve_style(&mut self, style: Option<StyleId>) -> Result<StyleId, GeneratorError> {
        match style {
            Some(id) if self.catalog.contains(id) => Ok(id),
            Some(id) => Err(GeneratorError::InvalidStyle {
                requested: id,
                available: self
                    .catalog
                    .ids()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
            None => self
                .catalog
                .random_style(&mut self.rng)
                .ok_or(GeneratorError::NoStyles),
        }
    }

    fn resolve_entity(&mut self, entity: Option<&str>) -> String {
        match entity {
            Some(name) => name.to_string(),
            None => self.pool.pick_entity(&mut self.rng).to_string(),
        }
    }

    fn render(&mut self, style: StyleId, entity: &str) -> Result<String, GeneratorError> {
        let style = self
            .catalog
            .get(style)
            .ok_or(GeneratorError::NoStyles)?;
        Ok(style.render(entity, &self.vocabulary, &mut self.rng)?)
    }
}

impl TitleGeneratorBuilder {
    pub fn vocabulary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.vocabulary_path = Some(path.into());
        self
    }

    /// Pool file to load (created if missing) and to persist additions to.
    pub fn pool_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.pool_path = Some(path.into());
        self
    }

    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.rules_path = Some(path.into());
        self
    }

    /// Replace the built-in catalog with a RON catalog file.
    pub fn catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn recovery_policy(mut self, policy: RecoveryPolicy) -> Self {
        self.recovery_policy = policy;
        self
    }

    /// Provide a vocabulary directly (for testing without files).
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Provide an entity pool directly (for testing without files).
    pub fn with_pool(mut self, pool: EntityPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Provide a catalog directly (for testing without files).
    pub fn with_catalog(mut self, catalog: StyleCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Provide rule examples directly (for testing without files).
    pub fn with_rules(mut self, rules: RuleExamples) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn build(self) -> Result<TitleGenerator, GeneratorError> {
        let mut warnings = Vec::new();

        let vocabulary = match (self.vocabulary, &self.vocabulary_path) {
            (Some(vocabulary), _) => vocabulary,
            (None, Some(path)) => Vocabulary::load(path).drain_into(&mut warnings),
            (None, None) => Vocabulary::new(),
        };

        let pool = match (self.pool, &self.pool_path) {
            (Some(pool), _) => pool,
            (None, Some(path)) => {
                EntityPool::load(path, self.recovery_policy).drain_into(&mut warnings)
            }
            (None, None) => EntityPool::builtin(),
        };

        let catalog = match (self.catalog, &self.catalog_path) {
            (Some(catalog), _) => catalog,
            (None, Some(path)) => StyleCatalog::load_from_ron(path)?,
            (None, None) => StyleCatalog::builtin()?,
        };
        if catalog.is_empty() {
            return Err(GeneratorError::NoStyles);
        }

        let rules = match (self.rules, &self.rules_path) {
            (Some(rules), _) => rules,
            (None, Some(path)) => RuleExamples::load(path).drain_into(&mut warnings),
            (None, None) => RuleExamples::default(),
        };

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        tracing::debug!(
            styles = catalog.len(),
            vocabulary_categories = vocabulary.len(),
            pool_categories = pool.len(),
            warnings = warnings.len(),
            "title generator ready"
        );

        Ok(TitleGenerator {
            vocabulary,
            pool,
            catalog,
            rules,
            pool_path: self.pool_path,
            rng,
            warnings,
        })
    }
}

/// Write titles to `path`, one per line.
pub fn save_titles<S: AsRef<str>>(path: &Path, titles: &[S]) -> Result<(), GeneratorError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for title in titles {
        writeln!(writer, "{}", title.as_ref())?;
    }
    writer.flush()?;
    Ok(())
}
