/// Style catalog — the declarative table of styles, their slots, and their
/// weighted template variants.
use rand::distributions::WeightedIndex;
use rand::distributions::Distribution;
use rand::seq::IteratorRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

use crate::core::template::{Template, TemplateError, TemplateSegment};
use crate::schema::style::StyleId;
use crate::schema::vocabulary::Vocabulary;

const BUILTIN_CATALOG: &str = include_str!("../../style_data/builtin.ron");

/// Styles with fewer variants than this get a lint warning.
pub const MIN_VARIANTS: usize = 5;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("style {style}: {source}")]
    Template {
        style: StyleId,
        #[source]
        source: TemplateError,
    },
    #[error("style {style} references undefined slot '{slot}'")]
    UnknownSlot { style: StyleId, slot: String },
    #[error("style {0} has no selectable variants")]
    NoVariants(StyleId),
    #[error("catalog defines no styles")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Where a slot draws its words from: the union of the named vocabulary
/// categories, or the fallback list when that union is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSource {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub fallback: Vec<String>,
}

/// A weighted template alternative within a style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub weight: u32,
    pub template: Template,
}

/// A named generation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub id: StyleId,
    pub name: String,
    pub slots: BTreeMap<String, SlotSource>,
    pub variants: Vec<Variant>,
}

impl Style {
    /// Choose a variant by weight and fill it in.
    pub fn render<R: Rng + ?Sized>(
        &self,
        entity: &str,
        vocabulary: &Vocabulary,
        rng: &mut R,
    ) -> Result<String, CatalogError> {
        let weights: Vec<u32> = self.variants.iter().map(|v| v.weight).collect();
        let dist = WeightedIndex::new(&weights).map_err(|_| CatalogError::NoVariants(self.id))?;
        self.render_variant(dist.sample(rng), entity, vocabulary, rng)
    }

    /// Fill in the variant at `index`. Every slot occurrence is an
    /// independent draw.
    pub fn render_variant<R: Rng + ?Sized>(
        &self,
        index: usize,
        entity: &str,
        vocabulary: &Vocabulary,
        rng: &mut R,
    ) -> Result<String, CatalogError> {
        let variant = self
            .variants
            .get(index)
            .ok_or(CatalogError::NoVariants(self.id))?;

        let mut out = String::new();
        for segment in &variant.template.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Entity => out.push_str(entity),
                TemplateSegment::Slot(name) => {
                    let source = self.slots.get(name).ok_or_else(|| CatalogError::UnknownSlot {
                        style: self.id,
                        slot: name.clone(),
                    })?;
                    out.push_str(vocabulary.pick_union(&source.categories, &source.fallback, rng));
                }
            }
        }
        Ok(out)
    }
}

/// All styles, keyed and iterated by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleCatalog {
    styles: BTreeMap<StyleId, Style>,
}

// RON shape of a catalog file; templates arrive as text and are parsed
// into segments on load.

#[derive(Debug, Deserialize)]
struct RonVariant {
    #[serde(default = "default_weight")]
    weight: u32,
    text: String,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Style")]
struct RonStyle {
    name: String,
    #[serde(default)]
    slots: BTreeMap<String, SlotSource>,
    variants: Vec<RonVariant>,
}

impl StyleCatalog {
    /// The catalog compiled into the crate.
    pub fn builtin() -> Result<StyleCatalog, CatalogError> {
        Self::parse_ron(BUILTIN_CATALOG)
    }

    /// Load a catalog from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<StyleCatalog, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse and validate a catalog from a RON string.
    pub fn parse_ron(input: &str) -> Result<StyleCatalog, CatalogError> {
        let raw: BTreeMap<u8, RonStyle> = ron::from_str(input)?;
        if raw.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut catalog = StyleCatalog::default();
        for (id, ron_style) in raw {
            let id = StyleId(id);
            let mut variants = Vec::with_capacity(ron_style.variants.len());
            for alt in ron_style.variants {
                let template = Template::parse(&alt.text)
                    .map_err(|source| CatalogError::Template { style: id, source })?;
                variants.push(Variant {
                    weight: alt.weight,
                    template,
                });
            }

            let slots = ron_style
                .slots
                .into_iter()
                .map(|(name, mut source)| {
                    source.fallback.retain(|term| !term.trim().is_empty());
                    (name, source)
                })
                .collect();

            catalog.insert(Style {
                id,
                name: ron_style.name,
                slots,
                variants,
            })?;
        }
        Ok(catalog)
    }

    /// Add or replace a style after checking that it can render.
    pub fn insert(&mut self, style: Style) -> Result<(), CatalogError> {
        if style.variants.iter().all(|v| v.weight == 0) {
            return Err(CatalogError::NoVariants(style.id));
        }
        for variant in &style.variants {
            if let Some(slot) = variant
                .template
                .slot_names()
                .find(|slot| !style.slots.contains_key(*slot))
            {
                return Err(CatalogError::UnknownSlot {
                    style: style.id,
                    slot: slot.to_string(),
                });
            }
        }
        self.styles.insert(style.id, style);
        Ok(())
    }

    pub fn get(&self, id: StyleId) -> Option<&Style> {
        self.styles.get(&id)
    }

    pub fn contains(&self, id: StyleId) -> bool {
        self.styles.contains_key(&id)
    }

    /// Style ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = StyleId> + '_ {
        self.styles.keys().copied()
    }

    pub fn styles(&self) -> impl Iterator<Item = &Style> {
        self.styles.values()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    /// Uniform choice among the catalog's styles.
    pub fn random_style<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<StyleId> {
        self.ids().choose(rng)
    }

    /// Check catalog quality. Pass a vocabulary to also flag slot
    /// categories it does not define.
    pub fn lint(&self, vocabulary: Option<&Vocabulary>) -> LintReport {
        let mut report = LintReport::default();

        for style in self.styles() {
            let label = format!("style {} ({})", style.id, style.name);

            if style.variants.iter().all(|v| v.weight == 0) {
                report.errors.push(format!("{}: no selectable variants", label));
            }
            if style.variants.len() < MIN_VARIANTS {
                report.warnings.push(format!(
                    "{}: only {} variants (expected at least {})",
                    label,
                    style.variants.len(),
                    MIN_VARIANTS
                ));
            }

            let mut used = BTreeSet::new();
            let mut seen_templates: Vec<&Template> = Vec::new();
            for (index, variant) in style.variants.iter().enumerate() {
                if !variant.template.has_entity() {
                    report
                        .warnings
                        .push(format!("{}: variant {} does not embed {{entity}}", label, index));
                }
                if variant.weight == 0 {
                    report
                        .warnings
                        .push(format!("{}: variant {} has weight 0", label, index));
                }
                if seen_templates.contains(&&variant.template) {
                    report
                        .warnings
                        .push(format!("{}: variant {} duplicates an earlier variant", label, index));
                } else {
                    seen_templates.push(&variant.template);
                }
                for slot in variant.template.slot_names() {
                    if !style.slots.contains_key(slot) {
                        report.errors.push(format!(
                            "{}: variant {} references undefined slot '{}'",
                            label, index, slot
                        ));
                    }
                    used.insert(slot);
                }
            }

            for (name, source) in &style.slots {
                if !used.contains(name.as_str()) {
                    report
                        .warnings
                        .push(format!("{}: slot '{}' is never used", label, name));
                }
                if source.categories.is_empty() && source.fallback.is_empty() {
                    report.warnings.push(format!(
                        "{}: slot '{}' has no categories and no fallback; it always yields the placeholder",
                        label, name
                    ));
                }
                if let Some(vocabulary) = vocabulary {
                    for category in &source.categories {
                        if !vocabulary.contains_category(category) {
                            report.warnings.push(format!(
                                "{}: slot '{}' category '{}' is not in the vocabulary",
                                label, name, category
                            ));
                        }
                    }
                }
            }
        }

        report
    }
}

/// Findings from [`StyleCatalog::lint`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SMALL: &str = r#"{
        1: Style(
            name: "测试",
            slots: {
                "mood": (categories: ["状态与反应"], fallback: ["平静", ""]),
                "place": (fallback: ["天台"]),
            },
            variants: [
                (weight: 1, text: "{entity}在{place}{mood}"),
                (weight: 0, text: "{entity}从不出现"),
            ],
        ),
    }"#;

    #[test]
    fn parse_small_catalog() {
        let catalog = StyleCatalog::parse_ron(SMALL).unwrap();
        assert_eq!(catalog.len(), 1);
        let style = catalog.get(StyleId(1)).unwrap();
        assert_eq!(style.name, "测试");
        assert_eq!(style.variants.len(), 2);
        assert_eq!(style.slots["mood"].fallback, vec!["平静".to_string()]);
        assert!(style.slots["place"].categories.is_empty());
    }

    #[test]
    fn zero_weight_variant_is_never_chosen() {
        let catalog = StyleCatalog::parse_ron(SMALL).unwrap();
        let style = catalog.get(StyleId(1)).unwrap();
        let vocab = Vocabulary::new();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            assert_eq!(style.render("学姐", &vocab, &mut rng).unwrap(), "学姐在天台平静");
        }
    }

    #[test]
    fn render_prefers_vocabulary_terms() {
        let catalog = StyleCatalog::parse_ron(SMALL).unwrap();
        let style = catalog.get(StyleId(1)).unwrap();
        let vocab = Vocabulary::parse("## 状态与反应\n- 破防了\n");
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(style.render_variant(0, "学姐", &vocab, &mut rng).unwrap(), "学姐在天台破防了");
    }

    #[test]
    fn undefined_slot_is_rejected() {
        let input = r#"{ 2: Style(name: "x", variants: [(weight: 1, text: "{entity}{missing}")]) }"#;
        match StyleCatalog::parse_ron(input) {
            Err(CatalogError::UnknownSlot { style, slot }) => {
                assert_eq!(style, StyleId(2));
                assert_eq!(slot, "missing");
            }
            other => panic!("expected UnknownSlot, got {:?}", other),
        }
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let input = r#"{ 3: Style(name: "x", variants: [(weight: 0, text: "{entity}")]) }"#;
        assert!(matches!(
            StyleCatalog::parse_ron(input),
            Err(CatalogError::NoVariants(StyleId(3)))
        ));
        let input = r#"{ 3: Style(name: "x", variants: []) }"#;
        assert!(matches!(
            StyleCatalog::parse_ron(input),
            Err(CatalogError::NoVariants(StyleId(3)))
        ));
    }

    #[test]
    fn bad_template_names_the_style() {
        let input = r#"{ 4: Style(name: "x", variants: [(text: "{entity")]) }"#;
        let err = StyleCatalog::parse_ron(input).unwrap_err();
        assert!(err.to_string().starts_with("style 4:"), "{}", err);
    }

    #[test]
    fn weight_defaults_to_one() {
        let input = r#"{ 5: Style(name: "x", variants: [(text: "{entity}!")]) }"#;
        let catalog = StyleCatalog::parse_ron(input).unwrap();
        assert_eq!(catalog.get(StyleId(5)).unwrap().variants[0].weight, 1);
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(StyleCatalog::parse_ron("{}"), Err(CatalogError::Empty)));
    }

    #[test]
    fn random_style_covers_all_ids() {
        let catalog = StyleCatalog::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let seen: BTreeSet<StyleId> = (0..500)
            .filter_map(|_| catalog.random_style(&mut rng))
            .collect();
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), catalog.ids().collect::<Vec<_>>());
    }

    #[test]
    fn lint_flags_small_and_unused() {
        let input = r#"{
            1: Style(
                name: "x",
                slots: { "unused": (categories: []), "used": (fallback: ["a"]) },
                variants: [(weight: 1, text: "{used}")],
            ),
        }"#;
        let catalog = StyleCatalog::parse_ron(input).unwrap();
        let report = catalog.lint(None);
        assert!(report.errors.is_empty());
        let joined = report.warnings.join("\n");
        assert!(joined.contains("only 1 variants"));
        assert!(joined.contains("does not embed {entity}"));
        assert!(joined.contains("slot 'unused' is never used"));
        assert!(joined.contains("always yields the placeholder"));
    }

    #[test]
    fn lint_checks_vocabulary_categories() {
        let catalog = StyleCatalog::parse_ron(SMALL).unwrap();
        let report = catalog.lint(Some(&Vocabulary::new()));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("category '状态与反应' is not in the vocabulary")));
    }
}
