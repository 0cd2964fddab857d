/// Catalog integration tests — the built-in catalog and RON catalog files.
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use title_engine::core::catalog::{CatalogError, StyleCatalog};
use title_engine::schema::style::StyleId;
use title_engine::schema::vocabulary::{Vocabulary, UNKNOWN_TERM};

fn fixture_vocabulary() -> Vocabulary {
    let loaded = Vocabulary::load(Path::new("tests/fixtures/name.md"));
    assert!(loaded.warnings.is_empty());
    loaded.value
}

#[test]
fn builtin_catalog_has_seven_styles() {
    let catalog = StyleCatalog::builtin().unwrap();
    let ids: Vec<StyleId> = catalog.ids().collect();
    assert_eq!(ids, (1..=7).map(StyleId).collect::<Vec<_>>());
    for style in catalog.styles() {
        assert!(!style.name.is_empty());
        assert!(style.variants.len() >= 5, "style {} is thin", style.id);
    }
}

#[test]
fn builtin_catalog_lints_clean_against_fixture_vocabulary() {
    let catalog = StyleCatalog::builtin().unwrap();
    let report = catalog.lint(Some(&fixture_vocabulary()));
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn every_builtin_variant_embeds_the_entity() {
    let catalog = StyleCatalog::builtin().unwrap();
    let vocabulary = fixture_vocabulary();
    let mut rng = StdRng::seed_from_u64(42);

    for style in catalog.styles() {
        for index in 0..style.variants.len() {
            let text = style
                .render_variant(index, "测试角色", &vocabulary, &mut rng)
                .unwrap();
            assert!(
                text.contains("测试角色"),
                "style {} variant {}: {}",
                style.id,
                index,
                text
            );
            assert!(!text.contains(UNKNOWN_TERM));
        }
    }
}

#[test]
fn every_builtin_variant_renders_without_vocabulary() {
    let catalog = StyleCatalog::builtin().unwrap();
    let empty = Vocabulary::new();
    let mut rng = StdRng::seed_from_u64(7);

    for style in catalog.styles() {
        for index in 0..style.variants.len() {
            let text = style.render_variant(index, "某某", &empty, &mut rng).unwrap();
            // Every builtin slot carries its own fallback words.
            assert!(!text.contains(UNKNOWN_TERM), "style {}: {}", style.id, text);
        }
    }
}

#[test]
fn slot_terms_come_from_the_vocabulary_when_present() {
    let catalog = StyleCatalog::builtin().unwrap();
    let vocabulary = fixture_vocabulary();
    let places = vocabulary.terms("位置与场景");
    let style = catalog.get(StyleId(6)).unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    // Variant 0: "【快讯】{entity}{time}现身{place}，{action}引发围观"
    for _ in 0..20 {
        let text = style.render_variant(0, "店长", &vocabulary, &mut rng).unwrap();
        assert!(places.iter().any(|p| text.contains(p.as_str())), "{}", text);
    }
}

#[test]
fn custom_catalog_file_loads() {
    let catalog = StyleCatalog::load_from_ron(Path::new("tests/fixtures/catalog.ron")).unwrap();
    assert_eq!(catalog.len(), 2);
    let first = catalog.get(StyleId(1)).unwrap();
    assert_eq!(first.name, "简报");
    assert_eq!(first.variants[0].weight, 3);
    assert_eq!(first.variants[1].weight, 1);

    let mut rng = StdRng::seed_from_u64(1);
    let text = first
        .render_variant(1, "学姐", &Vocabulary::new(), &mut rng)
        .unwrap();
    assert_eq!(text, "{置顶} 学姐");

    let echo = catalog.get(StyleId(2)).unwrap();
    let text = echo.render("学姐", &Vocabulary::new(), &mut rng).unwrap();
    assert_eq!(text, "学姐！学姐！");
}

#[test]
fn catalog_with_undefined_slot_is_rejected() {
    let err = StyleCatalog::load_from_ron(Path::new("tests/fixtures/broken_catalog.ron")).unwrap_err();
    assert!(matches!(err, CatalogError::UnknownSlot { .. }), "{:?}", err);
}

#[test]
fn missing_catalog_file_is_an_io_error() {
    let err = StyleCatalog::load_from_ron(Path::new("tests/fixtures/no_such.ron")).unwrap_err();
    assert!(matches!(err, CatalogError::Io(_)));
}

#[test]
fn older_category_headings_feed_the_same_slots() {
    let catalog = StyleCatalog::builtin().unwrap();
    for style in catalog.styles() {
        for (name, source) in &style.slots {
            let has = |c: &str| source.categories.iter().any(|x| x == c);
            if has("外貌特征") {
                assert!(has("身体部位"), "style {} slot {}", style.id, name);
            }
            if has("结局与反转") {
                assert!(has("高潮与射精"), "style {} slot {}", style.id, name);
            }
        }
    }
}

#[test]
fn vocabulary_with_older_headings_is_used() {
    let catalog = StyleCatalog::builtin().unwrap();
    let vocabulary = Vocabulary::parse("## 身体部位\n- 锁骨标记\n## 高潮与射精\n- 收尾标记\n");
    let mut rng = StdRng::seed_from_u64(99);

    let (mut part_hits, mut result_hits) = (0, 0);
    for style in catalog.styles() {
        for index in 0..style.variants.len() {
            for _ in 0..20 {
                let text = style.render_variant(index, "学姐", &vocabulary, &mut rng).unwrap();
                part_hits += usize::from(text.contains("锁骨标记"));
                result_hits += usize::from(text.contains("收尾标记"));
            }
        }
    }
    assert!(part_hits > 0);
    assert!(result_hits > 0);

    // Style 2 variant 1 ends in `{result}`, which draws from the vocabulary
    // whenever either result category has terms.
    let cyber = catalog.get(StyleId(2)).unwrap();
    let text = cyber.render_variant(1, "学姐", &vocabulary, &mut rng).unwrap();
    assert!(text.contains("收尾标记"), "{}", text);

    let report = catalog.lint(Some(&vocabulary));
    assert!(report
        .warnings
        .iter()
        .all(|w| !w.contains("'身体部位'") && !w.contains("'高潮与射精'")));
}
