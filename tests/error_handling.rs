//! Tests for error classification and failure paths.

use recipe_catalog::{
    CancelToken, Catalog, CatalogConfig, CatalogError, Entity, EntityKind, Filter, Ingredient,
    MemoryCollection, NewIngredient, NewRecipe, PageRequest, Projection, Recipe,
    RequestContext, SearchPolicy, StorageError, UpdateIngredient, UpdateRecipe,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Harness {
    catalog: Catalog,
    recipes: Arc<MemoryCollection>,
    ingredients: Arc<MemoryCollection>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn harness(config: CatalogConfig) -> Harness {
    init_tracing();
    let recipes = Arc::new(
        MemoryCollection::new("recipes").with_text_index(Recipe::TEXT_FIELDS.iter().copied()),
    );
    let ingredients = Arc::new(
        MemoryCollection::new("ingredients").with_text_index(Ingredient::TEXT_FIELDS.iter().copied()),
    );
    let catalog = Catalog::new(config, recipes.clone(), ingredients.clone());
    Harness {
        catalog,
        recipes,
        ingredients,
    }
}

fn default_harness() -> Harness {
    harness(CatalogConfig::default())
}

// --- Invalid Input ---

#[test]
fn test_malformed_id_never_reaches_storage() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let bad = Filter::all().eq("id", "not-an-object-id");

    assert!(h.catalog.recipe(&ctx, &bad).unwrap_err().is_invalid_argument());
    assert!(h.catalog.delete_recipe(&ctx, &bad).unwrap_err().is_invalid_argument());
    let update = UpdateRecipe {
        id: "xyz".to_string(),
        name: "Soup".to_string(),
        ..Default::default()
    };
    assert!(h.catalog.update_recipe(&ctx, update).unwrap_err().is_invalid_argument());
    assert!(h.catalog.ingredient(&ctx, &bad).unwrap_err().is_invalid_argument());

    assert_eq!(h.recipes.call_count(), 0);
    assert_eq!(h.ingredients.call_count(), 0);
}

#[test]
fn test_by_id_str_rejects_wrong_length() {
    let err = Filter::by_id_str("abc123").unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_missing_name_is_invalid() {
    let h = default_harness();
    let ctx = RequestContext::background();

    let err = h.catalog.create_recipe(&ctx, NewRecipe::named("   ")).unwrap_err();
    assert!(err.is_invalid_argument());

    let nested = NewRecipe {
        name: "Soup".to_string(),
        ingredients: vec![NewIngredient::new("", "vegetable", "1")],
        ..Default::default()
    };
    assert!(h.catalog.create_recipe(&ctx, nested).unwrap_err().is_invalid_argument());
    assert_eq!(h.recipes.call_count(), 0);
    assert!(h.catalog.snapshot().is_empty());
}

#[test]
fn test_invalid_element_rejects_whole_bulk() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let inputs = vec![
        NewRecipe::named("Good"),
        NewRecipe::named("!!!"),
        NewRecipe::named("Also Good"),
    ];
    assert!(h.catalog.bulk_create_recipes(&ctx, inputs).unwrap_err().is_invalid_argument());
    assert!(h.recipes.is_empty());
    assert_eq!(h.recipes.call_count(), 0);
}

#[test]
fn test_ingredient_update_without_id() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let update = UpdateIngredient {
        id: None,
        name: "Salt".to_string(),
        ..Default::default()
    };
    assert!(h.catalog.update_ingredient(&ctx, update).unwrap_err().is_invalid_argument());
}

#[test]
fn test_delete_requires_identity() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let err = h
        .catalog
        .delete_recipe(&ctx, &Filter::all().eq("slug", "soup"))
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_unknown_projection_field() {
    let h = default_harness();
    let ctx = RequestContext::background().with_projection(Projection::of(["calories"]));
    let err = h
        .catalog
        .list_recipes(&ctx, &Filter::all(), PageRequest::first(10))
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_blank_search_query() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let err = h.catalog.search(&ctx, "  ", PageRequest::first(10)).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(h.recipes.call_count(), 0);
    assert_eq!(h.ingredients.call_count(), 0);
}

// --- Not Found vs No Documents ---

#[test]
fn test_get_missing_is_not_found() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let err = h
        .catalog
        .recipe(&ctx, &Filter::all().eq("slug", "missing"))
        .unwrap_err();
    match err {
        CatalogError::NotFound { kind, filter } => {
            assert_eq!(kind, EntityKind::Recipe);
            assert!(filter.contains("missing"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn test_update_missing_is_not_found() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let created = h
        .catalog
        .create_ingredient(&ctx, NewIngredient::new("Salt", "mineral", "1 tsp"))
        .unwrap();
    h.catalog
        .delete_ingredient(&ctx, &Filter::by_id(created.id.unwrap()))
        .unwrap();

    let update = UpdateIngredient {
        id: Some(created.id.unwrap().to_hex()),
        name: "Salt".to_string(),
        ..Default::default()
    };
    assert!(h.catalog.update_ingredient(&ctx, update).unwrap_err().is_not_found());
}

#[test]
fn test_empty_list_is_no_documents() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let page = h
        .catalog
        .list_recipes(&ctx, &Filter::all(), PageRequest::first(10))
        .unwrap();
    assert!(page.is_no_documents());
    assert!(page.is_empty());
}

// --- Storage Failures ---

#[test]
fn test_unavailable_storage_is_persistence_error() {
    let h = default_harness();
    let ctx = RequestContext::background();
    h.recipes.set_unavailable(true);

    let err = h
        .catalog
        .list_recipes(&ctx, &Filter::all(), PageRequest::first(10))
        .unwrap_err();
    match err {
        CatalogError::Persistence { kind, source } => {
            assert_eq!(kind, EntityKind::Recipe);
            assert!(matches!(source, StorageError::Unavailable(_)));
        }
        other => panic!("expected Persistence, got {other:?}"),
    }
}

#[test]
fn test_failed_write_leaves_cache_untouched() {
    let h = default_harness();
    let ctx = RequestContext::background();
    let token = CancelToken::new();
    let sub = h.catalog.subscribe(&token);
    sub.recv().unwrap();

    h.recipes.set_unavailable(true);
    assert!(h.catalog.create_recipe(&ctx, NewRecipe::named("Soup")).is_err());
    assert!(h.catalog.snapshot().is_empty());
    assert!(sub.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_slow_storage_times_out() {
    let h = default_harness();
    let ctx = RequestContext::background().with_timeout(Duration::from_millis(50));
    h.recipes.set_latency(Duration::from_millis(300));

    let started = Instant::now();
    let err = h
        .catalog
        .recipe(&ctx, &Filter::all().eq("slug", "soup"))
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_millis(250));
}

#[test]
fn test_operation_budget_bounds_call() {
    let mut config = CatalogConfig::default();
    config.budgets.read = Duration::from_millis(30);
    let h = harness(config);
    h.recipes.set_latency(Duration::from_millis(200));

    let err = h
        .catalog
        .recipe(&RequestContext::background(), &Filter::all())
        .unwrap_err();
    assert!(err.is_timeout());
}

#[test]
fn test_cancelled_context_skips_storage() {
    let h = default_harness();
    let token = CancelToken::new();
    token.cancel();
    let ctx = RequestContext::background().with_cancel(token);

    let err = h.catalog.create_recipe(&ctx, NewRecipe::named("Soup")).unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Persistence {
            source: StorageError::Cancelled { .. },
            ..
        }
    ));
    assert_eq!(h.recipes.call_count(), 0);
}

// --- Combined Search ---

#[test]
fn test_both_legs_failing_is_aggregate() {
    let h = harness(CatalogConfig {
        search_policy: SearchPolicy::Partial,
        ..Default::default()
    });
    h.recipes.set_unavailable(true);
    h.ingredients.set_unavailable(true);

    let err = h
        .catalog
        .search(&RequestContext::background(), "tomato", PageRequest::first(10))
        .unwrap_err();
    match err {
        CatalogError::AggregateSearch {
            recipes,
            ingredients,
        } => {
            assert!(matches!(*recipes, CatalogError::Persistence { kind: EntityKind::Recipe, .. }));
            assert!(matches!(
                *ingredients,
                CatalogError::Persistence {
                    kind: EntityKind::Ingredient,
                    ..
                }
            ));
        }
        other => panic!("expected AggregateSearch, got {other:?}"),
    }
}

#[test]
fn test_single_leg_failure_fails_whole_by_default() {
    let h = default_harness();
    let ctx = RequestContext::background();
    h.catalog
        .create_ingredient(&ctx, NewIngredient::new("Tomato", "vegetable", "1"))
        .unwrap();
    h.recipes.set_unavailable(true);

    let err = h.catalog.search(&ctx, "tomato", PageRequest::first(10)).unwrap_err();
    assert!(matches!(err, CatalogError::Persistence { kind: EntityKind::Recipe, .. }));
}

#[test]
fn test_partial_policy_returns_surviving_leg() {
    let h = harness(CatalogConfig {
        search_policy: SearchPolicy::Partial,
        ..Default::default()
    });
    let ctx = RequestContext::background();
    h.catalog
        .create_ingredient(&ctx, NewIngredient::new("Tomato", "vegetable", "1"))
        .unwrap();
    h.recipes.set_unavailable(true);

    let results = h.catalog.search(&ctx, "tomato", PageRequest::first(10)).unwrap();
    assert!(results.is_partial());
    assert_eq!(results.hits().len(), 1);
    assert_eq!(results.hits()[0].kind(), EntityKind::Ingredient);
    assert_eq!(results.failures.len(), 1);
}

#[test]
fn test_missing_text_index_is_persistence_error() {
    let recipes = Arc::new(MemoryCollection::new("recipes"));
    let ingredients = Arc::new(MemoryCollection::new("ingredients"));
    let catalog = Catalog::new(CatalogConfig::default(), recipes, ingredients);

    let err = catalog
        .recipes()
        .search(&RequestContext::background(), "soup", PageRequest::first(5))
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Persistence {
            source: StorageError::NoTextIndex(_),
            ..
        }
    ));
}
