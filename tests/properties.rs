//! Property tests for slugs and identity validation.

use proptest::prelude::*;
use recipe_catalog::{
    slugify, Catalog, CatalogConfig, Filter, MemoryCollection, NewRecipe, ObjectId,
    RequestContext,
};
use std::sync::Arc;

proptest! {
    #[test]
    fn test_slugify_is_idempotent(name in "[a-zA-Z0-9 '&!.,éÜß-]{0,40}") {
        let once = slugify(&name);
        prop_assert_eq!(slugify(&once), once.clone());
        prop_assert!(!once.starts_with('-'));
        prop_assert!(!once.ends_with('-'));
        prop_assert!(!once.contains("--"));
    }

    #[test]
    fn test_created_slug_matches_slugify(name in "[A-Za-z][A-Za-z0-9 ']{0,30}") {
        let catalog = Catalog::in_memory(CatalogConfig::default());
        let created = catalog
            .create_recipe(&RequestContext::background(), NewRecipe::named(name.clone()))
            .unwrap();
        prop_assert_eq!(created.slug, slugify(&name));
    }

    #[test]
    fn test_malformed_ids_never_reach_storage(
        raw in "[0-9a-f]{0,23}|[0-9a-f]{25,30}|[g-z][0-9a-f]{23}"
    ) {
        let recipes = Arc::new(MemoryCollection::new("recipes"));
        let ingredients = Arc::new(MemoryCollection::new("ingredients"));
        let catalog = Catalog::new(CatalogConfig::default(), recipes.clone(), ingredients);
        let ctx = RequestContext::background();
        let filter = Filter::all().eq("id", raw.as_str());

        prop_assert!(catalog.recipe(&ctx, &filter).unwrap_err().is_invalid_argument());
        prop_assert!(catalog.delete_recipe(&ctx, &filter).unwrap_err().is_invalid_argument());
        prop_assert_eq!(recipes.call_count(), 0);
    }

    #[test]
    fn test_object_id_hex_is_case_insensitive(bytes in any::<[u8; 12]>()) {
        let id = ObjectId::from_bytes(bytes);
        prop_assert_eq!(ObjectId::from_hex(&id.to_hex().to_uppercase()).unwrap(), id);
    }
}
