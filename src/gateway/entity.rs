//! What the gateway needs to know about an entity kind.

use crate::error::{CatalogError, Result};
use crate::gateway::Assembler;
use crate::slug::slugify;
use crate::storage::parse_identity;
use crate::types::{
    EntityKind, Ingredient, NewIngredient, NewRecipe, ObjectId, Recipe, UpdateIngredient,
    UpdateRecipe,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity kind served by a [`Gateway`](crate::Gateway).
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Creation input.
    type New: Send + Sync;
    /// Update input; carries the target identity.
    type Update: Send + Sync;

    const KIND: EntityKind;
    /// Top-level fields a projection may name.
    const FIELDS: &'static [&'static str];
    /// Dotted paths covered by the text index.
    const TEXT_FIELDS: &'static [&'static str];

    fn set_id(&mut self, id: ObjectId);
    fn name(&self) -> &str;
    fn slug(&self) -> &str;

    /// Validate creation input and derive slugs.
    fn build(input: Self::New, assembler: &Assembler) -> Result<Self>;

    /// Validate update input, parse its identity and re-derive slugs.
    fn rebuild(input: Self::Update, assembler: &Assembler) -> Result<(ObjectId, Self)>;
}

/// Trimmed name and its slug; rejects names with nothing to slug.
fn named(kind: EntityKind, name: &str) -> Result<(String, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::invalid(format!("{kind} name is required")));
    }
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(CatalogError::invalid(format!(
            "{kind} name {name:?} has no characters to derive a slug from"
        )));
    }
    Ok((name.to_string(), slug))
}

fn ingredient(id: Option<ObjectId>, name: &str, kind: &str, quantity: &str) -> Result<Ingredient> {
    let (name, slug) = named(EntityKind::Ingredient, name)?;
    Ok(Ingredient {
        id,
        name,
        slug,
        kind: kind.to_string(),
        quantity: quantity.to_string(),
    })
}

impl Entity for Recipe {
    type New = NewRecipe;
    type Update = UpdateRecipe;

    const KIND: EntityKind = EntityKind::Recipe;
    const FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "slug",
        "timers",
        "steps",
        "imageURL",
        "originalURL",
        "ingredients",
    ];
    const TEXT_FIELDS: &'static [&'static str] =
        &["name", "steps", "ingredients.name", "ingredients.type"];

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn build(input: NewRecipe, assembler: &Assembler) -> Result<Self> {
        let (name, slug) = named(EntityKind::Recipe, &input.name)?;
        // Embedded ingredients get their own identity; there is no back-reference.
        let ingredients = assembler.try_map_ordered(&input.ingredients, |i: &NewIngredient| {
            ingredient(Some(ObjectId::generate()), &i.name, &i.kind, &i.quantity)
        })?;

        Ok(Recipe {
            id: None,
            name,
            slug,
            timers: assembler.map_ordered(&input.timers, String::clone),
            steps: assembler.map_ordered(&input.steps, String::clone),
            image_url: input.image_url,
            original_url: input.original_url,
            ingredients,
        })
    }

    fn rebuild(input: UpdateRecipe, assembler: &Assembler) -> Result<(ObjectId, Self)> {
        let id = parse_identity(&input.id)?;
        let (name, slug) = named(EntityKind::Recipe, &input.name)?;
        let ingredients = assembler.try_map_ordered(&input.ingredients, |i: &UpdateIngredient| {
            let id = match i.id.as_deref() {
                Some(raw) => parse_identity(raw)?,
                None => ObjectId::generate(),
            };
            ingredient(Some(id), &i.name, &i.kind, &i.quantity)
        })?;

        let recipe = Recipe {
            id: Some(id),
            name,
            slug,
            timers: assembler.map_ordered(&input.timers, String::clone),
            steps: assembler.map_ordered(&input.steps, String::clone),
            image_url: input.image_url,
            original_url: input.original_url,
            ingredients,
        };
        Ok((id, recipe))
    }
}

impl Entity for Ingredient {
    type New = NewIngredient;
    type Update = UpdateIngredient;

    const KIND: EntityKind = EntityKind::Ingredient;
    const FIELDS: &'static [&'static str] = &["id", "name", "slug", "type", "quantity"];
    const TEXT_FIELDS: &'static [&'static str] = &["name", "type"];

    fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn build(input: NewIngredient, _assembler: &Assembler) -> Result<Self> {
        ingredient(None, &input.name, &input.kind, &input.quantity)
    }

    fn rebuild(input: UpdateIngredient, _assembler: &Assembler) -> Result<(ObjectId, Self)> {
        let raw = input
            .id
            .as_deref()
            .ok_or_else(|| CatalogError::invalid("ingredient update requires an id"))?;
        let id = parse_identity(raw)?;
        let ingredient = ingredient(Some(id), &input.name, &input.kind, &input.quantity)?;
        Ok((id, ingredient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_build_derives_slugs() {
        let input = NewRecipe {
            name: "  Tomato Soup ".to_string(),
            steps: vec!["boil".to_string(), "blend".to_string()],
            ingredients: vec![NewIngredient::new("Tomato", "vegetable", "2")],
            ..Default::default()
        };
        let recipe = Recipe::build(input, &Assembler::default()).unwrap();
        assert_eq!(recipe.name, "Tomato Soup");
        assert_eq!(recipe.slug, "tomato-soup");
        assert_eq!(recipe.ingredients[0].slug, "tomato");
        assert!(recipe.ingredients[0].id.is_some());
        assert!(recipe.id.is_none());
    }

    #[test]
    fn test_blank_names_are_rejected() {
        let err = Recipe::build(NewRecipe::named("   "), &Assembler::default()).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = Ingredient::build(NewIngredient::new("?!", "x", "1"), &Assembler::default())
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_embedded_ingredient_name_is_validated() {
        let input = NewRecipe {
            name: "Soup".to_string(),
            ingredients: vec![NewIngredient::new("", "x", "1")],
            ..Default::default()
        };
        assert!(Recipe::build(input, &Assembler::default())
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_rebuild_parses_identity() {
        let id = ObjectId::generate();
        let update = UpdateRecipe {
            id: id.to_hex(),
            name: "Pea Soup".to_string(),
            ingredients: vec![UpdateIngredient {
                id: None,
                name: "Pea".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let (parsed, recipe) = Recipe::rebuild(update, &Assembler::default()).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(recipe.slug, "pea-soup");
        assert!(recipe.ingredients[0].id.is_some());

        let bad = UpdateRecipe {
            id: "xyz".to_string(),
            name: "Soup".to_string(),
            ..Default::default()
        };
        assert!(Recipe::rebuild(bad, &Assembler::default())
            .unwrap_err()
            .is_invalid_argument());
    }

    #[test]
    fn test_ingredient_update_requires_id() {
        let update = UpdateIngredient {
            id: None,
            name: "Salt".to_string(),
            ..Default::default()
        };
        assert!(Ingredient::rebuild(update, &Assembler::default())
            .unwrap_err()
            .is_invalid_argument());
    }
}
