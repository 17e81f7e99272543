use std::collections::{BTreeMap, BTreeSet};

use crate::{
    constants::SHOPPING_LIST_HEADER,
    schema::{CartEntry, RecipePart, Uuid},
};

/// Read access to the ingredient lines of a set of recipes.
pub trait IngredientLineSource {
    fn ingredient_lines(&self, recipe_ids: &BTreeSet<Uuid>) -> Vec<RecipePart>;
}

impl IngredientLineSource for [RecipePart] {
    fn ingredient_lines(&self, recipe_ids: &BTreeSet<Uuid>) -> Vec<RecipePart> {
        self.iter()
            .filter(|line| recipe_ids.contains(&line.recipe_id))
            .cloned()
            .collect()
    }
}

impl IngredientLineSource for Vec<RecipePart> {
    fn ingredient_lines(&self, recipe_ids: &BTreeSet<Uuid>) -> Vec<RecipePart> {
        self.as_slice().ingredient_lines(recipe_ids)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

impl ShoppingItem {
    pub fn to_line(&self) -> String {
        format!("* {} — {} {}", self.name, self.total, self.measurement_unit)
    }
}

pub fn cart_recipe_ids(cart: &[CartEntry]) -> BTreeSet<Uuid> {
    cart.iter().map(|entry| entry.recipe_id).collect()
}

/// Sums amounts per (name, unit), ordered by name and then unit.
pub fn aggregate(lines: &[RecipePart]) -> Vec<ShoppingItem> {
    let mut totals: BTreeMap<(&str, &str), i64> = BTreeMap::new();

    lines.iter().for_each(|line| {
        *totals
            .entry((line.name.as_str(), line.measurement_unit.as_str()))
            .or_insert(0) += i64::from(line.amount);
    });

    totals
        .into_iter()
        .map(|((name, unit), total)| ShoppingItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total,
        })
        .collect()
}

pub fn render(items: &[ShoppingItem]) -> String {
    let mut lines = vec![SHOPPING_LIST_HEADER.to_string()];
    lines.extend(items.iter().map(ShoppingItem::to_line));
    lines.join("\n")
}

pub fn build_shopping_list<S>(cart: &[CartEntry], source: &S) -> String
where
    S: IngredientLineSource + ?Sized,
{
    let recipe_ids = cart_recipe_ids(cart);
    if recipe_ids.is_empty() {
        return render(&[]);
    }

    let lines = source.ingredient_lines(&recipe_ids);
    let items = aggregate(&lines);
    log::debug!(
        "Shopping list: {} recipes, {} lines, {} items",
        recipe_ids.len(),
        lines.len(),
        items.len()
    );

    render(&items)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(recipe_id: Uuid, ingredient_id: Uuid, name: &str, unit: &str, amount: i32) -> RecipePart {
        RecipePart {
            recipe_id,
            ingredient_id,
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            amount,
        }
    }

    fn cart(recipe_ids: &[Uuid]) -> Vec<CartEntry> {
        recipe_ids
            .iter()
            .map(|recipe_id| CartEntry {
                user_id: 1,
                recipe_id: *recipe_id,
            })
            .collect()
    }

    #[test]
    fn shared_ingredient_is_summed() {
        let lines = vec![line(1, 10, "Salt", "g", 5), line(2, 10, "Salt", "g", 10)];

        let list = build_shopping_list(&cart(&[1, 2]), &lines);

        let salt: Vec<&str> = list.lines().filter(|l| l.contains("Salt")).collect();
        assert_eq!(salt, vec!["* Salt — 15 g"]);
    }

    #[test]
    fn empty_cart_is_header_only() {
        let lines = vec![line(1, 10, "Salt", "g", 5)];

        assert_eq!(build_shopping_list(&[], &lines), SHOPPING_LIST_HEADER);
    }

    #[test]
    fn distinct_ingredients_and_units_stay_apart() {
        let lines = vec![
            line(1, 10, "Sugar", "g", 100),
            line(1, 11, "Milk", "ml", 200),
            line(2, 12, "Sugar", "tbsp", 2),
            line(2, 11, "Milk", "ml", 50),
        ];

        let list = build_shopping_list(&cart(&[1, 2]), &lines);

        assert_eq!(
            list,
            "Shopping list:\n* Milk — 250 ml\n* Sugar — 100 g\n* Sugar — 2 tbsp"
        );
    }

    #[test]
    fn lines_outside_the_cart_are_ignored() {
        let lines = vec![line(1, 10, "Salt", "g", 5), line(3, 10, "Salt", "g", 700)];

        let list = build_shopping_list(&cart(&[1, 99]), &lines);

        assert_eq!(list, "Shopping list:\n* Salt — 5 g");
    }

    #[test]
    fn items_are_sorted_by_name() {
        let lines = vec![
            line(1, 1, "eggs", "pcs", 2),
            line(1, 2, "Butter", "g", 50),
            line(1, 3, "Apples", "pcs", 3),
        ];

        let names: Vec<String> = aggregate(&lines).into_iter().map(|i| i.name).collect();

        assert_eq!(names, vec!["Apples", "Butter", "eggs"]);
    }

    #[test]
    fn duplicate_cart_entries_count_once() {
        let lines = vec![line(1, 10, "Flour", "g", 300)];

        let list = build_shopping_list(&cart(&[1, 1]), &lines);

        assert_eq!(list, "Shopping list:\n* Flour — 300 g");
    }

    #[test]
    fn large_totals_do_not_overflow_i32() {
        let lines: Vec<RecipePart> = (0..100_000)
            .map(|recipe_id| line(recipe_id, 1, "Water", "ml", 32000))
            .collect();
        let entries = cart(&(0..100_000).collect::<Vec<Uuid>>());

        let list = build_shopping_list(&entries, lines.as_slice());

        assert!(list.ends_with("* Water — 3200000000 ml"));
    }
}
