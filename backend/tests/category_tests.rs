//! Category and subcategory rule tests
//!
//! - only allowed category/subcategory pairs are accepted
//! - BOM lines must match the food's pair
//! - sales take normal foods, tokens take hazrati foods

use proptest::prelude::*;
use shared::{
    validate_bom_line, validate_category_pair, validate_issuance_food, Category, CategoryPair,
    IssuanceKind, RuleViolation, Subcategory,
};

fn pair(category: Category, subcategory: Subcategory) -> CategoryPair {
    CategoryPair::new(category, subcategory).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test that hazrati/staff is rejected and hazrati/needy accepted
    #[test]
    fn test_ingredient_category_pairs() {
        let err = validate_category_pair(Category::Hazrati, Subcategory::Staff).unwrap_err();
        assert_eq!(
            err,
            RuleViolation::SubcategoryNotAllowed {
                category: Category::Hazrati,
                subcategory: Subcategory::Staff,
            }
        );

        let ok = validate_category_pair(Category::Hazrati, Subcategory::Needy).unwrap();
        assert_eq!(ok.category, Category::Hazrati);
        assert_eq!(ok.subcategory, Subcategory::Needy);
    }

    /// Test a hazrati/needy ingredient cannot join a normal/staff food
    #[test]
    fn test_bom_category_mismatch() {
        let err = validate_bom_line(
            "Lentils",
            pair(Category::Hazrati, Subcategory::Needy),
            pair(Category::Normal, Subcategory::Staff),
            200,
        )
        .unwrap_err();

        match err {
            RuleViolation::CategoryMismatch {
                ingredient,
                expected,
                ..
            } => {
                assert_eq!(ingredient, "Lentils");
                assert_eq!(expected, pair(Category::Normal, Subcategory::Staff));
            }
            other => panic!("expected a category mismatch, got {:?}", other),
        }
    }

    /// Test a matching BOM line passes and a negative amount does not
    #[test]
    fn test_bom_line_amounts() {
        let staff = pair(Category::Normal, Subcategory::Staff);
        assert!(validate_bom_line("Rice", staff, staff, 200).is_ok());
        assert!(validate_bom_line("Rice", staff, staff, 0).is_ok());
        assert!(matches!(
            validate_bom_line("Rice", staff, staff, -1),
            Err(RuleViolation::Negative { .. })
        ));
    }

    /// Test same category but different subcategory is still a mismatch
    #[test]
    fn test_bom_subcategory_mismatch() {
        let result = validate_bom_line(
            "Bread",
            pair(Category::Normal, Subcategory::Guest),
            pair(Category::Normal, Subcategory::Staff),
            1,
        );
        assert!(matches!(result, Err(RuleViolation::CategoryMismatch { .. })));
    }

    /// Test the issuance gate for sales and tokens
    #[test]
    fn test_issuance_category_gate() {
        let staff_food = pair(Category::Normal, Subcategory::Staff);
        let needy_food = pair(Category::Hazrati, Subcategory::Needy);

        assert!(validate_issuance_food(IssuanceKind::Sale, Subcategory::Staff, "Kebab", staff_food).is_ok());
        assert!(validate_issuance_food(IssuanceKind::Token, Subcategory::Needy, "Soup", needy_food).is_ok());

        assert!(matches!(
            validate_issuance_food(IssuanceKind::Sale, Subcategory::Needy, "Soup", needy_food),
            Err(RuleViolation::WrongIssuanceCategory { .. })
        ));
        assert!(matches!(
            validate_issuance_food(IssuanceKind::Token, Subcategory::Staff, "Kebab", staff_food),
            Err(RuleViolation::WrongIssuanceCategory { .. })
        ));
        assert!(matches!(
            validate_issuance_food(IssuanceKind::Sale, Subcategory::Guest, "Kebab", staff_food),
            Err(RuleViolation::SubcategoryMismatch { .. })
        ));
    }

    /// Test every subcategory belongs to exactly one category
    #[test]
    fn test_category_table() {
        for subcategory in Subcategory::ALL {
            let owners: Vec<_> = Category::ALL
                .into_iter()
                .filter(|category| category.allows(subcategory))
                .collect();
            assert_eq!(owners, vec![subcategory.category()]);
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn category_strategy() -> impl Strategy<Value = Category> {
        prop_oneof![Just(Category::Normal), Just(Category::Hazrati)]
    }

    fn subcategory_strategy() -> impl Strategy<Value = Subcategory> {
        prop_oneof![
            Just(Subcategory::Staff),
            Just(Subcategory::Guest),
            Just(Subcategory::Needy),
            Just(Subcategory::Pilgrim),
        ]
    }

    proptest! {
        /// A pair validates exactly when the subcategory's owner is the category
        #[test]
        fn prop_pair_validation(category in category_strategy(), subcategory in subcategory_strategy()) {
            let valid = validate_category_pair(category, subcategory).is_ok();
            prop_assert_eq!(valid, subcategory.category() == category);
        }

        /// BOM lines validate exactly when both pairs are equal
        #[test]
        fn prop_bom_requires_equal_pairs(
            a in subcategory_strategy(),
            b in subcategory_strategy(),
            amount in 0i32..10_000,
        ) {
            let ingredient = pair(a.category(), a);
            let food = pair(b.category(), b);
            prop_assert_eq!(validate_bom_line("x", ingredient, food, amount).is_ok(), a == b);
        }
    }
}
