use super::*;
use crate::test_utils::{insert_card, setup_test_db};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Filling a column keeps existing values and fills exactly the blanks up to the limit
    #[test]
    fn prop_fill_missing_respects_existing_cells(
        prefilled in prop::collection::vec(any::<bool>(), 1..12),
        limit in prop::option::of(0usize..15),
    ) {
        let pool = setup_test_db();
        for (n, has_value) in prefilled.iter().enumerate() {
            let id = format!("Card_{:06}", n + 1);
            if *has_value {
                insert_card(&pool, &id, &[(CardField::Theme, "Existing")]);
            } else {
                insert_card(&pool, &id, &[]);
            }
        }

        let blanks = prefilled.iter().filter(|v| !**v).count();
        let expected = limit.map_or(blanks, |limit| limit.min(blanks));

        let filled = fill_missing(&pool, CardField::Theme, limit, |_| Some("Filled".to_string())).unwrap();
        prop_assert_eq!(filled, expected);

        let cards = list_cards(&pool).unwrap();
        for (card, has_value) in cards.iter().zip(prefilled.iter()) {
            if *has_value {
                prop_assert_eq!(card.get(CardField::Theme), Some("Existing"));
            }
        }

        let remaining = card_ids_missing(&pool, CardField::Theme, None).unwrap();
        prop_assert_eq!(remaining.len(), blanks - expected);
    }
}
