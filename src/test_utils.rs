use crate::db;
use crate::models::{Card, CardField};
use crate::repo;
use proptest::prelude::*;
use std::sync::Arc;

/// Sets up a test database with migrations applied
///
/// ### Returns
///
/// An Arc-wrapped database connection pool connected to a fresh in-memory database
pub fn setup_test_db() -> Arc<db::DbPool> {
    // Plain ":memory:" gives each pooled connection its own database, so use a
    // unique shared-cache URI per test instead.
    let unique_id = uuid::Uuid::new_v4();
    let database_url = format!("file:test_{}?mode=memory&cache=shared", unique_id);
    let pool = db::init_pool(&database_url).expect("Failed to create pool");

    let mut conn = pool.get().expect("Failed to get connection");
    db::run_migrations(&mut conn).expect("Failed to run migrations");

    Arc::new(pool)
}

/// Inserts a card with the given non-blank fields
pub fn insert_card(pool: &db::DbPool, card_id: &str, fields: &[(CardField, &str)]) -> Card {
    let mut card = Card::new(card_id.to_string());
    for (field, value) in fields {
        card.set(*field, Some(value.to_string()));
    }
    repo::upsert_card(pool, &card).expect("Failed to insert card");
    card
}

/// Generates strings with surrounding whitespace, mixed case and unicode
pub fn arb_messy_string() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_./-]{0,24}",
        " {0,3}[a-zA-Z0-9@.]{1,16} {0,3}",
        "\\PC{0,16}",
    ]
}

/// Generates a syntactically valid card id
pub fn arb_card_id() -> impl Strategy<Value = String> {
    (1u32..=999_999).prop_map(|n| format!("Card_{:06}", n))
}

/// Generates an upper-case ticker symbol list
pub fn arb_symbols() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[A-Z]{2,5}", 0..30).prop_map(|s| s.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::prelude::*;
    use diesel::sql_types::Text;
    use diesel::QueryableByName;

    #[derive(QueryableByName, Debug)]
    struct TableName {
        #[diesel(sql_type = Text)]
        name: String,
    }

    #[test]
    fn test_setup_test_db_creates_tables() {
        let pool = setup_test_db();
        let mut conn = pool.get().unwrap();

        let tables: Vec<TableName> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
        )
        .load(&mut conn)
        .unwrap();
        let names: Vec<String> = tables.into_iter().map(|t| t.name).collect();

        for expected in ["cards", "ownership_claims", "users"] {
            assert!(names.iter().any(|n| n == expected), "missing table {}", expected);
        }
    }

    #[test]
    fn test_databases_are_isolated() {
        let first = setup_test_db();
        let second = setup_test_db();

        insert_card(&first, "Card_000001", &[]);

        assert_eq!(repo::list_cards(&first).unwrap().len(), 1);
        assert!(repo::list_cards(&second).unwrap().is_empty());
    }
}
