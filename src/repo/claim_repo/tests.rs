use super::*;
use crate::test_utils::setup_test_db;

#[test]
fn test_create_and_list_claims() {
    let pool = setup_test_db();

    let first = create_claim(&pool, "Alice@Example.com", "https://nakama.weforks.org/card/k1").unwrap();
    let second = create_claim(&pool, "bob@example.com", "https://nakama.weforks.org/card/k2").unwrap();

    assert_eq!(first.get_email(), "alice@example.com");

    let claims = list_claims(&pool).unwrap();
    assert_eq!(claims.len(), 2);
    assert!(claims.iter().any(|c| c.get_id() == first.get_id()));
    assert!(claims.iter().any(|c| c.get_id() == second.get_id()));
}

#[test]
fn test_create_claim_requires_email_and_url() {
    let pool = setup_test_db();

    assert!(create_claim(&pool, "", "https://host/card/k").is_err());
    assert!(create_claim(&pool, "a@b.c", "  ").is_err());
    assert!(list_claims(&pool).unwrap().is_empty());
}

#[test]
fn test_delete_claim() {
    let pool = setup_test_db();
    let claim = create_claim(&pool, "a@b.c", "https://host/card/k").unwrap();

    assert!(delete_claim(&pool, &claim.get_id()).unwrap());
    assert!(!delete_claim(&pool, &claim.get_id()).unwrap());
    assert!(list_claims(&pool).unwrap().is_empty());
}
