use axum::http::{header, StatusCode};
use nakama::models::{CardField, Role, SYSTEM_OWNER};
use std::fs;

mod common;
use common::*;

#[tokio::test]
async fn test_api_cards_requires_session() {
    let test = create_test_app();

    let response = send(&test.app, get("/api/cards", &Cookies::default())).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_cards_lists_owned_cards_with_images() {
    let test = create_test_app();
    add_user(&test.state, "bob@example.com", "right", Role::User);

    let cards_folder = &test.state.config.cards_folder;
    fs::create_dir_all(cards_folder).unwrap();
    fs::write(cards_folder.join("Card_000001.png"), b"png").unwrap();
    fs::write(cards_folder.join("dragon.jpg"), b"jpg").unwrap();

    add_card(
        &test.state,
        "Card_000001",
        &[(CardField::Owner, "bob@example.com"), (CardField::Name, "Crown of Ash")],
    );
    add_card(
        &test.state,
        "Card_000002",
        &[(CardField::Owner, "Bob@Example.com"), (CardField::ImageFilename, "dragon.jpg")],
    );
    // No image file yet
    add_card(&test.state, "Card_000003", &[(CardField::Owner, "bob@example.com")]);
    // Somebody else's
    add_card(&test.state, "Card_000004", &[(CardField::Owner, SYSTEM_OWNER)]);

    let cookies = login(&test.app, "bob@example.com", "right").await;
    let response = send(&test.app, get("/api/cards", &cookies)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cards = body_json(response).await;
    let cards = cards.as_array().unwrap();
    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0]["CARD_ID"], "Card_000001");
    assert_eq!(cards[0]["url"], "/card_image/Card_000001.png");
    assert_eq!(cards[0]["CARD_NAME"], "Crown of Ash");
    assert_eq!(cards[1]["url"], "/card_image/dragon.jpg");

    // The image itself is served
    let response = send(&test.app, get("/card_image/dragon.jpg", &cookies)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "jpg");
}

#[tokio::test]
async fn test_get_users_is_admin_only() {
    let test = create_test_app();
    add_user(&test.state, "admin", "secret", Role::Admin);
    add_user(&test.state, "bob@example.com", "right", Role::User);
    add_card(&test.state, "Card_000001", &[(CardField::Owner, SYSTEM_OWNER)]);

    let response = send(&test.app, get("/get_users", &Cookies::default())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bob = login(&test.app, "bob@example.com", "right").await;
    let response = send(&test.app, get("/get_users", &bob)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = login(&test.app, "admin", "secret").await;
    let response = send(&test.app, get("/get_users", &admin)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let table = body_json(response).await;
    assert_eq!(table["columns"][0], "CARD_ID");
    assert_eq!(table["records"][0]["CARD_ID"], "Card_000001");
    assert_eq!(table["records"][0]["CARD_OWNER"], SYSTEM_OWNER);
}

#[tokio::test]
async fn test_stream_is_event_stream_for_admins() {
    let test = create_test_app();
    add_user(&test.state, "admin", "secret", Role::Admin);
    add_user(&test.state, "bob@example.com", "right", Role::User);

    let bob = login(&test.app, "bob@example.com", "right").await;
    let response = send(&test.app, get("/stream", &bob)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = login(&test.app, "admin", "secret").await;
    let response = send(&test.app, get("/stream", &admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
}

#[tokio::test]
async fn test_unknown_card_key_is_404() {
    let test = create_test_app();
    add_card(
        &test.state,
        "Card_000001",
        &[(CardField::Owner, SYSTEM_OWNER), (CardField::CardUrl, "https://cards.example.com/card/abc")],
    );

    let response = send(&test.app, get("/card/other", &Cookies::default())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&test.app, get("/card/abc", &Cookies::default())).await;
    assert_eq!(response.status(), StatusCode::OK);
}
