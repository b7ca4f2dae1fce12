use super::*;

#[test]
fn test_card_view_uses_external_headers() {
    let mut card = Card::new("Card_000007".to_string());
    card.set(CardField::Name, Some("Vault of Eternity".to_string()));
    card.set(CardField::UsdAmount, Some("0.50, 1.25".to_string()));
    card.set(CardField::Status, Some("STATUS_1".to_string()));

    let view = CardView::new(&card, "/card_image/Card_000007.png".to_string());
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(json["url"], "/card_image/Card_000007.png");
    assert_eq!(json["CARD_ID"], "Card_000007");
    assert_eq!(json["CARD_NAME"], "Vault of Eternity");
    assert_eq!(json["USD_AMMOUNT"], "0.50, 1.25");
    assert_eq!(json["status"], "STATUS_1");
    assert_eq!(json["CARD_CHAIN"], "");
}

#[test]
fn test_login_form_from_urlencoded() {
    let form: LoginForm = serde_html_form::from_str("username=admin&password=p%40ss").unwrap();
    assert_eq!(form.username, "admin");
    assert_eq!(form.password, "p@ss");
}

#[test]
fn test_google_login_query_defaults() {
    let query: GoogleLoginQuery = serde_html_form::from_str("").unwrap();
    assert!(query.next.is_none());

    let query: GoogleLoginQuery = serde_html_form::from_str("next=add_card_owner").unwrap();
    assert_eq!(query.next.as_deref(), Some("add_card_owner"));
}

#[test]
fn test_pipeline_response_shapes() {
    let ok = serde_json::to_value(PipelineRunResponse::success(PipelineReport::default())).unwrap();
    assert_eq!(ok["status"], "success");
    assert!(ok.get("message").is_none());
    assert!(ok["report"]["steps"].is_array());

    let err = serde_json::to_value(PipelineRunResponse::error("Unauthorized", None)).unwrap();
    assert_eq!(err["status"], "error");
    assert_eq!(err["message"], "Unauthorized");
    assert!(err.get("report").is_none());
}
