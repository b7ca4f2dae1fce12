use super::*;
use serde_json::json;

fn remote(id: &str, key: Option<Value>) -> AirtableRecord {
    let mut fields = Map::new();
    if let Some(key) = key {
        fields.insert("CARD_ID".to_string(), key);
    }
    AirtableRecord { id: id.to_string(), fields }
}

fn local(ids: &[&str]) -> TableSnapshot {
    TableSnapshot {
        columns: vec!["CARD_ID".to_string(), "CARD_NAME".to_string()],
        records: ids
            .iter()
            .map(|id| {
                BTreeMap::from([
                    ("CARD_ID".to_string(), id.to_string()),
                    ("CARD_NAME".to_string(), String::new()),
                ])
            })
            .collect(),
    }
}

#[test]
fn test_record_key() {
    assert_eq!(remote("r1", Some(json!(" Card_000001 "))).key("CARD_ID"), Some("Card_000001".to_string()));
    assert_eq!(remote("r2", Some(json!(""))).key("CARD_ID"), None);
    assert_eq!(remote("r3", Some(json!(null))).key("CARD_ID"), None);
    assert_eq!(remote("r4", None).key("CARD_ID"), None);
    assert_eq!(remote("r5", Some(json!(12))).key("CARD_ID"), Some("12".to_string()));
}

#[test]
fn test_plan_deletes_unknown_and_duplicate_keys() {
    let remote = vec![
        remote("r1", Some(json!("Card_000001"))),
        remote("r2", Some(json!("Card_000099"))),
        remote("r3", Some(json!("Card_000001"))),
    ];

    let plan = plan_sync(&remote, &local(&["Card_000001"]));

    assert_eq!(plan.deletes, vec!["r2", "r3"]);
    assert!(plan.updates.is_empty());
    assert!(plan.creates.is_empty());
}

#[test]
fn test_plan_fills_blank_records_before_creating() {
    let remote = vec![
        remote("blank1", None),
        remote("r1", Some(json!("Card_000001"))),
        remote("blank2", Some(json!(""))),
    ];

    let plan = plan_sync(&remote, &local(&["Card_000001", "Card_000002", "Card_000003", "Card_000004"]));

    assert!(plan.deletes.is_empty());
    let updated: Vec<(&str, &str)> = plan
        .updates
        .iter()
        .map(|(id, fields)| (id.as_str(), fields["CARD_ID"].as_str()))
        .collect();
    assert_eq!(updated, vec![("blank1", "Card_000002"), ("blank2", "Card_000003")]);

    assert_eq!(plan.creates.len(), 1);
    assert_eq!(plan.creates[0]["CARD_ID"], "Card_000004");
    // Empty cells are not sent
    assert!(!plan.creates[0].contains_key("CARD_NAME"));
}

#[test]
fn test_plan_leaves_out_local_only_columns() {
    let snapshot = TableSnapshot {
        columns: vec!["CARD_ID".to_string(), "CARD_OWNER".to_string(), "IMAGE_FILENAME".to_string()],
        records: vec![BTreeMap::from([
            ("CARD_ID".to_string(), "Card_000001".to_string()),
            ("CARD_OWNER".to_string(), "SYSTEM".to_string()),
            ("IMAGE_FILENAME".to_string(), "Card_000001.png".to_string()),
        ])],
    };

    let plan = plan_sync(&[remote("blank", None)], &snapshot);
    let (_, fields) = &plan.updates[0];
    assert_eq!(fields["CARD_OWNER"], "SYSTEM");
    assert!(!fields.contains_key("IMAGE_FILENAME"));

    let plan = plan_sync(&[], &snapshot);
    assert_eq!(plan.creates[0].keys().collect::<Vec<_>>(), vec!["CARD_ID", "CARD_OWNER"]);
}

#[test]
fn test_plan_for_identical_tables_is_empty() {
    let remote = vec![remote("r1", Some(json!("Card_000001")))];
    let plan = plan_sync(&remote, &local(&["Card_000001"]));
    assert_eq!(plan, SyncPlan::default());
}

#[test]
fn test_write_body_shape() {
    let fields = BTreeMap::from([("CARD_ID".to_string(), "Card_000001".to_string())]);
    let body = WriteBody {
        records: vec![
            RecordWrite { id: Some("rec1"), fields: &fields },
            RecordWrite { id: None, fields: &fields },
        ],
    };

    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["records"][0]["id"], "rec1");
    assert_eq!(json["records"][0]["fields"]["CARD_ID"], "Card_000001");
    assert!(json["records"][1].get("id").is_none());
}
