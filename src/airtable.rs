use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument, warn};

use crate::config::AirtableSettings;
use crate::dto::TableSnapshot;
use crate::models::CardField;

/// Airtable accepts at most this many records per write request
pub const BATCH_SIZE: usize = 10;
const PAGE_SIZE: u32 = 100;

/// One record as returned by the list endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl AirtableRecord {
    /// The trimmed value of the key field, if present and non-empty
    pub fn key(&self, key_field: &str) -> Option<String> {
        let key = match self.fields.get(key_field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Null => return None,
            other => other.to_string(),
        };
        (!key.is_empty()).then_some(key)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

type Fields = BTreeMap<String, String>;

/// Local bookkeeping columns the remote table has no field for
const LOCAL_ONLY: [CardField; 1] = [CardField::ImageFilename];

fn is_mirrored(header: &str) -> bool {
    !LOCAL_ONLY.iter().any(|field| field.header() == header)
}

#[derive(Debug, Serialize)]
struct RecordWrite<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    fields: &'a Fields,
}

#[derive(Debug, Serialize)]
struct WriteBody<'a> {
    records: Vec<RecordWrite<'a>>,
}

/// Writes needed to make the remote table mirror the local one
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncPlan {
    /// Remote record IDs to delete
    pub deletes: Vec<String>,
    /// Blank remote records to fill: (record ID, fields)
    pub updates: Vec<(String, Fields)>,
    /// New records to create
    pub creates: Vec<Fields>,
}

/// Outcome of a sync run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SyncSummary {
    pub deleted: usize,
    pub updated: usize,
    pub created: usize,
    /// One message per failed request
    pub failures: Vec<String>,
}

impl SyncSummary {
    pub fn written(&self) -> usize {
        self.deleted + self.updated + self.created
    }
}

/// Compares remote records with the local table
///
/// Records keyed by a card that no longer exists locally are deleted, as are
/// later duplicates of a key. Local cards missing remotely first take over
/// records with a blank key, in remote order, and are created once those run
/// out. Records whose key exists on both sides are left alone. Only non-empty
/// mirrored columns are written.
pub fn plan_sync(remote: &[AirtableRecord], local: &TableSnapshot) -> SyncPlan {
    let key_field = CardField::CardId.header();

    let local_keys: HashSet<&str> = local
        .records
        .iter()
        .filter_map(|r| r.get(key_field).map(|k| k.trim()))
        .filter(|k| !k.is_empty())
        .collect();

    let mut plan = SyncPlan::default();
    let mut remote_keys = HashSet::new();
    let mut blank_slots = Vec::new();

    for record in remote {
        match record.key(key_field) {
            Some(key) if local_keys.contains(key.as_str()) && remote_keys.insert(key.clone()) => {}
            Some(_) => plan.deletes.push(record.id.clone()),
            None => blank_slots.push(record.id.clone()),
        }
    }

    let mut blank_slots = blank_slots.into_iter();
    for record in &local.records {
        let Some(key) = record.get(key_field).map(|k| k.trim()).filter(|k| !k.is_empty()) else {
            continue;
        };
        if remote_keys.contains(key) {
            continue;
        }

        let fields: Fields = record
            .iter()
            .filter(|(k, v)| is_mirrored(k) && !v.trim().is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match blank_slots.next() {
            Some(slot) => plan.updates.push((slot, fields)),
            None => plan.creates.push(fields),
        }
    }

    plan
}

/// Client for one Airtable table
#[derive(Debug, Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    settings: AirtableSettings,
}

impl AirtableClient {
    pub fn new(http: reqwest::Client, settings: AirtableSettings) -> Self {
        Self { http, settings }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.settings.api_url, self.settings.base_id, self.settings.table_id
        )
    }

    /// Lists every record of the configured view, following pagination
    #[instrument(skip(self))]
    pub async fn list_records(&self) -> Result<Vec<AirtableRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![("pageSize", PAGE_SIZE.to_string())];
            if let Some(view) = &self.settings.view_name {
                query.push(("view", view.clone()));
            }
            if let Some(offset) = &offset {
                query.push(("offset", offset.clone()));
            }

            let page: ListResponse = self
                .http
                .get(self.table_url())
                .bearer_auth(&self.settings.api_key)
                .query(&query)
                .send()
                .await
                .context("Airtable list request failed")?
                .error_for_status()
                .context("Airtable list request was rejected")?
                .json()
                .await
                .context("Failed to decode Airtable records")?;

            debug!("Fetched {} Airtable records", page.records.len());
            records.extend(page.records);

            match page.offset {
                Some(next) if !next.is_empty() => offset = Some(next),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn delete_batch(&self, ids: &[String]) -> Result<usize> {
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("records[]", id.as_str())).collect();

        self.http
            .delete(self.table_url())
            .bearer_auth(&self.settings.api_key)
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        Ok(ids.len())
    }

    async fn write_batch(&self, method: reqwest::Method, records: Vec<RecordWrite<'_>>) -> Result<usize> {
        let count = records.len();

        self.http
            .request(method, self.table_url())
            .bearer_auth(&self.settings.api_key)
            .json(&WriteBody { records })
            .send()
            .await?
            .error_for_status()?;

        Ok(count)
    }

    /// Applies a plan in batches of ten; failed batches are recorded, not fatal
    #[instrument(skip(self, plan), fields(deletes = plan.deletes.len(), updates = plan.updates.len(), creates = plan.creates.len()))]
    pub async fn apply(&self, plan: &SyncPlan) -> SyncSummary {
        let mut summary = SyncSummary::default();

        for batch in plan.deletes.chunks(BATCH_SIZE) {
            match self.delete_batch(batch).await {
                Ok(n) => summary.deleted += n,
                Err(e) => {
                    warn!("Airtable DELETE failed: {:#}", e);
                    summary.failures.push(format!("DELETE: {:#}", e));
                }
            }
        }

        for batch in plan.updates.chunks(BATCH_SIZE) {
            let records = batch
                .iter()
                .map(|(id, fields)| RecordWrite { id: Some(id.as_str()), fields })
                .collect();
            match self.write_batch(reqwest::Method::PATCH, records).await {
                Ok(n) => summary.updated += n,
                Err(e) => {
                    warn!("Airtable PATCH failed: {:#}", e);
                    summary.failures.push(format!("PATCH: {:#}", e));
                }
            }
        }

        for batch in plan.creates.chunks(BATCH_SIZE) {
            let records = batch
                .iter()
                .map(|fields| RecordWrite { id: None, fields })
                .collect();
            match self.write_batch(reqwest::Method::POST, records).await {
                Ok(n) => summary.created += n,
                Err(e) => {
                    warn!("Airtable POST failed: {:#}", e);
                    summary.failures.push(format!("POST: {:#}", e));
                }
            }
        }

        summary
    }
}

/// Mirrors the local card table into Airtable
///
/// ### Errors
///
/// Returns an error when the remote table cannot be listed; write failures
/// are reported in the summary instead.
pub async fn sync_table(http: &reqwest::Client, settings: &AirtableSettings, local: &TableSnapshot) -> Result<SyncSummary> {
    let client = AirtableClient::new(http.clone(), settings.clone());

    let remote = client.list_records().await?;
    let plan = plan_sync(&remote, local);
    let summary = client.apply(&plan).await;

    info!(
        "Airtable sync: {} deleted, {} updated, {} created, {} failed requests",
        summary.deleted,
        summary.updated,
        summary.created,
        summary.failures.len()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests;
