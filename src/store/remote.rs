use super::{BatchOutcome, EntityKind, FieldSpec, Record, RecordOutcome, RecordStore};
use crate::error::StoreError;
use crate::fields::ID_FIELD;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

// Response envelope used by every endpoint of the record service
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub results: Option<Vec<RecordOutcome>>,
}

impl<T> Envelope<T> {
    fn rejected(&self) -> StoreError {
        StoreError::Rejected(
            self.message
                .clone()
                .unwrap_or_else(|| "request rejected".to_string()),
        )
    }

    /// Payload of a read response.
    pub fn into_data(self) -> Result<Option<T>, StoreError> {
        if !self.success {
            let err = self.rejected();
            tracing::error!(error = %err, "record service rejected read");
            return Err(err);
        }
        Ok(self.data)
    }

    /// Per-record results of a write response. A write without results
    /// counts as fully successful.
    pub fn into_batch(self) -> Result<BatchOutcome, StoreError> {
        if !self.success {
            let err = self.rejected();
            tracing::error!(error = %err, "record service rejected write");
            return Err(err);
        }
        Ok(BatchOutcome {
            results: self.results.unwrap_or_default(),
        })
    }
}

/// Record store backed by the HTTP record service.
#[derive(Clone, Debug)]
pub struct RemoteStore {
    client: Client,
    instance_url: String,
    api_key: String,
    project_id: u64,
}

impl RemoteStore {
    pub fn new(instance_url: &str, api_key: &str, project_id: u64) -> Self {
        RemoteStore {
            client: Client::new(),
            instance_url: instance_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            project_id,
        }
    }

    fn url(&self, kind: EntityKind) -> String {
        format!("{}/api/v1/records/{}", self.instance_url, kind.table())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Project-Id", self.project_id.to_string())
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        kind: EntityKind,
        id: Option<u64>,
    ) -> Result<Envelope<T>, StoreError> {
        let res = self.authorize(request).send().await?;
        read_envelope(res, kind, id).await
    }
}

async fn read_envelope<T: DeserializeOwned>(
    res: Response,
    kind: EntityKind,
    id: Option<u64>,
) -> Result<Envelope<T>, StoreError> {
    let status = res.status();
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(StoreError::NotFound { kind, id });
        }
    }
    let body = res.text().await?;
    if !status.is_success() && body.trim().is_empty() {
        return Err(StoreError::Rejected(format!("{} returned {}", kind.table(), status)));
    }
    parse_envelope(&body)
}

pub fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<Envelope<T>, StoreError> {
    Ok(serde_json::from_str(body)?)
}

fn single_id(ids: &[u64]) -> Option<u64> {
    match ids {
        [id] => Some(*id),
        _ => None,
    }
}

fn record_id(record: &Record) -> Option<u64> {
    record.get(ID_FIELD).and_then(|v| v.as_u64())
}

#[async_trait]
impl RecordStore for RemoteStore {
    async fn fetch_all(&self, kind: EntityKind, spec: &FieldSpec) -> Result<Vec<Record>, StoreError> {
        let request = self.client.get(self.url(kind)).query(&[
            ("fields", spec.fields.join(",")),
            ("orderBy", ID_FIELD.to_string()),
            ("sort", spec.order.as_str().to_string()),
        ]);
        let envelope: Envelope<Vec<Record>> = self.send(request, kind, None).await?;
        let rows = envelope.into_data()?.unwrap_or_default();
        tracing::debug!(%kind, count = rows.len(), "fetched records");
        Ok(rows)
    }

    async fn fetch_one(&self, kind: EntityKind, id: u64) -> Result<Record, StoreError> {
        let url = format!("{}/{}", self.url(kind), id);
        let envelope: Envelope<Record> = self.send(self.client.get(url), kind, Some(id)).await?;
        envelope
            .into_data()?
            .ok_or(StoreError::NotFound { kind, id })
    }

    async fn create(&self, kind: EntityKind, records: Vec<Record>) -> Result<BatchOutcome, StoreError> {
        let request = self
            .client
            .post(self.url(kind))
            .json(&json!({ "records": records }));
        let envelope: Envelope<serde_json::Value> = self.send(request, kind, None).await?;
        envelope.into_batch()
    }

    async fn update(&self, kind: EntityKind, records: Vec<Record>) -> Result<BatchOutcome, StoreError> {
        let target = match records.as_slice() {
            [record] => record_id(record),
            _ => None,
        };
        let request = self
            .client
            .patch(self.url(kind))
            .json(&json!({ "records": records }));
        let envelope: Envelope<serde_json::Value> = self.send(request, kind, target).await?;
        envelope.into_batch()
    }

    async fn delete(&self, kind: EntityKind, ids: &[u64]) -> Result<BatchOutcome, StoreError> {
        let request = self
            .client
            .delete(self.url(kind))
            .json(&json!({ "RecordIds": ids }));
        let envelope: Envelope<serde_json::Value> = self.send(request, kind, single_id(ids)).await?;
        envelope.into_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_envelope_yields_rows() {
        let body = r#"{"success": true, "data": [{"Id": 1, "title_c": "a"}, {"Id": 2}]}"#;
        let envelope: Envelope<Vec<Record>> = parse_envelope(body).unwrap();
        let rows = envelope.into_data().unwrap().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(record_id(&rows[1]), Some(2));
    }

    #[test]
    fn test_unsuccessful_envelope_is_rejected_with_message() {
        let body = r#"{"success": false, "message": "Invalid table"}"#;
        let envelope: Envelope<Vec<Record>> = parse_envelope(body).unwrap();
        match envelope.into_data() {
            Err(StoreError::Rejected(message)) => assert_eq!(message, "Invalid table"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_write_results_carry_field_errors() {
        let body = r#"{
            "success": true,
            "results": [
                {"success": true, "data": {"Id": 10}},
                {"success": false, "errors": [{"fieldLabel": "color_c", "message": "too long"}]}
            ]
        }"#;
        let envelope: Envelope<serde_json::Value> = parse_envelope(body).unwrap();
        let batch = envelope.into_batch().unwrap();
        assert_eq!(batch.succeeded().count(), 1);
        assert_eq!(batch.first_failure().as_deref(), Some("color_c: too long"));
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let store = RemoteStore::new("https://records.example.com/", "key", 1);
        assert_eq!(
            store.url(EntityKind::Category),
            "https://records.example.com/api/v1/records/category_c"
        );
    }

    #[test]
    fn test_single_id_only_for_one_target() {
        assert_eq!(single_id(&[3]), Some(3));
        assert_eq!(single_id(&[3, 4]), None);
    }

    fn response(status: u16, body: &str) -> Response {
        let res = http::Response::builder()
            .status(status)
            .body(body.to_string())
            .unwrap();
        Response::from(res)
    }

    #[tokio::test]
    async fn test_missing_single_target_is_not_found() {
        let res = response(404, r#"{"success": false, "message": "Record not found"}"#);
        let result: Result<Envelope<serde_json::Value>, _> =
            read_envelope(res, EntityKind::Task, single_id(&[7])).await;
        match result {
            Err(StoreError::NotFound { kind, id }) => {
                assert_eq!(kind, EntityKind::Task);
                assert_eq!(id, 7);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_without_target_reads_the_body() {
        let res = response(404, r#"{"success": false, "message": "Invalid table"}"#);
        let envelope: Envelope<Vec<Record>> =
            read_envelope(res, EntityKind::Category, None).await.unwrap();
        match envelope.into_data() {
            Err(StoreError::Rejected(message)) => assert_eq!(message, "Invalid table"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_error_body_reports_status() {
        let res = response(404, "");
        let result: Result<Envelope<Vec<Record>>, _> =
            read_envelope(res, EntityKind::Task, None).await;
        match result {
            Err(StoreError::Rejected(message)) => assert!(message.starts_with("task_c returned 404")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
