//! IPFS HTTP API content store (`/api/v0/add`, `/api/v0/cat`, `/api/v0/id`).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::ContentStoreError;
use crate::ports::{ContentStore, ContentStoreStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(rename = "ID")]
    id: String,
}

pub struct IpfsContentStore {
    api_url: String,
    http: reqwest::Client,
}

impl IpfsContentStore {
    pub fn new(api_url: impl Into<String>) -> Result<Self, ContentStoreError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ContentStoreError::Unreachable(format!("http client: {e}")))?;
        Ok(Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request(&self, path: &str, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}{path}", self.api_url))
            .query(query)
    }

    async fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ContentStoreError> {
        let resp = self
            .request(path, query)
            .send()
            .await
            .map_err(|e| ContentStoreError::Unreachable(e.to_string()))?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ContentStoreError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ContentStoreError::Rejected { status, body })
}

/// The add endpoint may stream one JSON object per line; the last names the
/// root object.
fn parse_add_response(body: &str) -> Result<String, ContentStoreError> {
    let line = body
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ContentStoreError::Malformed("empty add response".into()))?;
    let parsed: AddResponse =
        serde_json::from_str(line).map_err(|e| ContentStoreError::Malformed(e.to_string()))?;
    if parsed.hash.is_empty() {
        return Err(ContentStoreError::Malformed("add response without hash".into()));
    }
    Ok(parsed.hash)
}

#[async_trait]
impl ContentStore for IpfsContentStore {
    async fn add(&self, content: &[u8]) -> Result<String, ContentStoreError> {
        let part = reqwest::multipart::Part::bytes(content.to_vec()).file_name("credential");
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .request("/api/v0/add", &[("pin", "true")])
            .multipart(form)
            .send()
            .await
            .map_err(|e| ContentStoreError::Unreachable(e.to_string()))?;
        let body = check_status(resp)
            .await?
            .text()
            .await
            .map_err(|e| ContentStoreError::Malformed(e.to_string()))?;

        let cid = parse_add_response(&body)?;
        debug!(%cid, size = content.len(), "content added");
        Ok(cid)
    }

    async fn cat(&self, content_id: &str) -> Result<Vec<u8>, ContentStoreError> {
        let cid = content_id.trim();
        if cid.is_empty() {
            return Err(ContentStoreError::NotFound("empty content id".into()));
        }
        let resp = self.post("/api/v0/cat", &[("arg", cid)]).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ContentStoreError::Malformed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn status(&self) -> ContentStoreStatus {
        let resp = match self.post("/api/v0/id", &[]).await {
            Ok(resp) => resp,
            Err(e) => {
                return ContentStoreStatus::Offline {
                    reason: e.to_string(),
                }
            }
        };
        match resp.json::<IdResponse>().await {
            Ok(id) => ContentStoreStatus::Online { node_id: id.id },
            Err(e) => ContentStoreStatus::Offline {
                reason: format!("malformed id response: {e}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_add_response() {
        let body = r#"{"Name":"credential","Hash":"QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG","Size":"12"}"#;
        assert_eq!(
            parse_add_response(body).unwrap(),
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
    }

    #[test]
    fn test_parse_streamed_add_response_takes_last() {
        let body = "{\"Name\":\"a\",\"Hash\":\"QmFirst\"}\n{\"Name\":\"b\",\"Hash\":\"QmLast\"}\n";
        assert_eq!(parse_add_response(body).unwrap(), "QmLast");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_add_response(""),
            Err(ContentStoreError::Malformed(_))
        ));
        assert!(matches!(
            parse_add_response("{\"Name\":\"x\"}"),
            Err(ContentStoreError::Malformed(_))
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let store = IpfsContentStore::new("http://127.0.0.1:5001/").unwrap();
        assert_eq!(store.api_url(), "http://127.0.0.1:5001");
    }

    #[test]
    fn test_content_id_is_query_encoded() {
        let store = IpfsContentStore::new("http://127.0.0.1:5001").unwrap();
        let req = store
            .request("/api/v0/cat", &[("arg", "Qm x&pin=false#frag")])
            .build()
            .unwrap();
        assert_eq!(req.url().path(), "/api/v0/cat");
        assert!(req.url().fragment().is_none());
        let pairs: Vec<(String, String)> = req.url().query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("arg".to_string(), "Qm x&pin=false#frag".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unreachable_node_reports_offline() {
        let store = IpfsContentStore::new("http://127.0.0.1:1").unwrap();
        assert!(!store.status().await.is_online());
        assert!(matches!(
            store.add(b"x").await,
            Err(ContentStoreError::Unreachable(_))
        ));
    }
}
