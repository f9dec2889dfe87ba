//! Minimal client for the S3-compatible MinIO object store.
//!
//! The docker / k8s deployments keep all project data in a single root
//! bucket. This module provides just the object operations the project DAO
//! needs: get/put/delete, JSON convenience wrappers, recursive listing and
//! prefix deletion. Requests are built with `reqwest`, addressed path-style
//! (`/<bucket>/<key>`) and signed with AWS Signature V4.

/// AWS Signature V4 request signing
pub mod sign;

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::MinioSettings;
use crate::error::AppError;
use sign::SigningKey;

/// Client for one bucket of an S3-compatible object store.
#[derive(Debug, Clone)]
pub struct MinioClient {
    http: reqwest::Client,
    scheme: String,
    /// `host[:port]`, also sent as the signed `host` header
    authority: String,
    bucket: String,
    access_key: String,
    secret_key: String,
    region: String,
}

impl MinioClient {
    /// Build a client from validated settings.
    ///
    /// The endpoint may be given as `host:port` (scheme derived from the
    /// `secure` flag, matching how the store's own SDKs take it) or as a full
    /// URL.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when the endpoint cannot be parsed as a URL.
    pub fn new(settings: &MinioSettings) -> Result<Self, AppError> {
        let raw = if settings.endpoint.contains("://") {
            settings.endpoint.clone()
        } else {
            let scheme = if settings.secure { "https" } else { "http" };
            format!("{scheme}://{}", settings.endpoint)
        };
        let url = Url::parse(&raw)
            .map_err(|e| AppError::InvalidRequest(format!("Invalid MinIO endpoint: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| AppError::InvalidRequest("MinIO endpoint has no host".to_string()))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(MinioClient {
            http,
            scheme: url.scheme().to_string(),
            authority,
            bucket: settings.root_bucket.clone(),
            access_key: settings.access_key.clone(),
            secret_key: settings.secret_key.clone(),
            region: settings.region.clone(),
        })
    }

    /// Verify that the store is reachable and the bucket answers listings.
    pub async fn ping(&self) -> Result<(), AppError> {
        let query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("max-keys".to_string(), "1".to_string()),
        ];
        let response = self
            .send(Method::GET, &self.bucket_path(), &query, Vec::new(), None)
            .await?;
        Self::ensure_success(&response, &self.bucket)
    }

    /// Fetch an object's content.
    ///
    /// # Errors
    ///
    /// `ObjectStoreStatus` with status 404 when the object does not exist.
    pub async fn get_object(&self, key: &str) -> Result<Vec<u8>, AppError> {
        match self.get_object_opt(key).await? {
            Some(data) => Ok(data),
            None => Err(AppError::ObjectStoreStatus {
                status: 404,
                key: key.to_string(),
            }),
        }
    }

    /// Fetch an object's content, mapping a missing object to `None`.
    pub async fn get_object_opt(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let response = self
            .send(Method::GET, &self.object_path(key), &[], Vec::new(), None)
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        Self::ensure_success(&response, key)?;
        Ok(Some(response.bytes().await?.to_vec()))
    }

    /// Store an object, replacing any existing content.
    pub async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        let response = self
            .send(
                Method::PUT,
                &self.object_path(key),
                &[],
                data,
                Some(content_type),
            )
            .await?;
        Self::ensure_success(&response, key)
    }

    /// Delete an object. Deleting a missing object is a success, mirroring
    /// the S3 DeleteObject semantics.
    pub async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        let response = self
            .send(Method::DELETE, &self.object_path(key), &[], Vec::new(), None)
            .await?;
        if response.status().as_u16() == 404 {
            return Ok(());
        }
        Self::ensure_success(&response, key)
    }

    /// Serialize a value as pretty-printed JSON and store it.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.put_object(key, data, "application/json").await
    }

    /// List every object key under a prefix, following pagination.
    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let body = self.list_page(prefix, None, continuation.as_deref()).await?;
            keys.extend(xml_tag_values(&body, "Key"));
            if xml_tag_values(&body, "IsTruncated").first().map(String::as_str) != Some("true") {
                break;
            }
            continuation = xml_tag_values(&body, "NextContinuationToken").into_iter().next();
            if continuation.is_none() {
                break;
            }
        }
        Ok(keys)
    }

    /// List the direct "subdirectories" of a prefix (S3 common prefixes with
    /// delimiter `/`), without the trailing slash.
    pub async fn list_common_prefixes(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let mut prefixes = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let body = self
                .list_page(prefix, Some("/"), continuation.as_deref())
                .await?;
            for block in xml_tag_values(&body, "CommonPrefixes") {
                for value in xml_tag_values(&block, "Prefix") {
                    prefixes.push(value.trim_end_matches('/').to_string());
                }
            }
            if xml_tag_values(&body, "IsTruncated").first().map(String::as_str) != Some("true") {
                break;
            }
            continuation = xml_tag_values(&body, "NextContinuationToken").into_iter().next();
            if continuation.is_none() {
                break;
            }
        }
        Ok(prefixes)
    }

    /// Delete every object under a prefix and return how many were removed.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, AppError> {
        let keys = self.list_keys(prefix).await?;
        let count = keys.len();
        for key in keys {
            self.delete_object(&key).await?;
        }
        Ok(count)
    }

    /// One ListObjectsV2 page.
    async fn list_page(
        &self,
        prefix: &str,
        delimiter: Option<&str>,
        continuation: Option<&str>,
    ) -> Result<String, AppError> {
        let mut query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("prefix".to_string(), prefix.to_string()),
        ];
        if let Some(delimiter) = delimiter {
            query.push(("delimiter".to_string(), delimiter.to_string()));
        }
        if let Some(token) = continuation {
            query.push(("continuation-token".to_string(), token.to_string()));
        }
        let response = self
            .send(Method::GET, &self.bucket_path(), &query, Vec::new(), None)
            .await?;
        Self::ensure_success(&response, prefix)?;
        Ok(response.text().await?)
    }

    /// Sign and dispatch one request.
    ///
    /// The canonical query string doubles as the wire query string so the
    /// signature always matches what is sent.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<reqwest::Response, AppError> {
        let now = chrono::Utc::now();
        let payload_hash = if body.is_empty() {
            sign::EMPTY_PAYLOAD_SHA256.to_string()
        } else {
            hex::encode(Sha256::digest(&body))
        };

        let mut headers = vec![
            ("host".to_string(), self.authority.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            (
                "x-amz-date".to_string(),
                now.format(sign::AMZ_DATE_FORMAT).to_string(),
            ),
        ];
        if let Some(content_type) = content_type {
            headers.push(("content-type".to_string(), content_type.to_string()));
        }

        let key = SigningKey {
            access_key: &self.access_key,
            secret_key: &self.secret_key,
            region: &self.region,
            service: "s3",
        };
        let authorization =
            sign::authorization_header(method.as_str(), path, query, &headers, &payload_hash, &key, now);

        let query_string = sign::canonical_query_string(query);
        let url = if query_string.is_empty() {
            format!("{}://{}{path}", self.scheme, self.authority)
        } else {
            format!("{}://{}{path}?{query_string}", self.scheme, self.authority)
        };

        let mut request = self.http.request(method, url);
        for (name, value) in &headers {
            // reqwest derives the host header from the URL
            if name != "host" {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        Ok(request.header("authorization", authorization).body(body).send().await?)
    }

    fn object_path(&self, key: &str) -> String {
        format!(
            "/{}/{}",
            sign::uri_encode(&self.bucket, false),
            sign::uri_encode(key, false)
        )
    }

    fn bucket_path(&self) -> String {
        format!("/{}", sign::uri_encode(&self.bucket, false))
    }

    fn ensure_success(response: &reqwest::Response, key: &str) -> Result<(), AppError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::ObjectStoreStatus {
                status: response.status().as_u16(),
                key: key.to_string(),
            })
        }
    }
}

/// Extract the text content of every `<tag>...</tag>` occurrence.
///
/// ListObjectsV2 responses are XML; the handful of flat elements the client
/// reads (`Key`, `Prefix`, `IsTruncated`, `NextContinuationToken`,
/// `CommonPrefixes` blocks) do not justify an XML parser, so this scans for
/// literal tags and unescapes the standard entities.
fn xml_tag_values(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut values = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        let Some(end) = after_open.find(&close) else {
            break;
        };
        values.push(xml_unescape(&after_open[..end]));
        rest = &after_open[end + close.len()..];
    }
    values
}

/// Reverse the five predefined XML entities.
fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MinioClient {
        MinioClient::new(&MinioSettings {
            endpoint: server.uri(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            secure: false,
            region: "us-east-1".to_string(),
            root_bucket: "hmse".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn xml_tag_values_extracts_repeated_flat_tags() {
        let xml = "<ListBucketResult><KeyCount>2</KeyCount>\
                   <Contents><Key>p/a.txt</Key></Contents>\
                   <Contents><Key>p/b &amp; c.txt</Key></Contents>\
                   <IsTruncated>false</IsTruncated></ListBucketResult>";
        assert_eq!(xml_tag_values(xml, "Key"), vec!["p/a.txt", "p/b & c.txt"]);
        assert_eq!(xml_tag_values(xml, "IsTruncated"), vec!["false"]);
        assert!(xml_tag_values(xml, "NextContinuationToken").is_empty());
    }

    #[test]
    fn xml_tag_values_handles_nested_blocks() {
        let xml = "<R><CommonPrefixes><Prefix>proj1/</Prefix></CommonPrefixes>\
                   <CommonPrefixes><Prefix>proj2/</Prefix></CommonPrefixes></R>";
        let blocks = xml_tag_values(xml, "CommonPrefixes");
        assert_eq!(blocks.len(), 2);
        assert_eq!(xml_tag_values(&blocks[0], "Prefix"), vec!["proj1/"]);
    }

    #[tokio::test]
    async fn get_object_opt_maps_missing_objects_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hmse/p1/metadata.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.get_object_opt("p1/metadata.json").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn put_and_get_object_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/hmse/p1/weather/station.csv"))
            .and(body_string_contains("1.5"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hmse/p1/weather/station.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"day,rain\n1,1.5\n".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .put_object("p1/weather/station.csv", b"day,rain\n1,1.5\n".to_vec(), "text/csv")
            .await
            .unwrap();
        let data = client.get_object("p1/weather/station.csv").await.unwrap();
        assert_eq!(data, b"day,rain\n1,1.5\n");
    }

    #[tokio::test]
    async fn requests_are_signed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hmse/p1/metadata.json"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"{}".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.get_object("p1/metadata.json").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let authorization = requests[0]
            .headers
            .get("authorization")
            .expect("request is signed")
            .to_str()
            .unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=minioadmin/"));
        assert!(authorization.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        assert!(requests[0].headers.contains_key("x-amz-date"));
    }

    #[tokio::test]
    async fn list_keys_follows_continuation_tokens() {
        let server = MockServer::start().await;
        let first_page = "<ListBucketResult><IsTruncated>true</IsTruncated>\
                          <Contents><Key>p1/a</Key></Contents>\
                          <NextContinuationToken>tok1</NextContinuationToken></ListBucketResult>";
        let second_page = "<ListBucketResult><IsTruncated>false</IsTruncated>\
                           <Contents><Key>p1/b</Key></Contents></ListBucketResult>";
        Mock::given(method("GET"))
            .and(path("/hmse"))
            .and(query_param("continuation-token", "tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(second_page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/hmse"))
            .and(query_param("prefix", "p1/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(first_page))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let keys = client.list_keys("p1/").await.unwrap();
        assert_eq!(keys, vec!["p1/a", "p1/b"]);
    }

    #[tokio::test]
    async fn delete_prefix_removes_every_listed_object() {
        let server = MockServer::start().await;
        let listing = "<ListBucketResult><IsTruncated>false</IsTruncated>\
                       <Contents><Key>p1/metadata.json</Key></Contents>\
                       <Contents><Key>p1/weather/station.csv</Key></Contents></ListBucketResult>";
        Mock::given(method("GET"))
            .and(path("/hmse"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let deleted = client.delete_prefix("p1/").await.unwrap();
        assert_eq!(deleted, 2);
    }
}
