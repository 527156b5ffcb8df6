//! Amazon SQS publisher.
//!
//! Sends messages with the SQS query API (`Action=SendMessage`) signed with
//! AWS Signature V4. Signing uses `hmac` + `sha2` directly; there is no AWS
//! SDK dependency.
//!
//! # Environment Variables
//!
//! - `AWS_ACCESS_KEY_ID`: required
//! - `AWS_SECRET_ACCESS_KEY`: required
//! - `AWS_SESSION_TOKEN`: optional (temporary credentials / IAM roles)
//! - `AWS_REGION` / `AWS_DEFAULT_REGION`: used when the region can't be
//!   read from the queue host and `[queue].region` is unset
//!
//! # Region
//!
//! Standard queue URLs look like
//! `https://sqs.<region>.amazonaws.com/<account>/<queue>`; the region is
//! taken from the host when it has that shape.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const SQS_API_VERSION: &str = "2012-11-05";

// ============ AWS Credentials ============

#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    pub fn new(access_key_id: &str, secret_access_key: &str, session_token: Option<&str>) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: session_token.map(str::to_string),
        }
    }

    /// Load credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// and optionally `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .context("AWS_ACCESS_KEY_ID environment variable not set")?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

// ============ Queue client ============

/// A string message attribute (`DataType = String`).
pub struct MessageAttribute<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

pub struct SqsQueue {
    queue_url: String,
    host: String,
    path: String,
    region: String,
    creds: AwsCredentials,
    client: reqwest::Client,
}

impl SqsQueue {
    pub fn new(queue_url: &str, region: Option<&str>, creds: AwsCredentials) -> Result<Self> {
        let url = reqwest::Url::parse(queue_url)
            .with_context(|| format!("Invalid queue URL: {}", queue_url))?;
        let host_name = url
            .host_str()
            .with_context(|| format!("Queue URL has no host: {}", queue_url))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host_name, port),
            None => host_name.to_string(),
        };
        let region = match region {
            Some(r) => r.to_string(),
            None => region_from_host(host_name)
                .or_else(|| std::env::var("AWS_REGION").ok())
                .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
                .with_context(|| format!("Cannot determine AWS region for {}", queue_url))?,
        };
        let path = if url.path().is_empty() {
            "/".to_string()
        } else {
            url.path().to_string()
        };

        Ok(Self {
            queue_url: queue_url.to_string(),
            host,
            path,
            region,
            creds,
            client: reqwest::Client::new(),
        })
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Send one message; returns the SQS message id.
    pub async fn send_message(
        &self,
        body: &str,
        attributes: &[MessageAttribute<'_>],
    ) -> Result<String> {
        let mut params: Vec<(String, String)> = vec![
            ("Action".to_string(), "SendMessage".to_string()),
            ("MessageBody".to_string(), body.to_string()),
            ("Version".to_string(), SQS_API_VERSION.to_string()),
        ];
        for (i, attr) in attributes.iter().enumerate() {
            let n = i + 1;
            params.push((format!("MessageAttribute.{}.Name", n), attr.name.to_string()));
            params.push((
                format!("MessageAttribute.{}.Value.DataType", n),
                "String".to_string(),
            ));
            params.push((
                format!("MessageAttribute.{}.Value.StringValue", n),
                attr.value.to_string(),
            ));
        }
        let payload = form_encode(&params);

        let signed = self.sign_post(&payload, Utc::now());

        let mut req_builder = self
            .client
            .post(&self.queue_url)
            .header("Authorization", &signed.authorization)
            .header("content-type", FORM_CONTENT_TYPE)
            .header("x-amz-date", &signed.amz_date);
        if let Some(ref token) = self.creds.session_token {
            req_builder = req_builder.header("x-amz-security-token", token);
        }

        let resp = req_builder
            .body(payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send message to {}: {}", self.queue_url, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "SQS SendMessage failed (HTTP {}): {}",
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        let xml_body = resp.text().await?;
        Ok(extract_xml_value(&xml_body, "MessageId").unwrap_or_default())
    }

    fn sign_post(&self, payload: &str, now: DateTime<Utc>) -> SignedRequest {
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex_sha256(payload.as_bytes());

        let mut headers = vec![
            ("content-type".to_string(), FORM_CONTENT_TYPE.to_string()),
            ("host".to_string(), self.host.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "POST\n{}\n\n{}\n{}\n{}",
            self.path, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/sqs/aws4_request", date_stamp, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.region,
            "sqs",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        SignedRequest {
            authorization: format!(
                "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
                self.creds.access_key_id, credential_scope, signed_headers, signature
            ),
            amz_date,
        }
    }
}

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

struct SignedRequest {
    authorization: String,
    amz_date: String,
}

/// `sqs.us-east-1.amazonaws.com` → `us-east-1`.
fn region_from_host(host: &str) -> Option<String> {
    let mut parts = host.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("sqs"), Some(region), Some("amazonaws")) => Some(region.to_string()),
        _ => None,
    }
}

fn form_encode(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

// ============ AWS SigV4 Helpers ============

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986. Unreserved characters
/// (`A-Z a-z 0-9 - _ . ~`) pass through.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Extract the text content of an XML tag (simple, non-nested).
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}
