//! Integration tests for the Tessera server.
//!
//! These tests spawn the real server binary and exercise the wire surface
//! end-to-end: key lifecycle, envelope encryption, and the error envelope.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::Value;

const TARGET_PREFIX: &str = "TrentService.";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

// ============================================================================
// Test Server
// ============================================================================

/// A test server instance that manages its own process.
pub struct TestServer {
    process: Child,
    pub base_url: String,
    pub port: u16,
}

impl TestServer {
    /// Start a new test server on the specified port.
    pub async fn start(port: u16) -> Result<Self> {
        let server_binary = find_server_binary()?;

        let process = Command::new(&server_binary)
            .arg("--bind")
            .arg(format!("127.0.0.1:{}", port))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start server: {:?}", server_binary))?;

        let base_url = format!("http://127.0.0.1:{}", port);

        let server = Self {
            process,
            base_url,
            port,
        };

        // Wait for server to be ready
        server.wait_for_ready().await?;

        Ok(server)
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = self.client();

        for _ in 0..50 {
            match client.call("ListKeys", serde_json::json!({})).await {
                Ok(_) => return Ok(()),
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }

        bail!("Server failed to start within 5 seconds")
    }

    /// Get a configured client for this server.
    pub fn client(&self) -> KmsClient {
        KmsClient::new(&self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

/// Find the server binary in the target directory.
fn find_server_binary() -> Result<std::path::PathBuf> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());

    // Try debug build first, then release
    let candidates = [
        std::path::Path::new(&manifest_dir).join("../../target/debug/tessera-server"),
        std::path::Path::new(&manifest_dir).join("../../target/debug/tessera-server.exe"),
        std::path::Path::new(&manifest_dir).join("../../target/release/tessera-server"),
        std::path::Path::new(&manifest_dir).join("../../target/release/tessera-server.exe"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.canonicalize()?);
        }
    }

    bail!(
        "Could not find tessera-server binary. Run 'cargo build -p tessera-server' first. Searched in: {:?}",
        candidates
    )
}

// ============================================================================
// Test Client
// ============================================================================

/// HTTP client speaking the amz-json-1.1 convention.
pub struct KmsClient {
    client: Client,
    base_url: String,
}

impl KmsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
        }
    }

    async fn post(&self, operation: &str, body: Value) -> Result<(reqwest::StatusCode, Value)> {
        let resp = self
            .client
            .post(&self.base_url)
            .header("x-amz-target", format!("{}{}", TARGET_PREFIX, operation))
            .header("content-type", AMZ_JSON)
            .body(body.to_string())
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).with_context(|| format!("Invalid JSON: {}", text))?
        };
        Ok((status, value))
    }

    /// Issues an operation and returns the parsed result body.
    pub async fn call(&self, operation: &str, body: Value) -> Result<Value> {
        let (status, value) = self.post(operation, body).await?;
        if !status.is_success() {
            bail!("{} failed: {}", operation, value);
        }
        Ok(value)
    }

    /// Issues an operation that must fail, returning the wire error code.
    pub async fn call_expecting_error(&self, operation: &str, body: Value) -> Result<String> {
        let (status, value) = self.post(operation, body).await?;
        if status.is_success() {
            bail!("{} unexpectedly succeeded: {}", operation, value);
        }
        value["__type"]
            .as_str()
            .map(str::to_string)
            .context("Error response missing __type")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde_json::json;
    use std::sync::atomic::{AtomicU16, Ordering};

    // Port counter to avoid conflicts between parallel tests
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18300);

    fn next_port() -> u16 {
        PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    async fn create_key(client: &KmsClient) -> String {
        let created = client.call("CreateKey", json!({})).await.unwrap();
        created["KeyMetadata"]["KeyId"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_create_encrypt_decrypt_roundtrip() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let key_id = create_key(&client).await;

        let encrypted = client
            .call(
                "Encrypt",
                json!({ "KeyId": key_id.clone(), "Plaintext": BASE64.encode(b"hello") }),
            )
            .await
            .unwrap();
        let blob = encrypted["CiphertextBlob"].as_str().unwrap().to_string();
        assert_eq!(encrypted["KeyId"], key_id);

        let decrypted = client
            .call("Decrypt", json!({ "CiphertextBlob": blob }))
            .await
            .unwrap();
        assert_eq!(decrypted["KeyId"], key_id);
        assert_eq!(decrypted["Plaintext"], BASE64.encode(b"hello"));
    }

    #[tokio::test]
    async fn test_context_mismatch_is_invalid_ciphertext() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let key_id = create_key(&client).await;

        let encrypted = client
            .call(
                "Encrypt",
                json!({
                    "KeyId": key_id,
                    "Plaintext": BASE64.encode(b"secret"),
                    "EncryptionContext": { "env": "prod" },
                }),
            )
            .await
            .unwrap();
        let blob = encrypted["CiphertextBlob"].as_str().unwrap().to_string();

        let code = client
            .call_expecting_error(
                "Decrypt",
                json!({ "CiphertextBlob": blob, "EncryptionContext": { "env": "dev" } }),
            )
            .await
            .unwrap();
        assert_eq!(code, "InvalidCiphertextException");
    }

    #[tokio::test]
    async fn test_disable_enable_gating() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let key_id = create_key(&client).await;

        client
            .call("DisableKey", json!({ "KeyId": key_id.clone() }))
            .await
            .unwrap();

        let code = client
            .call_expecting_error(
                "Encrypt",
                json!({ "KeyId": key_id.clone(), "Plaintext": BASE64.encode(b"x") }),
            )
            .await
            .unwrap();
        assert_eq!(code, "DisabledException");

        client
            .call("EnableKey", json!({ "KeyId": key_id.clone() }))
            .await
            .unwrap();

        client
            .call(
                "Encrypt",
                json!({ "KeyId": key_id, "Plaintext": BASE64.encode(b"x") }),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_nonexistent_key_is_not_found() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let code = client
            .call_expecting_error(
                "Encrypt",
                json!({ "KeyId": "999", "Plaintext": BASE64.encode(b"x") }),
            )
            .await
            .unwrap();
        assert_eq!(code, "NotFoundException");
    }

    #[tokio::test]
    async fn test_alias_resolution_equivalence() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let key_id = create_key(&client).await;

        client
            .call(
                "CreateAlias",
                json!({ "AliasName": "alias/app", "TargetKeyId": key_id.clone() }),
            )
            .await
            .unwrap();

        let described = client
            .call("DescribeKey", json!({ "KeyId": key_id.clone() }))
            .await
            .unwrap();
        let arn = described["KeyMetadata"]["Arn"].as_str().unwrap().to_string();

        for identifier in [key_id.clone(), arn, "alias/app".to_string()] {
            let result = client
                .call("DescribeKey", json!({ "KeyId": identifier }))
                .await
                .unwrap();
            assert_eq!(result["KeyMetadata"]["KeyId"], key_id);
        }

        let aliases = client.call("ListAliases", json!({})).await.unwrap();
        assert_eq!(aliases["Aliases"][0]["AliasName"], "alias/app");
        assert_eq!(aliases["Aliases"][0]["TargetKeyId"], key_id);
    }

    #[tokio::test]
    async fn test_generate_data_key_sizing() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let key_id = create_key(&client).await;

        let generated = client
            .call(
                "GenerateDataKey",
                json!({ "KeyId": key_id.clone(), "KeySpec": "AES_256" }),
            )
            .await
            .unwrap();
        let plaintext = BASE64
            .decode(generated["Plaintext"].as_str().unwrap())
            .unwrap();
        assert_eq!(plaintext.len(), 32);
        assert!(!generated["CiphertextBlob"].as_str().unwrap().is_empty());

        let without = client
            .call(
                "GenerateDataKeyWithoutPlaintext",
                json!({ "KeyId": key_id.clone(), "KeySpec": "AES_256" }),
            )
            .await
            .unwrap();
        assert!(without.get("Plaintext").is_none());

        let code = client
            .call_expecting_error(
                "GenerateDataKey",
                json!({ "KeyId": key_id, "KeySpec": "AES_256", "NumberOfBytes": 32 }),
            )
            .await
            .unwrap();
        assert_eq!(code, "InvalidParameterCombination");
    }

    #[tokio::test]
    async fn test_re_encrypt_between_keys() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let a = create_key(&client).await;
        let b = create_key(&client).await;

        let encrypted = client
            .call(
                "Encrypt",
                json!({
                    "KeyId": a.clone(),
                    "Plaintext": BASE64.encode(b"moving"),
                    "EncryptionContext": { "stage": "src" },
                }),
            )
            .await
            .unwrap();
        let blob = encrypted["CiphertextBlob"].as_str().unwrap().to_string();

        let reencrypted = client
            .call(
                "ReEncrypt",
                json!({
                    "CiphertextBlob": blob.clone(),
                    "SourceEncryptionContext": { "stage": "src" },
                    "DestinationKeyId": b.clone(),
                    "DestinationEncryptionContext": { "stage": "dst" },
                }),
            )
            .await
            .unwrap();
        assert_eq!(reencrypted["SourceKeyId"], a);
        assert_eq!(reencrypted["KeyId"], b);
        let new_blob = reencrypted["CiphertextBlob"].as_str().unwrap().to_string();
        assert_ne!(new_blob, blob);

        let decrypted = client
            .call(
                "Decrypt",
                json!({ "CiphertextBlob": new_blob, "EncryptionContext": { "stage": "dst" } }),
            )
            .await
            .unwrap();
        assert_eq!(decrypted["KeyId"], b);
        assert_eq!(decrypted["Plaintext"], BASE64.encode(b"moving"));
    }

    #[tokio::test]
    async fn test_grant_tokens_rejected() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let key_id = create_key(&client).await;

        let code = client
            .call_expecting_error(
                "Encrypt",
                json!({
                    "KeyId": key_id,
                    "Plaintext": BASE64.encode(b"x"),
                    "GrantTokens": ["tok"],
                }),
            )
            .await
            .unwrap();
        assert_eq!(code, "GrantsNotSupported");
    }

    #[tokio::test]
    async fn test_generate_random() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let result = client
            .call("GenerateRandom", json!({ "NumberOfBytes": 64 }))
            .await
            .unwrap();
        let bytes = BASE64.decode(result["Plaintext"].as_str().unwrap()).unwrap();
        assert_eq!(bytes.len(), 64);

        let code = client
            .call_expecting_error("GenerateRandom", json!({ "NumberOfBytes": 2048 }))
            .await
            .unwrap();
        assert_eq!(code, "InvalidParameterValue");
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let code = client
            .call_expecting_error("RotateEverything", json!({}))
            .await
            .unwrap();
        assert_eq!(code, "UnknownOperationException");
    }

    #[tokio::test]
    async fn test_unsupported_surface_codes() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        let key_id = create_key(&client).await;

        let code = client
            .call_expecting_error(
                "ScheduleKeyDeletion",
                json!({ "KeyId": key_id.clone(), "PendingWindowInDays": 7 }),
            )
            .await
            .unwrap();
        assert_eq!(code, "UnsupportedOperationException");

        let code = client
            .call_expecting_error("CreateGrant", json!({ "KeyId": key_id.clone() }))
            .await
            .unwrap();
        assert_eq!(code, "GrantsNotSupported");

        let status = client
            .call("GetKeyRotationStatus", json!({ "KeyId": key_id }))
            .await
            .unwrap();
        assert_eq!(status["KeyRotationEnabled"], false);
    }

    #[tokio::test]
    async fn test_full_key_lifecycle_over_the_wire() {
        let server = TestServer::start(next_port()).await.unwrap();
        let client = server.client();

        // 1. Create a tagged key
        let created = client
            .call(
                "CreateKey",
                json!({
                    "Description": "payments master key",
                    "Tags": [{ "TagKey": "team", "TagValue": "payments" }],
                }),
            )
            .await
            .unwrap();
        let key_id = created["KeyMetadata"]["KeyId"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(created["KeyMetadata"]["KeyState"], "Enabled");
        assert_eq!(created["KeyMetadata"]["Description"], "payments master key");

        // 2. It shows up in listings
        let keys = client.call("ListKeys", json!({})).await.unwrap();
        assert!(keys["Keys"]
            .as_array()
            .unwrap()
            .iter()
            .any(|k| k["KeyId"] == key_id));

        // 3. Tags round-trip
        let tags = client
            .call("ListResourceTags", json!({ "KeyId": key_id.clone() }))
            .await
            .unwrap();
        assert_eq!(tags["Tags"][0]["TagKey"], "team");

        // 4. Description updates in place
        client
            .call(
                "UpdateKeyDescription",
                json!({ "KeyId": key_id.clone(), "Description": "rotated wording" }),
            )
            .await
            .unwrap();
        let described = client
            .call("DescribeKey", json!({ "KeyId": key_id.clone() }))
            .await
            .unwrap();
        assert_eq!(described["KeyMetadata"]["Description"], "rotated wording");

        // 5. Envelope encryption works against the same key
        let encrypted = client
            .call(
                "Encrypt",
                json!({ "KeyId": key_id.clone(), "Plaintext": BASE64.encode(b"payload") }),
            )
            .await
            .unwrap();
        let decrypted = client
            .call(
                "Decrypt",
                json!({ "CiphertextBlob": encrypted["CiphertextBlob"] }),
            )
            .await
            .unwrap();
        assert_eq!(decrypted["Plaintext"], BASE64.encode(b"payload"));
    }
}
