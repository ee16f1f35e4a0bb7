//! OCI registry client for resolving, combining and pushing manifests.
//!
//! Uses the `oci-distribution` crate to read manifests and blobs from
//! container registries (Docker Hub, GHCR, etc.) and to upload the combined
//! manifest list unchanged.

use std::sync::Arc;

use a3s_imagetools_core::config::{ImagetoolsConfig, RegistryProtocol};
use a3s_imagetools_core::error::{Result, ToolsError};
use async_trait::async_trait;
use futures::future::try_join_all;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::secrets::RegistryAuth as OciRegistryAuth;
use oci_distribution::{Client, Reference, RegistryOperation};

use super::combine::{combine_manifests, detect_media_type, manifest_config, platform_from_config};
use super::credentials::CredentialStore;
use super::descriptor::{is_manifest_media_type, Descriptor, Platform, ACCEPTED_MANIFEST_MEDIA_TYPES};
use super::digest::Digest;
use super::reference::ImageReference;
use crate::imagetools::{Combiner, Pusher, ReadSession, Registry, Resolver};

/// Authentication credentials for a container registry.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    username: Option<String>,
    password: Option<String>,
}

impl RegistryAuth {
    /// Create anonymous authentication (no credentials).
    pub fn anonymous() -> Self {
        Self {
            username: None,
            password: None,
        }
    }

    /// Create basic authentication with username and password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Create authentication from environment variables.
    ///
    /// Reads `REGISTRY_USERNAME` and `REGISTRY_PASSWORD`.
    /// Falls back to anonymous if not set.
    pub fn from_env() -> Self {
        let username = std::env::var("REGISTRY_USERNAME").ok();
        let password = std::env::var("REGISTRY_PASSWORD").ok();

        if username.is_some() && password.is_some() {
            Self { username, password }
        } else {
            Self::anonymous()
        }
    }

    /// Look up credentials for `registry` in the store, falling back to env
    /// vars, then anonymous.
    pub fn from_credential_store(store: &CredentialStore, registry: &str) -> Self {
        match store.get(registry) {
            Ok(Some((username, password))) => return Self::basic(username, password),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(registry, error = %e, "Ignoring unreadable credential store")
            }
        }
        Self::from_env()
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }

    /// Convert to oci-distribution auth type.
    fn to_oci_auth(&self) -> OciRegistryAuth {
        match self.credentials() {
            Some((u, p)) => OciRegistryAuth::Basic(u.to_string(), p.to_string()),
            None => OciRegistryAuth::Anonymous,
        }
    }
}

/// One registry session: an `oci-distribution` client with its own token
/// cache, plus the credentials loaded when the session was opened.
pub struct RegistryClient {
    client: Client,
    credentials: CredentialStore,
}

impl RegistryClient {
    /// Open a session using `config`.
    pub fn connect(config: &ImagetoolsConfig) -> Result<Self> {
        let credentials = match config.credentials_path {
            Some(ref path) => CredentialStore::new(path.clone()),
            None => CredentialStore::default_path()?,
        };
        Ok(Self::with_credentials(config, credentials))
    }

    /// Open a session with an explicit credential store.
    pub fn with_credentials(config: &ImagetoolsConfig, credentials: CredentialStore) -> Self {
        let client = Client::new(ClientConfig {
            protocol: client_protocol(config),
            accept_invalid_certificates: config.accept_invalid_certificates,
            ..Default::default()
        });
        Self {
            client,
            credentials,
        }
    }

    fn auth_for(&self, registry: &str) -> RegistryAuth {
        RegistryAuth::from_credential_store(&self.credentials, registry)
    }

    /// Fetch the manifest a reference points at, with its descriptor.
    pub async fn fetch_manifest(&self, reference: &ImageReference) -> Result<(Vec<u8>, Descriptor)> {
        let reference = reference.with_default_tag();
        let oci_ref = to_oci_reference(&reference)?;
        let auth = self.auth_for(&reference.registry).to_oci_auth();

        tracing::debug!(reference = %reference, "Fetching manifest");

        let (data, digest) = self
            .client
            .pull_manifest_raw(&oci_ref, &auth, ACCEPTED_MANIFEST_MEDIA_TYPES)
            .await
            .map_err(|e| ToolsError::ResolveError {
                reference: reference.to_string(),
                message: e.to_string(),
            })?;

        let media_type = detect_media_type(&data).map_err(|e| ToolsError::ResolveError {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;
        let descriptor = Descriptor {
            media_type,
            digest,
            size: data.len() as i64,
            ..Default::default()
        };
        Ok((data, descriptor))
    }

    /// Fetch the manifest behind `descriptor` from `repository`.
    async fn fetch_by_descriptor(
        &self,
        repository: &ImageReference,
        descriptor: &Descriptor,
    ) -> Result<Vec<u8>> {
        let digest = Digest::parse(&descriptor.digest)?;
        let (data, _) = self
            .fetch_manifest(&repository.with_digest(&digest))
            .await
            .map_err(|e| ToolsError::CombineError(e.to_string()))?;
        Ok(data)
    }

    /// Read the platform of a single-platform manifest from its config blob.
    async fn fetch_platform(&self, repository: &ImageReference, manifest: &[u8]) -> Result<Platform> {
        let config = manifest_config(manifest)?;
        let oci_ref = to_oci_reference(repository)?;

        let mut data: Vec<u8> = Vec::new();
        self.client
            .pull_blob(&oci_ref, &config, &mut data)
            .await
            .map_err(|e| ToolsError::RegistryError {
                registry: repository.registry.clone(),
                message: format!("Failed to pull config blob {}: {}", config.digest, e),
            })?;
        platform_from_config(&data)
    }

    /// Fill in what the index entry for `descriptor` needs: its media type
    /// and, for single-platform manifests, its platform.
    async fn complete_descriptor(
        &self,
        repository: &ImageReference,
        mut descriptor: Descriptor,
    ) -> Result<(Descriptor, Vec<u8>)> {
        let data = self.fetch_by_descriptor(repository, &descriptor).await?;
        if descriptor.media_type.is_empty() {
            descriptor.media_type = detect_media_type(&data)?;
        }
        if descriptor.size == 0 {
            descriptor.size = data.len() as i64;
        }

        if descriptor.platform.is_none() && is_manifest_media_type(&descriptor.media_type) {
            match self.fetch_platform(repository, &data).await {
                Ok(platform) => descriptor.platform = Some(platform),
                Err(e) => tracing::warn!(
                    digest = %descriptor.digest,
                    error = %e,
                    "Manifest has no usable platform, adding it without one"
                ),
            }
        }
        Ok((descriptor, data))
    }
}

#[async_trait]
impl Resolver for RegistryClient {
    async fn resolve(&self, reference: &str) -> Result<(String, Descriptor)> {
        let parsed = ImageReference::parse(reference)?;
        let (_, descriptor) = self.fetch_manifest(&parsed).await?;
        Ok((parsed.with_default_tag().to_string(), descriptor))
    }
}

#[async_trait]
impl Combiner for RegistryClient {
    async fn combine(
        &self,
        repository: &str,
        descriptors: &[Descriptor],
    ) -> Result<(Vec<u8>, Descriptor)> {
        if descriptors.is_empty() {
            return Err(ToolsError::CombineError(
                "no descriptors to combine".to_string(),
            ));
        }
        let repository = ImageReference::parse(repository)?;

        let inputs = try_join_all(
            descriptors
                .iter()
                .map(|d| self.complete_descriptor(&repository, d.clone())),
        )
        .await?;

        combine_manifests(&inputs)
    }
}

#[async_trait]
impl Pusher for RegistryClient {
    async fn push(
        &self,
        reference: &ImageReference,
        descriptor: &Descriptor,
        data: &[u8],
    ) -> Result<()> {
        let oci_ref = to_oci_reference(reference)?;
        let auth = self.auth_for(&reference.registry);
        let push_error = |message: String| ToolsError::PushError {
            reference: reference.to_string(),
            message,
        };

        tracing::info!(
            reference = %reference,
            digest = %descriptor.digest,
            size = data.len(),
            "Pushing manifest"
        );

        self.client
            .auth(&oci_ref, &auth.to_oci_auth(), RegistryOperation::Push)
            .await
            .map_err(|e| push_error(format!("authentication failed: {}", e)))?;

        let content_type = descriptor
            .media_type
            .parse()
            .map_err(|_| push_error(format!("invalid media type {:?}", descriptor.media_type)))?;
        let url = self
            .client
            .push_manifest_raw(&oci_ref, data.to_vec(), content_type)
            .await
            .map_err(|e| push_error(e.to_string()))?;

        tracing::debug!(reference = %reference, url = %url, "Manifest stored");
        Ok(())
    }
}

/// Opens registry sessions. Every session gets a new client and reads
/// credentials again, so reading and pushing never share authorization state.
pub struct RegistryAccess {
    config: ImagetoolsConfig,
}

impl RegistryAccess {
    pub fn new(config: ImagetoolsConfig) -> Self {
        Self { config }
    }

    /// Open a session for direct use (e.g. `inspect`).
    pub fn session(&self) -> Result<RegistryClient> {
        RegistryClient::connect(&self.config)
    }
}

impl Registry for RegistryAccess {
    fn reader(&self) -> Result<Arc<dyn ReadSession>> {
        Ok(Arc::new(self.session()?))
    }

    fn writer(&self) -> Result<Arc<dyn Pusher>> {
        Ok(Arc::new(self.session()?))
    }
}

/// Pick the oci-distribution protocol for the configured registries.
fn client_protocol(config: &ImagetoolsConfig) -> ClientProtocol {
    match config.protocol {
        RegistryProtocol::Http => ClientProtocol::Http,
        RegistryProtocol::Https if config.insecure_registries.is_empty() => ClientProtocol::Https,
        RegistryProtocol::Https => ClientProtocol::HttpsExcept(config.insecure_registries.clone()),
    }
}

/// Convert an ImageReference to an oci-distribution Reference.
fn to_oci_reference(reference: &ImageReference) -> Result<Reference> {
    let ref_str = reference.full_reference();
    ref_str.parse::<Reference>().map_err(|e| {
        ToolsError::InvalidReference(format!("'{}': {}", ref_str, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::combine::ImageIndex;
    use crate::oci::descriptor::{
        DOCKER_MANIFEST_MEDIA_TYPE, OCI_INDEX_MEDIA_TYPE, OCI_MANIFEST_MEDIA_TYPE,
    };
    use tempfile::TempDir;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_registry_auth_anonymous() {
        let auth = RegistryAuth::anonymous();
        assert!(auth.credentials().is_none());
        assert!(matches!(auth.to_oci_auth(), OciRegistryAuth::Anonymous));
    }

    #[test]
    fn test_registry_auth_basic() {
        let auth = RegistryAuth::basic("user", "pass");
        assert_eq!(auth.credentials(), Some(("user", "pass")));
        assert!(matches!(auth.to_oci_auth(), OciRegistryAuth::Basic(_, _)));
    }

    #[test]
    fn test_registry_auth_from_store() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path().join("credentials.json"));
        store.store("ghcr.io", "robot", "token").unwrap();

        let auth = RegistryAuth::from_credential_store(&store, "ghcr.io");
        assert_eq!(auth.credentials(), Some(("robot", "token")));
    }

    #[test]
    fn test_registry_auth_unreadable_store_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();
        let store = CredentialStore::new(path);

        // Must not panic or error; result depends on the environment
        let _ = RegistryAuth::from_credential_store(&store, "ghcr.io");
    }

    #[test]
    fn test_to_oci_reference_with_tag() {
        let r = ImageReference::parse("ghcr.io/a3s-box/code:v0.1.0").unwrap();
        let oci_ref = to_oci_reference(&r).unwrap();
        assert_eq!(oci_ref.registry(), "ghcr.io");
        assert_eq!(oci_ref.repository(), "a3s-box/code");
        assert_eq!(oci_ref.tag(), Some("v0.1.0"));
    }

    #[test]
    fn test_to_oci_reference_with_digest() {
        let digest = format!("sha256:{}", "ab".repeat(32));
        let r = ImageReference::parse(&format!("ghcr.io/a3s-box/code@{}", digest)).unwrap();
        let oci_ref = to_oci_reference(&r).unwrap();
        assert_eq!(oci_ref.digest(), Some(digest.as_str()));
    }

    #[test]
    fn test_client_protocol() {
        let mut config = ImagetoolsConfig::default();
        assert!(matches!(client_protocol(&config), ClientProtocol::Https));

        config.add_insecure_registries(["localhost:5000"]);
        match client_protocol(&config) {
            ClientProtocol::HttpsExcept(hosts) => assert_eq!(hosts, vec!["localhost:5000"]),
            _ => panic!("expected HttpsExcept"),
        }

        config.protocol = RegistryProtocol::Http;
        assert!(matches!(client_protocol(&config), ClientProtocol::Http));
    }

    #[test]
    fn test_registry_access_opens_independent_sessions() {
        let dir = TempDir::new().unwrap();
        let config = ImagetoolsConfig {
            credentials_path: Some(dir.path().join("credentials.json")),
            ..Default::default()
        };
        let access = RegistryAccess::new(config);
        assert!(access.reader().is_ok());
        assert!(access.writer().is_ok());
    }

    /// A plain-HTTP session against `server`, plus the `host:port/org/app`
    /// repository it serves.
    fn mock_session(server: &MockServer, dir: &TempDir) -> (RegistryClient, String) {
        let config = ImagetoolsConfig {
            protocol: RegistryProtocol::Http,
            credentials_path: Some(dir.path().join("credentials.json")),
            ..Default::default()
        };
        let client = RegistryClient::connect(&config).unwrap();
        (client, format!("{}/org/app", server.address()))
    }

    fn image_config(arch: &str, variant: Option<&str>) -> Vec<u8> {
        let mut config = serde_json::json!({
            "architecture": arch,
            "os": "linux",
            "rootfs": {"type": "layers", "diff_ids": []},
            "history": []
        });
        if let Some(variant) = variant {
            config["variant"] = serde_json::Value::from(variant);
        }
        serde_json::to_vec(&config).unwrap()
    }

    fn image_manifest(media_type: &str, config: &[u8]) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "schemaVersion": 2,
            "mediaType": media_type,
            "config": {
                "mediaType": "application/vnd.oci.image.config.v1+json",
                "digest": Digest::from_bytes(config).to_string(),
                "size": config.len()
            },
            "layers": []
        }))
        .unwrap()
    }

    /// Serve `manifest` by digest and its config blob.
    async fn mount_image(server: &MockServer, manifest: &[u8], config: &[u8]) -> String {
        let digest = Digest::from_bytes(manifest).to_string();
        Mock::given(method("GET"))
            .and(path(format!("/v2/org/app/manifests/{}", digest)))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(manifest.to_vec(), OCI_MANIFEST_MEDIA_TYPE),
            )
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v2/org/app/blobs/{}", Digest::from_bytes(config))))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(config.to_vec()))
            .expect(1)
            .mount(server)
            .await;
        digest
    }

    #[tokio::test]
    async fn test_resolve_reads_manifest_metadata() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let body = image_manifest(DOCKER_MANIFEST_MEDIA_TYPE, &image_config("amd64", None));
        let digest = Digest::from_bytes(&body).to_string();

        Mock::given(method("GET"))
            .and(path("/v2/org/app/manifests/amd64"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Docker-Content-Digest", digest.as_str())
                    .set_body_raw(body.clone(), DOCKER_MANIFEST_MEDIA_TYPE),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (client, repo) = mock_session(&server, &dir);
        let (name, descriptor) = client.resolve(&format!("{}:amd64", repo)).await.unwrap();

        assert_eq!(name, format!("{}:amd64", repo));
        assert_eq!(descriptor.media_type, DOCKER_MANIFEST_MEDIA_TYPE);
        assert_eq!(descriptor.digest, digest);
        assert_eq!(descriptor.size, body.len() as i64);
    }

    #[tokio::test]
    async fn test_resolve_missing_manifest_is_resolve_error() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("GET"))
            .and(path("/v2/org/app/manifests/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (client, repo) = mock_session(&server, &dir);
        let err = client.resolve(&format!("{}:gone", repo)).await.unwrap_err();
        assert!(matches!(err, ToolsError::ResolveError { .. }));
    }

    #[tokio::test]
    async fn test_combine_fetches_by_digest_and_fills_platforms() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();

        let amd64_config = image_config("amd64", None);
        let amd64 = image_manifest(OCI_MANIFEST_MEDIA_TYPE, &amd64_config);
        let arm64_config = image_config("arm64", Some("v8"));
        let arm64 = image_manifest(OCI_MANIFEST_MEDIA_TYPE, &arm64_config);
        let amd64_digest = mount_image(&server, &amd64, &amd64_config).await;
        let arm64_digest = mount_image(&server, &arm64, &arm64_config).await;

        let descriptors = vec![
            Descriptor {
                media_type: OCI_MANIFEST_MEDIA_TYPE.to_string(),
                digest: amd64_digest.clone(),
                size: amd64.len() as i64,
                ..Default::default()
            },
            // Bare digest: media type and size come from the fetched body
            Descriptor::from_digest(arm64_digest.clone()),
        ];

        let (client, repo) = mock_session(&server, &dir);
        let (data, descriptor) = client.combine(&repo, &descriptors).await.unwrap();

        assert_eq!(descriptor.media_type, OCI_INDEX_MEDIA_TYPE);
        assert_eq!(descriptor.digest, Digest::from_bytes(&data).to_string());

        let index: ImageIndex = serde_json::from_slice(&data).unwrap();
        let entries: Vec<(String, String, i64)> = index
            .manifests
            .iter()
            .map(|d| {
                let platform = d.platform.as_ref().map(|p| p.to_string()).unwrap_or_default();
                (d.digest.clone(), platform, d.size)
            })
            .collect();
        assert_eq!(
            entries,
            vec![
                (amd64_digest, "linux/amd64".to_string(), amd64.len() as i64),
                (arm64_digest, "linux/arm64/v8".to_string(), arm64.len() as i64),
            ]
        );
    }

    #[tokio::test]
    async fn test_push_sends_exact_bytes_with_media_type() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let data = b"{\n  \"schemaVersion\": 2,\n  \"manifests\": []\n}".to_vec();
        let descriptor = Descriptor {
            media_type: OCI_INDEX_MEDIA_TYPE.to_string(),
            digest: Digest::from_bytes(&data).to_string(),
            size: data.len() as i64,
            ..Default::default()
        };

        Mock::given(method("GET"))
            .and(path("/v2/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v2/org/app/manifests/v1"))
            .and(header("content-type", OCI_INDEX_MEDIA_TYPE))
            .and(body_bytes(data.clone()))
            .respond_with(ResponseTemplate::new(201).insert_header(
                "Location",
                format!("/v2/org/app/manifests/{}", descriptor.digest).as_str(),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let (client, repo) = mock_session(&server, &dir);
        let tag = ImageReference::parse(&format!("{}:v1", repo)).unwrap();
        client.push(&tag, &descriptor, &data).await.unwrap();
    }

    #[tokio::test]
    async fn test_push_rejected_is_push_error() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("PUT"))
            .and(path("/v2/org/app/manifests/v1"))
            .respond_with(ResponseTemplate::new(400).set_body_string("MANIFEST_INVALID"))
            .expect(1)
            .mount(&server)
            .await;

        let (client, repo) = mock_session(&server, &dir);
        let tag = ImageReference::parse(&format!("{}:v1", repo)).unwrap();
        let descriptor = Descriptor {
            media_type: OCI_INDEX_MEDIA_TYPE.to_string(),
            ..Default::default()
        };
        let err = client.push(&tag, &descriptor, b"{}").await.unwrap_err();

        match err {
            ToolsError::PushError { reference, message } => {
                assert_eq!(reference, tag.to_string());
                assert!(message.contains("400"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
