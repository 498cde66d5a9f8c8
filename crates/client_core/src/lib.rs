//! Client core for the VeriDoc document verification service.
//!
//! The backend owns storage, hashing, and blockchain anchoring; this
//! crate owns the HTTP client for it plus the view-state machinery that
//! front ends bind to. Wallet signing and credential persistence are
//! injected behind traits so nothing here touches ambient process state.

use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::Network,
    error::ApiError,
    protocol::{
        DocumentDetail, DocumentListResponse, DocumentPage, LoginRequest, LoginResponse,
        NonceResponse, UploadReceipt,
    },
};
use tracing::{debug, info, warn};

pub mod error;
pub mod viewstate;

pub use error::FetchError;
pub use viewstate::{
    RefreshListener, RefreshSignal, RequestToken, UploadController, UploadTuning, ViewController,
    ViewState,
};


/// Storage for the bearer credential issued at login. Injected so callers
/// and tests decide where the token lives.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

pub struct MissingCredentialStore;

impl CredentialStore for MissingCredentialStore {
    fn load(&self) -> Option<String> {
        None
    }

    fn store(&self, _token: &str) -> Result<()> {
        Err(anyhow!("no credential store configured"))
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Produces the wallet signature over the server-issued login message.
/// Actual key handling lives in the wallet; this crate never sees key
/// material.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn sign_message(&self, message: &str) -> Result<String>;
}

pub struct MissingWalletSigner;

#[async_trait]
impl WalletSigner for MissingWalletSigner {
    async fn sign_message(&self, _message: &str) -> Result<String> {
        Err(anyhow!("wallet signer is unavailable"))
    }
}

/// HTTP client for the document API. One instance per backend; all
/// methods are `&self` and safe to share across tasks.
pub struct DocumentClient<S: CredentialStore> {
    http: Client,
    api_base_url: String,
    credentials: S,
}

impl<S: CredentialStore> DocumentClient<S> {
    pub fn new(api_base_url: impl Into<String>, credentials: S) -> Self {
        let api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            api_base_url,
            credentials,
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn credentials(&self) -> &S {
        &self.credentials
    }

    pub async fn fetch_login_message(&self) -> Result<String, FetchError> {
        let res = self
            .http
            .get(format!("{}/auth/nonce", self.api_base_url))
            .send()
            .await?;
        let nonce: NonceResponse = decode_json(res).await?;
        Ok(nonce.message_string)
    }

    pub async fn login_with_signature(&self, signature: &str) -> Result<String, FetchError> {
        let res = self
            .http
            .post(format!("{}/auth/login", self.api_base_url))
            .json(&LoginRequest {
                signature: signature.to_string(),
            })
            .send()
            .await?;
        let body: LoginResponse = decode_json(res).await?;
        Ok(body.access_token)
    }

    /// Full sign-in round trip: fetch the login message, have the wallet
    /// sign it, exchange the signature for a bearer token, persist it.
    pub async fn login(&self, signer: &dyn WalletSigner) -> Result<String> {
        let message = self
            .fetch_login_message()
            .await
            .context("failed to fetch login message from server")?;
        let signature = signer
            .sign_message(&message)
            .await
            .context("wallet signing failed")?;
        let token = self
            .login_with_signature(&signature)
            .await
            .context("login rejected by server")?;
        self.credentials.store(&token)?;
        info!("stored bearer credential after wallet login");
        Ok(token)
    }

    pub async fn list_documents(&self, network: Network) -> Result<DocumentPage, FetchError> {
        let request = self
            .http
            .get(format!("{}/documents", self.api_base_url))
            .query(&[("network", network.as_str())]);
        let res = self.with_bearer(request).send().await?;
        let body: DocumentListResponse = decode_json(res).await?;
        Ok(body.data)
    }

    /// Detail lookup by document id or CID. The id route wraps the body
    /// in a `data` object while the CID route returns it bare; both are
    /// accepted.
    pub async fn document_detail(
        &self,
        key: &str,
        network: Network,
    ) -> Result<DocumentDetail, FetchError> {
        let request = self
            .http
            .get(format!("{}/documents/{key}", self.api_base_url))
            .query(&[("network", network.as_str())]);
        let res = self.with_bearer(request).send().await?;
        let body: MaybeWrapped<DocumentDetail> = decode_json(res).await?;
        Ok(body.into_inner())
    }

    /// Content search: the backend hashes the uploaded bytes and looks
    /// the digest up on chain. 404 means the document was never
    /// registered.
    pub async fn verify_file(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        mime_type: Option<&str>,
    ) -> Result<DocumentDetail, FetchError> {
        let form = multipart::Form::new().part("file", file_part(filename, bytes, mime_type)?);
        let res = self
            .http
            .post(format!("{}/documents/search", self.api_base_url))
            .multipart(form)
            .send()
            .await?;
        decode_json(res).await
    }

    pub async fn upload_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        mime_type: Option<&str>,
        network: Network,
    ) -> Result<UploadReceipt, FetchError> {
        // Uploads always require authentication; fail before the network
        // trip when no credential is present.
        let Some(token) = self.credentials.load() else {
            return Err(FetchError::Unauthorized);
        };
        let form = multipart::Form::new()
            .part("file", file_part(filename, bytes, mime_type)?)
            .text("network", network.as_str());
        let res = self
            .http
            .post(format!("{}/documents", self.api_base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        decode_json(res).await
    }

    fn with_bearer(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.load() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum MaybeWrapped<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> MaybeWrapped<T> {
    fn into_inner(self) -> T {
        match self {
            MaybeWrapped::Wrapped { data } => data,
            MaybeWrapped::Bare(value) => value,
        }
    }
}

fn file_part(
    filename: &str,
    bytes: Vec<u8>,
    mime_type: Option<&str>,
) -> Result<multipart::Part, FetchError> {
    let part = multipart::Part::bytes(bytes).file_name(filename.to_string());
    match mime_type {
        Some(mime) => part
            .mime_str(mime)
            .map_err(|_| FetchError::InvalidInput(format!("invalid mime type '{mime}'"))),
        None => Ok(part),
    }
}

async fn decode_json<T: DeserializeOwned>(res: Response) -> Result<T, FetchError> {
    let status = res.status();
    if status.is_success() {
        res.json::<T>().await.map_err(|err| {
            warn!(error = %err, "failed to decode success response body");
            FetchError::Server("malformed response from server".to_string())
        })
    } else {
        let body = res.json::<ApiError>().await.ok();
        let classified = FetchError::classify(status, body);
        debug!(%status, error = %classified, "document api request failed");
        Err(classified)
    }
}
