//! Boundaries to the document database, the authentication provider and the
//! blob store. `LocalBackend` implements all three over the workspace.

mod local;

pub use local::LocalBackend;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("email already in use: {0}")]
    EmailInUse(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account no longer exists: {0}")]
    AccountMissing(String),
    #[error("equality queries accept at most two filters, got {0}")]
    TooManyFilters(usize),
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    #[error("stored value is not a JSON object: {0}")]
    NotAnObject(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Shallow merge of top-level fields into the existing document.
    Merge,
    Overwrite,
}

pub trait DocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;
    /// All documents of a collection ordered by id.
    fn get_all(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError>;
    fn set(&self, collection: &str, id: &str, data: &Document, mode: SetMode)
        -> Result<(), StoreError>;
    /// Fails with `NotFound` when the document does not exist.
    fn update(&self, collection: &str, id: &str, fields: &Document) -> Result<(), StoreError>;
    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
    /// Inserts under a freshly generated id and returns it.
    fn add(&self, collection: &str, data: &Document) -> Result<String, StoreError>;
    fn query_eq(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<(String, Document)>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

pub trait AuthProvider {
    fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, StoreError>;
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, StoreError>;
    /// Deletes the account of a user obtained from `sign_in` or `create_account`.
    fn delete_account(&self, user: &AuthUser) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub path: String,
}

pub trait BlobStore {
    /// Stores `bytes` at `path`, replacing anything already there.
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<BlobRef, StoreError>;
    fn download_url(&self, blob: &BlobRef) -> Result<String, StoreError>;
}

pub trait Backend: DocumentStore + AuthProvider + BlobStore {
    fn documents(&self) -> &dyn DocumentStore;
    fn auth(&self) -> &dyn AuthProvider;
    fn blobs(&self) -> &dyn BlobStore;
}

impl<T: DocumentStore + AuthProvider + BlobStore> Backend for T {
    fn documents(&self) -> &dyn DocumentStore {
        self
    }
    fn auth(&self) -> &dyn AuthProvider {
        self
    }
    fn blobs(&self) -> &dyn BlobStore {
        self
    }
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::NotAnObject(other.to_string())),
    }
}

pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
