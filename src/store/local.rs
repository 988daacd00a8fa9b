use super::{
    AuthProvider, AuthUser, BlobRef, BlobStore, Document, DocumentStore, SetMode, StoreError,
};
use crate::config::StorageSettings;
use crate::db;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Workspace-local stand-in for the hosted services: documents and accounts
/// live in SQLite, blobs are plain files under the workspace.
pub struct LocalBackend {
    conn: Connection,
    blob_root: PathBuf,
}

impl LocalBackend {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace)?;
        Ok(Self {
            conn,
            blob_root: workspace.join(db::BLOB_DIR),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory(blob_root: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(blob_root)?;
        Ok(Self {
            conn: db::open_in_memory()?,
            blob_root: blob_root.to_path_buf(),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn write_document(&self, collection: &str, id: &str, data: &Document) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO documents(collection, id, data, updated_at) VALUES(?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET
               data = excluded.data,
               updated_at = excluded.updated_at",
            (collection, id, serde_json::to_string(data)?, now()),
        )?;
        Ok(())
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn parse_document(collection: &str, id: &str, raw: &str) -> Result<Document, StoreError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject(format!("{collection}/{id}"))),
    }
}

fn password_digest(uid: &str, password: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{uid}:{password}").as_bytes()))
}

fn checked_blob_path(path: &str) -> Result<(), StoreError> {
    let bad = path.is_empty()
        || path.contains('\\')
        || path
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

impl DocumentStore for LocalBackend {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ? AND id = ?",
                (collection, id),
                |r| r.get(0),
            )
            .optional()?;
        raw.map(|text| parse_document(collection, id, &text))
            .transpose()
    }

    fn get_all(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM documents WHERE collection = ? ORDER BY id")?;
        let rows = stmt
            .query_map([collection], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, raw)| {
                let doc = parse_document(collection, &id, &raw)?;
                Ok((id, doc))
            })
            .collect()
    }

    fn set(
        &self,
        collection: &str,
        id: &str,
        data: &Document,
        mode: SetMode,
    ) -> Result<(), StoreError> {
        match mode {
            SetMode::Overwrite => self.write_document(collection, id, data),
            SetMode::Merge => {
                let mut merged = self.get(collection, id)?.unwrap_or_default();
                for (k, v) in data {
                    merged.insert(k.clone(), v.clone());
                }
                self.write_document(collection, id, &merged)
            }
        }
    }

    fn update(&self, collection: &str, id: &str, fields: &Document) -> Result<(), StoreError> {
        let Some(mut current) = self.get(collection, id)? else {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        };
        for (k, v) in fields {
            current.insert(k.clone(), v.clone());
        }
        self.write_document(collection, id, &current)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            (collection, id),
        )?;
        Ok(())
    }

    fn add(&self, collection: &str, data: &Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.write_document(collection, &id, data)?;
        Ok(id)
    }

    fn query_eq(
        &self,
        collection: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<(String, Document)>, StoreError> {
        if filters.len() > 2 {
            return Err(StoreError::TooManyFilters(filters.len()));
        }
        Ok(self
            .get_all(collection)?
            .into_iter()
            .filter(|(_, doc)| {
                filters
                    .iter()
                    .all(|(field, expected)| doc.get(*field) == Some(expected))
            })
            .collect())
    }
}

impl AuthProvider for LocalBackend {
    fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        let taken: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM auth_accounts WHERE email = ?",
                [email],
                |r| r.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(StoreError::EmailInUse(email.to_string()));
        }
        let uid = Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO auth_accounts(uid, email, password_sha256, created_at) VALUES(?, ?, ?, ?)",
            (&uid, email, password_digest(&uid, password), now()),
        )?;
        Ok(AuthUser {
            uid,
            email: email.to_string(),
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, StoreError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT uid, password_sha256 FROM auth_accounts WHERE email = ?",
                [email],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        match row {
            Some((uid, digest)) if digest == password_digest(&uid, password) => Ok(AuthUser {
                uid,
                email: email.to_string(),
            }),
            _ => Err(StoreError::InvalidCredentials),
        }
    }

    fn delete_account(&self, user: &AuthUser) -> Result<(), StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM auth_accounts WHERE uid = ?", [&user.uid])?;
        if removed == 0 {
            return Err(StoreError::AccountMissing(user.email.clone()));
        }
        Ok(())
    }
}

impl BlobStore for LocalBackend {
    fn upload(&self, path: &str, bytes: &[u8]) -> Result<BlobRef, StoreError> {
        checked_blob_path(path)?;
        let target = self.blob_root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;
        self.conn.execute(
            "INSERT INTO blobs(path, size_bytes, sha256, uploaded_at) VALUES(?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET
               size_bytes = excluded.size_bytes,
               sha256 = excluded.sha256,
               uploaded_at = excluded.uploaded_at",
            (
                path,
                bytes.len() as i64,
                format!("{:x}", Sha256::digest(bytes)),
                now(),
            ),
        )?;
        Ok(BlobRef {
            path: path.to_string(),
        })
    }

    fn download_url(&self, blob: &BlobRef) -> Result<String, StoreError> {
        checked_blob_path(&blob.path)?;
        let known: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM blobs WHERE path = ?", [&blob.path], |r| {
                r.get(0)
            })
            .optional()?;
        if known.is_none() {
            return Err(StoreError::NotFound {
                collection: "blobs".to_string(),
                id: blob.path.clone(),
            });
        }
        let base = StorageSettings::load(&self.conn)
            .ok()
            .and_then(|s| s.public_base_url)
            .unwrap_or_else(|| format!("file://{}", self.blob_root.to_string_lossy()));
        Ok(format!("{}/{}", base.trim_end_matches('/'), blob.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend(tag: &str) -> LocalBackend {
        let dir = std::env::temp_dir().join(format!("schooladmind-local-{}-{}", tag, Uuid::new_v4()));
        LocalBackend::open_in_memory(&dir).expect("open backend")
    }

    fn doc(v: Value) -> Document {
        v.as_object().cloned().expect("object")
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let b = backend("merge");
        b.set("Grades", "Grade 1", &doc(json!({ "a": 1, "b": 2 })), SetMode::Overwrite)
            .expect("set");
        b.set("Grades", "Grade 1", &doc(json!({ "b": 3 })), SetMode::Merge)
            .expect("merge");
        let got = b.get("Grades", "Grade 1").expect("get").expect("exists");
        assert_eq!(Value::Object(got), json!({ "a": 1, "b": 3 }));

        b.set("Grades", "Grade 1", &doc(json!({ "c": 4 })), SetMode::Overwrite)
            .expect("overwrite");
        let got = b.get("Grades", "Grade 1").expect("get").expect("exists");
        assert_eq!(Value::Object(got), json!({ "c": 4 }));
    }

    #[test]
    fn update_requires_existing_document() {
        let b = backend("update");
        let res = b.update("subjects", "missing", &doc(json!({ "x": 1 })));
        assert!(matches!(res, Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn query_eq_rejects_three_filters() {
        let b = backend("query");
        let res = b.query_eq(
            "subjects",
            &[("a", json!(1)), ("b", json!(2)), ("c", json!(3))],
        );
        assert!(matches!(res, Err(StoreError::TooManyFilters(3))));
    }

    #[test]
    fn sign_in_checks_password_and_delete_removes_account() {
        let b = backend("auth");
        let user = b
            .create_account("0711111111@example.com", "secret1")
            .expect("create");
        assert!(matches!(
            b.create_account("0711111111@example.com", "other"),
            Err(StoreError::EmailInUse(_))
        ));
        assert!(matches!(
            b.sign_in("0711111111@example.com", "wrong"),
            Err(StoreError::InvalidCredentials)
        ));
        let signed = b
            .sign_in("0711111111@example.com", "secret1")
            .expect("sign in");
        assert_eq!(signed, user);
        b.delete_account(&signed).expect("delete");
        assert!(b.sign_in("0711111111@example.com", "secret1").is_err());
    }

    #[test]
    fn blob_paths_cannot_escape_the_root() {
        let b = backend("blob");
        assert!(matches!(
            b.upload("../outside.png", b"x"),
            Err(StoreError::InvalidPath(_))
        ));
        let r = b.upload("subjects/maths.png", b"png").expect("upload");
        let url = b.download_url(&r).expect("url");
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/subjects/maths.png"));
    }
}
