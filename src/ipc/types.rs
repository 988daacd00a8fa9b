use crate::lesson_edit::LessonEdit;
use crate::session::Session;
use crate::store::LocalBackend;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub backend: Option<LocalBackend>,
    pub session: Option<Session>,
    pub lesson_edit: LessonEdit,
}
