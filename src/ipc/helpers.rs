use crate::config::Settings;
use crate::error::AppError;
use crate::ipc::error::{app_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::LocalBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn parse_params<T: DeserializeOwned>(req: &Request) -> Result<T, serde_json::Value> {
    let params = if req.params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        req.params.clone()
    };
    serde_json::from_value(params)
        .map_err(|e| err(&req.id, "bad_params", format!("invalid params: {}", e), None))
}

pub fn require_backend<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a LocalBackend, serde_json::Value> {
    state
        .backend
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn load_settings(backend: &LocalBackend, req: &Request) -> Result<Settings, serde_json::Value> {
    Settings::load(backend.conn())
        .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))
}

pub fn respond<T: Serialize>(req: &Request, result: Result<T, AppError>) -> serde_json::Value {
    match result {
        Ok(v) => match serde_json::to_value(v) {
            Ok(v) => ok(&req.id, v),
            Err(e) => err(&req.id, "internal", e.to_string(), None),
        },
        Err(e) => app_err(&req.id, &e),
    }
}
