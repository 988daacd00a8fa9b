use super::{flatten, Handled};
use crate::config::{load_section, update_section, SetupSection};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_backend;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map};
use tracing::info;

fn handle_setup_get(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let mut out = Map::new();
    for section in SetupSection::ALL {
        let mut value = load_section(backend.conn(), section)
            .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?;
        if section == SetupSection::Admin && state.session.is_none() {
            value["password"] = serde_json::Value::Null;
        }
        out.insert(section.name().to_string(), value);
    }
    Ok(ok(&req.id, serde_json::Value::Object(out)))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return Err(err(&req.id, "bad_params", "missing section", None));
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return Err(err(&req.id, "bad_params", "unknown section", None));
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return Err(err(&req.id, "bad_params", "patch must be an object", None));
    };

    let updated = update_section(backend.conn(), section, patch_obj)
        .map_err(|e| err(&req.id, "db_update_failed", e.to_string(), None))?
        .map_err(|msg| err(&req.id, "bad_params", msg, None))?;
    info!(section = section.name(), "settings updated");
    Ok(ok(&req.id, json!({ "section": section.name(), "value": updated })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "setup.get" => handle_setup_get(state, req),
        "setup.update" => handle_setup_update(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
