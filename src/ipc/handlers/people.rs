use super::{flatten, Handled};
use crate::ipc::helpers::{load_settings, parse_params, require_backend, respond};
use crate::ipc::types::{AppState, Request};
use crate::people::{self, PersonForm, PersonKind, PersonUpdate};
use serde::Deserialize;
use serde_json::json;

fn handle_register(state: &mut AppState, req: &Request, kind: PersonKind) -> Handled {
    let backend = require_backend(state, req)?;
    let form: PersonForm = parse_params(req)?;
    let settings = load_settings(backend, req)?;
    Ok(respond(
        req,
        people::register(backend, kind, &settings.accounts, &form),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    #[serde(default)]
    filter: Option<String>,
    #[serde(default = "first_page")]
    page: usize,
}

fn first_page() -> usize {
    1
}

fn handle_list(state: &mut AppState, req: &Request, kind: PersonKind) -> Handled {
    let backend = require_backend(state, req)?;
    let p: ListParams = parse_params(req)?;
    let settings = load_settings(backend, req)?;
    Ok(respond(
        req,
        people::list(
            backend,
            kind,
            p.filter.as_deref(),
            p.page,
            settings.pagination.people_page_size,
        ),
    ))
}

#[derive(Deserialize)]
struct UpdateParams {
    id: String,
    #[serde(default)]
    fields: PersonUpdate,
}

fn handle_update(state: &mut AppState, req: &Request, kind: PersonKind) -> Handled {
    let backend = require_backend(state, req)?;
    let p: UpdateParams = parse_params(req)?;
    let settings = load_settings(backend, req)?;
    Ok(respond(
        req,
        people::update(backend, kind, &settings.accounts, &p.id, &p.fields),
    ))
}

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

fn handle_delete(state: &mut AppState, req: &Request, kind: PersonKind) -> Handled {
    let backend = require_backend(state, req)?;
    let p: IdParams = parse_params(req)?;
    Ok(respond(
        req,
        people::delete(backend, kind, &p.id).map(|()| json!({ "deleted": p.id })),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (family, op) = req.method.split_once('.')?;
    let kind = match family {
        "teachers" => PersonKind::Teacher,
        "students" => PersonKind::Student,
        _ => return None,
    };
    let handled = match op {
        "register" => handle_register(state, req, kind),
        "list" => handle_list(state, req, kind),
        "update" => handle_update(state, req, kind),
        "delete" => handle_delete(state, req, kind),
        _ => return None,
    };
    Some(flatten(handled))
}
