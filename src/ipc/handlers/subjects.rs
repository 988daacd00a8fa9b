use super::{flatten, Handled};
use crate::ipc::helpers::{load_settings, parse_params, require_backend, respond};
use crate::ipc::types::{AppState, Request};
use crate::subjects::{self, SubjectForm};
use serde::Deserialize;
use serde_json::json;

fn handle_add(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let form: SubjectForm = parse_params(req)?;
    let settings = load_settings(backend, req)?;
    Ok(respond(req, subjects::add_subject(backend, &settings.catalog, &form)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    #[serde(default)]
    grade: Option<String>,
    #[serde(default = "first_page")]
    page: usize,
}

fn first_page() -> usize {
    1
}

fn handle_list(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: ListParams = parse_params(req)?;
    let settings = load_settings(backend, req)?;
    Ok(respond(
        req,
        subjects::list_subjects(
            backend,
            p.grade.as_deref(),
            p.page,
            settings.pagination.subjects_page_size,
        ),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditParams {
    id: String,
    subject_name: String,
    grade: String,
}

fn handle_edit(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: EditParams = parse_params(req)?;
    Ok(respond(
        req,
        subjects::edit_subject(backend, &p.id, &p.subject_name, &p.grade),
    ))
}

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

fn handle_delete(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: IdParams = parse_params(req)?;
    Ok(respond(
        req,
        subjects::delete_subject(backend, &p.id).map(|()| json!({ "deleted": p.id })),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "subjects.add" => handle_add(state, req),
        "subjects.list" => handle_list(state, req),
        "subjects.edit" => handle_edit(state, req),
        "subjects.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
