use super::{flatten, Handled};
use crate::grades::{self, GradeForm};
use crate::images::ImageUpload;
use crate::ipc::helpers::{load_settings, parse_params, require_backend, respond};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

fn handle_options(state: &mut AppState, req: &Request) -> Handled {
    let count = match state.backend.as_ref() {
        Some(backend) => load_settings(backend, req)?.catalog.grade_count,
        None => crate::config::Settings::defaults().catalog.grade_count,
    };
    Ok(respond(req, Ok(json!({ "grades": grades::grade_options(count) }))))
}

fn handle_list(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    Ok(respond(
        req,
        grades::list_grades(backend).map(|g| json!({ "grades": g })),
    ))
}

fn handle_add(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let form: GradeForm = parse_params(req)?;
    let settings = load_settings(backend, req)?;
    Ok(respond(req, grades::add_grade(backend, &settings.catalog, &form)))
}

#[derive(Deserialize)]
struct EditParams {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    image: Option<ImageUpload>,
}

fn handle_edit(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: EditParams = parse_params(req)?;
    Ok(respond(
        req,
        grades::edit_grade(backend, &p.id, p.name.as_deref(), p.image.as_ref()),
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
        grades::delete_grade(backend, &p.id).map(|()| json!({ "deleted": p.id })),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "grades.options" => handle_options(state, req),
        "grades.list" => handle_list(state, req),
        "grades.add" => handle_add(state, req),
        "grades.edit" => handle_edit(state, req),
        "grades.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
