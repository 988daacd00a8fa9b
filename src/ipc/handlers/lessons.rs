use super::{flatten, Handled};
use crate::ipc::helpers::{parse_params, require_backend, respond};
use crate::ipc::types::{AppState, Request};
use crate::lessons::{self, LessonForm};
use serde::Deserialize;
use serde_json::json;

fn handle_add(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let form: LessonForm = parse_params(req)?;
    Ok(respond(req, lessons::add_lesson(backend, &form)))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ListParams {
    grade: Option<String>,
    subject: Option<String>,
}

fn handle_list(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: ListParams = parse_params(req)?;
    Ok(respond(
        req,
        lessons::list_lessons(backend, p.grade.as_deref(), p.subject.as_deref())
            .map(|l| json!({ "lessons": l })),
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
        lessons::delete_lesson(backend, &p.id).map(|()| json!({ "deleted": p.id })),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "lessons.add" => handle_add(state, req),
        "lessons.list" => handle_list(state, req),
        "lessons.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
