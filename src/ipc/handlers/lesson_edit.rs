use super::{flatten, Handled};
use crate::images::ImageUpload;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{parse_params, respond};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BeginParams {
    grade: String,
    subject: String,
    lesson_name: String,
}

fn handle_begin(state: &mut AppState, req: &Request) -> Handled {
    let p: BeginParams = parse_params(req)?;
    state.lesson_edit.begin(&p.grade, &p.subject, &p.lesson_name);
    Ok(respond(req, Ok(&state.lesson_edit)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitParams {
    new_name: String,
    #[serde(default)]
    image: Option<ImageUpload>,
}

fn handle_commit(state: &mut AppState, req: &Request) -> Handled {
    let p: CommitParams = parse_params(req)?;
    let Some(backend) = state.backend.as_ref() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = state
        .lesson_edit
        .commit(backend, &p.new_name, p.image.as_ref())
        .map(|lessons| json!({ "lessons": lessons, "flow": &state.lesson_edit }));
    Ok(respond(req, result))
}

fn handle_cancel(state: &mut AppState, req: &Request) -> Handled {
    state.lesson_edit.cancel();
    Ok(respond(req, Ok(&state.lesson_edit)))
}

fn handle_get(state: &mut AppState, req: &Request) -> Handled {
    Ok(ok(&req.id, json!(state.lesson_edit)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "lessonEdit.begin" => handle_begin(state, req),
        "lessonEdit.commit" => handle_commit(state, req),
        "lessonEdit.cancel" => handle_cancel(state, req),
        "lessonEdit.get" => handle_get(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
