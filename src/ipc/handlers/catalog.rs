use super::{flatten, Handled};
use crate::catalog::{self, CatalogLessonForm};
use crate::images::ImageUpload;
use crate::ipc::helpers::{parse_params, require_backend, respond};
use crate::ipc::types::{AppState, Request};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct GradeParams {
    grade: String,
}

fn handle_subjects(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: GradeParams = parse_params(req)?;
    Ok(respond(
        req,
        catalog::list_subjects(backend, &p.grade).map(|s| json!({ "subjects": s })),
    ))
}

#[derive(Deserialize)]
struct DocParams {
    grade: String,
    subject: String,
}

fn handle_lessons(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: DocParams = parse_params(req)?;
    Ok(respond(req, catalog::get_lessons(backend, &p.grade, &p.subject)))
}

fn handle_add_lesson(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let form: CatalogLessonForm = parse_params(req)?;
    Ok(respond(req, catalog::add_lesson(backend, &form)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameLessonParams {
    grade: String,
    subject: String,
    old_name: String,
    new_name: String,
    #[serde(default)]
    image: Option<ImageUpload>,
}

fn handle_rename_lesson(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: RenameLessonParams = parse_params(req)?;
    Ok(respond(
        req,
        catalog::rename_lesson(
            backend,
            &p.grade,
            &p.subject,
            &p.old_name,
            &p.new_name,
            p.image.as_ref(),
        ),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteLessonParams {
    grade: String,
    subject: String,
    lesson_name: String,
}

fn handle_delete_lesson(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: DeleteLessonParams = parse_params(req)?;
    Ok(respond(
        req,
        catalog::delete_lesson(backend, &p.grade, &p.subject, &p.lesson_name),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenameSubjectParams {
    grade: String,
    old_subject: String,
    new_subject: String,
}

fn handle_rename_subject(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: RenameSubjectParams = parse_params(req)?;
    Ok(respond(
        req,
        catalog::rename_subject(backend, &p.grade, &p.old_subject, &p.new_subject),
    ))
}

fn handle_delete_subject(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    let p: DocParams = parse_params(req)?;
    Ok(respond(
        req,
        catalog::delete_subject_document(backend, &p.grade, &p.subject)
            .map(|()| json!({ "deleted": p.subject })),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "catalog.subjects" => handle_subjects(state, req),
        "catalog.lessons" => handle_lessons(state, req),
        "catalog.addLesson" => handle_add_lesson(state, req),
        "catalog.renameLesson" => handle_rename_lesson(state, req),
        "catalog.deleteLesson" => handle_delete_lesson(state, req),
        "catalog.renameSubject" => handle_rename_subject(state, req),
        "catalog.deleteSubject" => handle_delete_subject(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
