use super::{flatten, Handled};
use crate::error::AppError;
use crate::ipc::helpers::{require_backend, respond};
use crate::ipc::types::{AppState, Request};
use crate::lessons;
use crate::people::{self, PersonKind};
use crate::store::LocalBackend;
use serde_json::{json, Value};

const PREVIEW: usize = 5;

fn summary(backend: &LocalBackend) -> Result<Value, AppError> {
    let teachers = people::list(backend, PersonKind::Teacher, None, 1, PREVIEW)?;
    let students = people::list(backend, PersonKind::Student, None, 1, PREVIEW)?;
    let mut all_lessons = lessons::list_lessons(backend, None, None)?;
    let lesson_count = all_lessons.len();
    all_lessons.truncate(PREVIEW);
    Ok(json!({
        "teacherCount": teachers.total_items,
        "studentCount": students.total_items,
        "lessonCount": lesson_count,
        "teachers": teachers.items,
        "students": students.items,
        "lessons": all_lessons,
    }))
}

fn handle_summary(state: &mut AppState, req: &Request) -> Handled {
    let backend = require_backend(state, req)?;
    Ok(respond(req, summary(backend)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "dashboard.summary" => handle_summary(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
