//! Flat lesson records in the `lessons` collection. They repeat the
//! grade/subject names as plain strings and are not linked to catalog documents.

use crate::error::AppError;
use crate::store::{from_document, to_document, DocumentStore};
use crate::validation::{self, Check, Form, Rule};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const LESSONS: &str = "lessons";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LessonForm {
    pub grade: String,
    pub subject: String,
    pub lesson_name: String,
    pub description: String,
    pub link: String,
}

impl Form for LessonForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "grade" => Some(&self.grade),
            "subject" => Some(&self.subject),
            "lessonName" => Some(&self.lesson_name),
            "description" => Some(&self.description),
            "link" => Some(&self.link),
            _ => None,
        }
    }
}

fn lesson_rules() -> Vec<Rule> {
    vec![
        Rule::new("grade", Check::Required, "Grade is required"),
        Rule::new("subject", Check::Required, "Subject is required"),
        Rule::new("lessonName", Check::Required, "Lesson name is required"),
        Rule::new("lessonName", Check::MaxLen(100), "Must be 100 characters or less"),
        Rule::new("link", Check::Url, "Invalid URL"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonDoc {
    grade: String,
    subject: String,
    lesson_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub grade: String,
    pub subject: String,
    pub lesson_name: String,
    pub description: String,
    pub link: String,
}

impl Lesson {
    fn new(id: String, d: LessonDoc) -> Self {
        Self {
            id,
            grade: d.grade,
            subject: d.subject,
            lesson_name: d.lesson_name,
            description: d.description,
            link: d.link,
        }
    }
}

pub fn add_lesson(store: &dyn DocumentStore, form: &LessonForm) -> Result<Lesson, AppError> {
    validation::validate(form, &lesson_rules(), validation::today())
        .map_err(AppError::Validation)?;
    let doc = LessonDoc {
        grade: form.grade.trim().to_string(),
        subject: form.subject.trim().to_string(),
        lesson_name: form.lesson_name.trim().to_string(),
        description: form.description.trim().to_string(),
        link: form.link.trim().to_string(),
    };
    let id = store.add(LESSONS, &to_document(&doc)?)?;
    info!(collection = LESSONS, id = %id, "lesson added");
    Ok(Lesson::new(id, doc))
}

pub fn list_lessons(
    store: &dyn DocumentStore,
    grade: Option<&str>,
    subject: Option<&str>,
) -> Result<Vec<Lesson>, AppError> {
    let wanted = |filter: Option<&str>, value: &str| {
        filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| f == value)
            .unwrap_or(true)
    };
    let mut out = Vec::new();
    for (id, doc) in store.get_all(LESSONS)? {
        let lesson = Lesson::new(id, from_document(doc)?);
        if wanted(grade, &lesson.grade) && wanted(subject, &lesson.subject) {
            out.push(lesson);
        }
    }
    Ok(out)
}

pub fn delete_lesson(store: &dyn DocumentStore, id: &str) -> Result<(), AppError> {
    if store.get(LESSONS, id)?.is_none() {
        return Err(AppError::NotFound(format!("lesson not found: {}", id)));
    }
    store.delete(LESSONS, id)?;
    info!(collection = LESSONS, id, "lesson deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalBackend;

    fn backend() -> LocalBackend {
        let dir = std::env::temp_dir().join(format!("schooladmind-lessons-{}", uuid::Uuid::new_v4()));
        LocalBackend::open_in_memory(&dir).expect("backend")
    }

    fn form(grade: &str, subject: &str, name: &str, link: &str) -> LessonForm {
        LessonForm {
            grade: grade.into(),
            subject: subject.into(),
            lesson_name: name.into(),
            description: String::new(),
            link: link.into(),
        }
    }

    #[test]
    fn bad_link_is_rejected_and_empty_link_is_fine() {
        let b = backend();
        let res = add_lesson(&b, &form("Grade 8", "Science", "Cells", "not a url"));
        assert!(matches!(res, Err(AppError::Validation(ref f)) if f[0].message == "Invalid URL"));
        add_lesson(&b, &form("Grade 8", "Science", "Cells", "")).expect("no link");
        add_lesson(&b, &form("Grade 8", "Science", "Atoms", "https://example.org/atoms")).expect("link");
    }

    #[test]
    fn list_filters_and_delete_by_generated_id() {
        let b = backend();
        let cells = add_lesson(&b, &form("Grade 8", "Science", "Cells", "")).expect("add");
        add_lesson(&b, &form("Grade 8", "History", "Kings", "")).expect("add");
        add_lesson(&b, &form("Grade 9", "Science", "Forces", "")).expect("add");

        assert_eq!(list_lessons(&b, None, None).expect("list").len(), 3);
        assert_eq!(list_lessons(&b, Some("Grade 8"), None).expect("list").len(), 2);
        let sci8 = list_lessons(&b, Some("Grade 8"), Some("Science")).expect("list");
        assert_eq!(sci8, vec![cells.clone()]);

        delete_lesson(&b, &cells.id).expect("delete");
        assert!(matches!(delete_lesson(&b, &cells.id), Err(AppError::NotFound(_))));
    }
}
