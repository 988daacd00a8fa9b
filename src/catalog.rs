//! Catalog Store: one document per (grade, subject) holding the ordered lesson
//! names and the subject image.
//!
//! Lesson names are not de-duplicated. Adding a name twice stores it twice,
//! renaming rewrites every equal entry and deleting removes every equal entry.

use crate::error::AppError;
use crate::images::{self, ImageUpload, SUBJECT_IMAGES};
use crate::saga::Saga;
use crate::store::{from_document, to_document, Backend, Document, DocumentStore, SetMode};
use crate::validation::{self, Check, Form, Rule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

pub const LESSON_NAME_MAX: usize = 100;

/// Grade and subject keys are trimmed on every read and write.
fn keys<'a>(grade: &'a str, subject: &'a str) -> (&'a str, &'a str) {
    (grade.trim(), subject.trim())
}

fn collection(grade: &str) -> String {
    format!("catalog/{}", grade.trim())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDoc {
    #[serde(default)]
    lesson_list: Vec<String>,
    #[serde(default)]
    subject_name: String,
    #[serde(default)]
    subject_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonsView {
    pub lesson_list: Vec<String>,
    pub subject_image: Option<String>,
}

impl From<CatalogDoc> for LessonsView {
    fn from(d: CatalogDoc) -> Self {
        Self {
            lesson_list: d.lesson_list,
            subject_image: d.subject_image,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogLessonForm {
    pub grade: String,
    pub subject: String,
    pub lesson_name: String,
    pub image: Option<ImageUpload>,
}

impl Form for CatalogLessonForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "grade" => Some(&self.grade),
            "subject" => Some(&self.subject),
            "lessonName" => Some(&self.lesson_name),
            _ => None,
        }
    }
}

fn lesson_rules() -> Vec<Rule> {
    vec![
        Rule::new("grade", Check::Required, "Grade is required"),
        Rule::new("subject", Check::Required, "Subject is required"),
        Rule::new("lessonName", Check::Required, "Lesson name is required"),
        Rule::new(
            "lessonName",
            Check::MaxLen(LESSON_NAME_MAX),
            "Must be 100 characters or less",
        ),
    ]
}

fn check_lesson_name(grade: &str, subject: &str, name: &str) -> Result<(), AppError> {
    let form = CatalogLessonForm {
        grade: grade.to_string(),
        subject: subject.to_string(),
        lesson_name: name.to_string(),
        image: None,
    };
    validation::validate(&form, &lesson_rules(), validation::today()).map_err(AppError::Validation)
}

fn load(store: &dyn DocumentStore, grade: &str, subject: &str) -> Result<Option<CatalogDoc>, AppError> {
    match store.get(&collection(grade), subject)? {
        Some(doc) => Ok(Some(from_document(doc)?)),
        None => Ok(None),
    }
}

fn require(store: &dyn DocumentStore, grade: &str, subject: &str) -> Result<CatalogDoc, AppError> {
    load(store, grade, subject)?.ok_or_else(|| {
        AppError::NotFound(format!("no lessons recorded for {} / {}", grade, subject))
    })
}

fn write_fields(
    store: &dyn DocumentStore,
    grade: &str,
    subject: &str,
    lesson_list: &[String],
    subject_image: Option<&str>,
) -> Result<(), AppError> {
    let mut fields = Document::new();
    fields.insert(
        "lessonList".into(),
        Value::Array(lesson_list.iter().cloned().map(Value::String).collect()),
    );
    if let Some(url) = subject_image {
        fields.insert("subjectImage".into(), Value::String(url.to_string()));
    }
    store.update(&collection(grade), subject, &fields)?;
    Ok(())
}

/// Subject document ids recorded for a grade.
pub fn list_subjects(store: &dyn DocumentStore, grade: &str) -> Result<Vec<String>, AppError> {
    Ok(store
        .get_all(&collection(grade))?
        .into_iter()
        .map(|(id, _)| id)
        .collect())
}

/// Missing documents read as an empty list.
pub fn get_lessons(
    store: &dyn DocumentStore,
    grade: &str,
    subject: &str,
) -> Result<LessonsView, AppError> {
    let (grade, subject) = keys(grade, subject);
    Ok(load(store, grade, subject)?.map(Into::into).unwrap_or_default())
}

pub fn add_lesson(backend: &dyn Backend, form: &CatalogLessonForm) -> Result<LessonsView, AppError> {
    validation::validate(form, &lesson_rules(), validation::today())
        .map_err(AppError::Validation)?;
    let store = backend.documents();
    let (grade, subject) = keys(&form.grade, &form.subject);
    let lesson_name = form.lesson_name.trim().to_string();

    match load(store, grade, subject)? {
        None => {
            let Some(image) = form.image.as_ref() else {
                return Err(AppError::invalid(
                    "image",
                    "A subject image is required for the first lesson",
                ));
            };
            let url = images::upload_image(backend.blobs(), SUBJECT_IMAGES, image)?;
            let doc = CatalogDoc {
                lesson_list: vec![lesson_name],
                subject_name: subject.to_string(),
                subject_image: Some(url),
            };
            store.set(&collection(grade), subject, &to_document(&doc)?, SetMode::Overwrite)?;
            info!(grade, subject, "catalog document created");
            Ok(doc.into())
        }
        Some(mut doc) => {
            doc.lesson_list.push(lesson_name);
            let replaced = match form.image.as_ref() {
                Some(image) => Some(images::upload_image(backend.blobs(), SUBJECT_IMAGES, image)?),
                None => None,
            };
            write_fields(store, grade, subject, &doc.lesson_list, replaced.as_deref())?;
            if let Some(url) = replaced {
                doc.subject_image = Some(url);
            }
            info!(grade, subject, lessons = doc.lesson_list.len(), "lesson added");
            Ok(doc.into())
        }
    }
}

/// Rewrites every entry equal to `old_name`. Optionally replaces the subject image.
pub fn rename_lesson(
    backend: &dyn Backend,
    grade: &str,
    subject: &str,
    old_name: &str,
    new_name: &str,
    image: Option<&ImageUpload>,
) -> Result<LessonsView, AppError> {
    check_lesson_name(grade, subject, new_name)?;
    let (grade, subject) = keys(grade, subject);
    let old_name = old_name.trim();
    let store = backend.documents();
    let mut doc = require(store, grade, subject)?;
    if !doc.lesson_list.iter().any(|l| l == old_name) {
        return Err(AppError::NotFound(format!("lesson not found: {}", old_name)));
    }
    let new_name = new_name.trim();
    for lesson in doc.lesson_list.iter_mut().filter(|l| l.as_str() == old_name) {
        *lesson = new_name.to_string();
    }
    let replaced = match image {
        Some(image) => Some(images::upload_image(backend.blobs(), SUBJECT_IMAGES, image)?),
        None => None,
    };
    write_fields(store, grade, subject, &doc.lesson_list, replaced.as_deref())?;
    if let Some(url) = replaced {
        doc.subject_image = Some(url);
    }
    info!(grade, subject, from = old_name, to = new_name, "lesson renamed");
    Ok(doc.into())
}

/// Removes every entry equal to `lesson_name`.
pub fn delete_lesson(
    store: &dyn DocumentStore,
    grade: &str,
    subject: &str,
    lesson_name: &str,
) -> Result<LessonsView, AppError> {
    let (grade, subject) = keys(grade, subject);
    let lesson_name = lesson_name.trim();
    let mut doc = require(store, grade, subject)?;
    let before = doc.lesson_list.len();
    doc.lesson_list.retain(|l| l != lesson_name);
    if doc.lesson_list.len() == before {
        return Err(AppError::NotFound(format!("lesson not found: {}", lesson_name)));
    }
    write_fields(store, grade, subject, &doc.lesson_list, None)?;
    info!(
        grade,
        subject,
        lesson = lesson_name,
        removed = before - doc.lesson_list.len(),
        "lesson deleted"
    );
    Ok(doc.into())
}

/// Re-keys the catalog document under `new_subject`: copy first, then delete
/// the old key. A failed delete removes the copy again.
pub fn rename_subject(
    store: &dyn DocumentStore,
    grade: &str,
    old_subject: &str,
    new_subject: &str,
) -> Result<LessonsView, AppError> {
    let (grade, old_subject) = keys(grade, old_subject);
    let new_subject = new_subject.trim();
    if new_subject.is_empty() {
        return Err(AppError::invalid("newSubject", "Subject is required"));
    }
    if new_subject == old_subject {
        return Err(AppError::BadParams("new subject name equals the old one".into()));
    }
    let mut doc = require(store, grade, old_subject)?;
    if load(store, grade, new_subject)?.is_some() {
        return Err(AppError::Duplicate(format!(
            "{} already has lessons for {}",
            grade, new_subject
        )));
    }
    doc.subject_name = new_subject.to_string();
    let coll = collection(grade);
    let data = to_document(&doc)?;

    let mut saga = Saga::new("catalog.renameSubject");
    saga.step("copy to new key", || {
        store.set(&coll, new_subject, &data, SetMode::Overwrite)?;
        Ok(())
    })?;
    saga.on_rollback("remove copy", || {
        store.delete(&coll, new_subject)?;
        Ok(())
    });
    saga.step("delete old key", || {
        store.delete(&coll, old_subject)?;
        Ok(())
    })?;
    saga.finish();

    info!(grade, from = old_subject, to = new_subject, "catalog subject renamed");
    Ok(doc.into())
}

/// Deletes the catalog document only; the Subject Directory is untouched.
pub fn delete_subject_document(
    store: &dyn DocumentStore,
    grade: &str,
    subject: &str,
) -> Result<(), AppError> {
    let (grade, subject) = keys(grade, subject);
    require(store, grade, subject)?;
    store.delete(&collection(grade), subject)?;
    info!(grade, subject, "catalog document deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalBackend, StoreError};
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "schooladmind-catalog-{}-{}",
            tag,
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&p).expect("temp dir");
        p
    }

    fn image(dir: &PathBuf, name: &str) -> ImageUpload {
        let path = dir.join(name);
        std::fs::write(&path, b"fake-png").expect("write image");
        ImageUpload { path }
    }

    fn form(grade: &str, subject: &str, lesson: &str, image: Option<ImageUpload>) -> CatalogLessonForm {
        CatalogLessonForm {
            grade: grade.into(),
            subject: subject.into(),
            lesson_name: lesson.into(),
            image,
        }
    }

    #[test]
    fn first_lesson_needs_an_image() {
        let dir = temp_dir("first");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let res = add_lesson(&b, &form("Grade 10", "Physics", "Motion", None));
        assert!(matches!(res, Err(AppError::Validation(ref f)) if f[0].field == "image"));
        assert_eq!(get_lessons(&b, "Grade 10", "Physics").expect("get"), LessonsView::default());
    }

    #[test]
    fn same_lesson_twice_is_kept_twice_and_delete_removes_both() {
        let dir = temp_dir("dupes");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let img = image(&dir, "physics.png");
        add_lesson(&b, &form("Grade 10", "Physics", "Motion", Some(img))).expect("first");
        add_lesson(&b, &form("Grade 10", "Physics", "Waves", None)).expect("second");
        let view = add_lesson(&b, &form("Grade 10", "Physics", "Motion", None)).expect("third");
        assert_eq!(view.lesson_list, vec!["Motion", "Waves", "Motion"]);
        assert!(view
            .subject_image
            .as_deref()
            .unwrap_or("")
            .ends_with("subjects/physics.png"));

        let view = delete_lesson(&b, "Grade 10", "Physics", "Motion").expect("delete");
        assert_eq!(view.lesson_list, vec!["Waves"]);
        assert!(matches!(
            delete_lesson(&b, "Grade 10", "Physics", "Motion"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn rename_rewrites_every_equal_entry_and_keeps_the_image() {
        let dir = temp_dir("rename");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let img = image(&dir, "maths.png");
        add_lesson(&b, &form("Grade 5", "Maths", "Sets", Some(img))).expect("add");
        add_lesson(&b, &form("Grade 5", "Maths", "Sets", None)).expect("add");
        let before = get_lessons(&b, "Grade 5", "Maths").expect("get");
        let view = rename_lesson(&b, "Grade 5", "Maths", "Sets", "Set theory", None).expect("rename");
        assert_eq!(view.lesson_list, vec!["Set theory", "Set theory"]);
        assert_eq!(view.subject_image, before.subject_image);
    }

    #[test]
    fn renaming_a_subject_moves_the_document() {
        let dir = temp_dir("subject");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let img = image(&dir, "physics.png");
        add_lesson(&b, &form("Grade 10", "Physics", "Motion", Some(img))).expect("add");
        add_lesson(&b, &form("Grade 10", "Physics", "Heat", None)).expect("add");
        let before = get_lessons(&b, "Grade 10", "Physics").expect("get");

        let moved = rename_subject(&b, "Grade 10", "Physics", "Physics2").expect("rename");
        assert_eq!(moved, before);
        assert_eq!(get_lessons(&b, "Grade 10", "Physics2").expect("get"), before);
        assert!(b.get("catalog/Grade 10", "Physics").expect("get").is_none());
        assert_eq!(list_subjects(&b, "Grade 10").expect("list"), vec!["Physics2"]);
    }

    #[test]
    fn renaming_onto_an_existing_subject_is_a_duplicate() {
        let dir = temp_dir("collide");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        add_lesson(&b, &form("Grade 9", "Art", "Colour", Some(image(&dir, "a.png")))).expect("add");
        add_lesson(&b, &form("Grade 9", "Drama", "Stage", Some(image(&dir, "d.png")))).expect("add");
        assert!(matches!(
            rename_subject(&b, "Grade 9", "Art", "Drama"),
            Err(AppError::Duplicate(_))
        ));
    }

    /// Wraps a store and refuses to delete one document id.
    struct FailDeleteOf<'a> {
        inner: &'a LocalBackend,
        id: &'static str,
    }

    impl DocumentStore for FailDeleteOf<'_> {
        fn get(&self, c: &str, id: &str) -> Result<Option<Document>, StoreError> {
            self.inner.get(c, id)
        }
        fn get_all(&self, c: &str) -> Result<Vec<(String, Document)>, StoreError> {
            self.inner.get_all(c)
        }
        fn set(&self, c: &str, id: &str, d: &Document, m: SetMode) -> Result<(), StoreError> {
            self.inner.set(c, id, d, m)
        }
        fn update(&self, c: &str, id: &str, f: &Document) -> Result<(), StoreError> {
            self.inner.update(c, id, f)
        }
        fn delete(&self, c: &str, id: &str) -> Result<(), StoreError> {
            if id == self.id {
                return Err(StoreError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "simulated outage",
                )));
            }
            self.inner.delete(c, id)
        }
        fn add(&self, c: &str, d: &Document) -> Result<String, StoreError> {
            self.inner.add(c, d)
        }
        fn query_eq(
            &self,
            c: &str,
            filters: &[(&str, Value)],
        ) -> Result<Vec<(String, Document)>, StoreError> {
            self.inner.query_eq(c, filters)
        }
    }

    #[test]
    fn failed_old_key_delete_removes_the_copy() {
        let dir = temp_dir("rollback");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        add_lesson(&b, &form("Grade 11", "Ict", "Binary", Some(image(&dir, "ict.png")))).expect("add");
        let store = FailDeleteOf { inner: &b, id: "Ict" };
        let res = rename_subject(&store, "Grade 11", "Ict", "Computing");
        assert!(matches!(res, Err(AppError::Backend(_))));
        assert!(b.get("catalog/Grade 11", "Ict").expect("get").is_some());
        assert!(b.get("catalog/Grade 11", "Computing").expect("get").is_none());
    }

    #[test]
    fn padded_keys_resolve_to_the_same_document() {
        let dir = temp_dir("padded");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let img = image(&dir, "physics.png");
        add_lesson(&b, &form("Grade 10", "Physics ", "Motion", Some(img))).expect("add");
        add_lesson(&b, &form(" Grade 10", "Physics", "Heat", None)).expect("add");

        let view = get_lessons(&b, "Grade 10", "Physics ").expect("get");
        assert_eq!(view.lesson_list, vec!["Motion", "Heat"]);
        assert_eq!(list_subjects(&b, "Grade 10 ").expect("list"), vec!["Physics"]);

        let view = rename_lesson(&b, "Grade 10 ", " Physics", "Heat ", "Thermal", None).expect("rename");
        assert_eq!(view.lesson_list, vec!["Motion", "Thermal"]);
        let view = delete_lesson(&b, "Grade 10", "Physics ", "Motion").expect("delete");
        assert_eq!(view.lesson_list, vec!["Thermal"]);

        rename_subject(&b, "Grade 10", "Physics ", "Physics 2").expect("rename subject");
        delete_subject_document(&b, "Grade 10", " Physics 2").expect("delete subject");
        assert!(list_subjects(&b, "Grade 10").expect("list").is_empty());
    }
}
