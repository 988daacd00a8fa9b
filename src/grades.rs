//! Grade Registry. `Grades/<id>` holds the display name and streams, and
//! `Years/<id>` carries the grade image shown in pickers.

use crate::config::CatalogSettings;
use crate::error::AppError;
use crate::images::{self, ImageUpload, GRADE_IMAGES};
use crate::saga::Saga;
use crate::store::{from_document, to_document, Backend, Document, DocumentStore, SetMode};
use crate::validation::{self, Check, Form, Rule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub const GRADES: &str = "Grades";
pub const YEARS: &str = "Years";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GradeForm {
    pub grade: String,
    pub stream: Option<String>,
    pub image: Option<ImageUpload>,
}

impl Form for GradeForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "grade" => Some(&self.grade),
            "stream" => self.stream.as_deref(),
            _ => None,
        }
    }
}

fn grade_rules() -> Vec<Rule> {
    vec![Rule::new("grade", Check::Required, "Grade is required")]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GradeDoc {
    #[serde(default)]
    name: String,
    #[serde(default)]
    streams: Vec<String>,
    #[serde(default)]
    grade_img: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub id: String,
    pub name: String,
    pub streams: Vec<String>,
    pub grade_img: Option<String>,
}

/// "Grade 1" through "Grade <count>".
pub fn grade_options(count: usize) -> Vec<String> {
    (1..=count).map(|n| format!("Grade {}", n)).collect()
}

fn year_images(store: &dyn DocumentStore) -> Result<Vec<(String, String)>, AppError> {
    let mut out = Vec::new();
    for (id, doc) in store.get_all(YEARS)? {
        if let Some(Value::String(url)) = doc.get("gradeImg") {
            out.push((id, url.clone()));
        }
    }
    Ok(out)
}

pub fn list_grades(store: &dyn DocumentStore) -> Result<Vec<GradeRecord>, AppError> {
    let images = year_images(store)?;
    let mut out = Vec::new();
    for (id, doc) in store.get_all(GRADES)? {
        let d: GradeDoc = from_document(doc)?;
        let grade_img = images
            .iter()
            .find(|(year, _)| *year == id)
            .map(|(_, url)| url.clone())
            .filter(|url| !url.is_empty());
        out.push(GradeRecord {
            name: if d.name.is_empty() { id.clone() } else { d.name },
            id,
            streams: d.streams,
            grade_img,
        });
    }
    Ok(out)
}

fn load_grade(store: &dyn DocumentStore, id: &str) -> Result<GradeRecord, AppError> {
    list_grades(store)?
        .into_iter()
        .find(|g| g.id == id)
        .ok_or_else(|| AppError::NotFound(format!("grade not found: {}", id)))
}

/// Creates the grade or, for an existing terminal grade given a stream, adds
/// that stream.
pub fn add_grade(
    backend: &dyn Backend,
    catalog: &CatalogSettings,
    form: &GradeForm,
) -> Result<GradeRecord, AppError> {
    validation::validate(form, &grade_rules(), validation::today())
        .map_err(AppError::Validation)?;
    let store = backend.documents();
    let id = form.grade.trim().to_string();
    let stream = form
        .stream
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if stream.is_some() && !catalog.is_terminal(&id) {
        return Err(AppError::invalid(
            "stream",
            format!("streams are only available for {}", catalog.terminal_grades.join(", ")),
        ));
    }

    if let Some(existing) = store.get(GRADES, &id)? {
        let Some(stream) = stream else {
            warn!(grade = %id, "duplicate grade rejected");
            return Err(AppError::Duplicate("This grade already exists.".into()));
        };
        let mut doc: GradeDoc = from_document(existing)?;
        if doc.streams.iter().any(|s| s == stream) {
            warn!(grade = %id, stream, "duplicate stream rejected");
            return Err(AppError::Duplicate(format!(
                "The stream \"{}\" already exists for {}.",
                stream, id
            )));
        }
        doc.streams.push(stream.to_string());
        let mut fields = Document::new();
        fields.insert(
            "streams".into(),
            Value::Array(doc.streams.iter().cloned().map(Value::String).collect()),
        );
        store.update(GRADES, &id, &fields)?;
        info!(collection = GRADES, id = %id, stream, "stream added");
        return load_grade(store, &id);
    }

    let grade_img = match form.image.as_ref() {
        Some(image) => images::upload_image(backend.blobs(), GRADE_IMAGES, image)?,
        None => String::new(),
    };
    let grade_doc = GradeDoc {
        name: id.clone(),
        streams: stream.map(str::to_string).into_iter().collect(),
        grade_img: grade_img.clone(),
    };
    let grade_data = to_document(&grade_doc)?;
    let mut year_data = Document::new();
    year_data.insert("gradeImg".into(), Value::String(grade_img));

    let mut saga = Saga::new("grades.add");
    saga.step("write grade", || {
        store.set(GRADES, &id, &grade_data, SetMode::Overwrite)?;
        Ok(())
    })?;
    saga.on_rollback("remove grade", || {
        store.delete(GRADES, &id)?;
        Ok(())
    });
    saga.step("write year image", || {
        store.set(YEARS, &id, &year_data, SetMode::Overwrite)?;
        Ok(())
    })?;
    saga.finish();

    info!(collection = GRADES, id = %id, "grade added");
    load_grade(store, &id)
}

/// Changes the display name and/or image. The id stays, so subjects and
/// catalog documents keep pointing at it.
pub fn edit_grade(
    backend: &dyn Backend,
    id: &str,
    name: Option<&str>,
    image: Option<&ImageUpload>,
) -> Result<GradeRecord, AppError> {
    let store = backend.documents();
    if store.get(GRADES, id)?.is_none() {
        return Err(AppError::NotFound(format!("grade not found: {}", id)));
    }
    let mut fields = Document::new();
    if let Some(name) = name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::invalid("name", "Grade is required"));
        }
        fields.insert("name".into(), Value::String(name.to_string()));
    }
    if let Some(image) = image {
        let url = images::upload_image(backend.blobs(), GRADE_IMAGES, image)?;
        fields.insert("gradeImg".into(), Value::String(url.clone()));
        let mut year = Document::new();
        year.insert("gradeImg".into(), Value::String(url));
        store.set(YEARS, id, &year, SetMode::Merge)?;
    }
    if !fields.is_empty() {
        store.update(GRADES, id, &fields)?;
        info!(collection = GRADES, id, "grade updated");
    }
    load_grade(store, id)
}

pub fn delete_grade(store: &dyn DocumentStore, id: &str) -> Result<(), AppError> {
    if store.get(GRADES, id)?.is_none() {
        return Err(AppError::NotFound(format!("grade not found: {}", id)));
    }
    store.delete(GRADES, id)?;
    store.delete(YEARS, id)?;
    info!(collection = GRADES, id, "grade deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::store::LocalBackend;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "schooladmind-grades-{}-{}",
            tag,
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&p).expect("temp dir");
        p
    }

    fn form(grade: &str, stream: Option<&str>, image: Option<ImageUpload>) -> GradeForm {
        GradeForm {
            grade: grade.into(),
            stream: stream.map(String::from),
            image,
        }
    }

    #[test]
    fn options_cover_every_grade() {
        let opts = grade_options(13);
        assert_eq!(opts.len(), 13);
        assert_eq!(opts[0], "Grade 1");
        assert_eq!(opts[12], "Grade 13");
    }

    #[test]
    fn add_writes_grade_and_year_image() {
        let dir = temp_dir("add");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let img = dir.join("g4.png");
        std::fs::write(&img, b"png").expect("write");
        let catalog = Settings::defaults().catalog;
        let g = add_grade(&b, &catalog, &form("Grade 4", None, Some(ImageUpload { path: img })))
            .expect("add");
        assert!(g.grade_img.as_deref().unwrap_or("").ends_with("grades/g4.png"));
        assert!(b.get(YEARS, "Grade 4").expect("get").is_some());

        let again = add_grade(&b, &catalog, &form("Grade 4", None, None));
        assert!(matches!(again, Err(AppError::Duplicate(ref m)) if m == "This grade already exists."));
    }

    #[test]
    fn terminal_grades_collect_streams_without_repeats() {
        let dir = temp_dir("streams");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let catalog = Settings::defaults().catalog;
        add_grade(&b, &catalog, &form("Grade 12", Some("Physical Science"), None)).expect("create");
        let g = add_grade(&b, &catalog, &form("Grade 12", Some("Arts"), None)).expect("stream");
        assert_eq!(g.streams, vec!["Physical Science", "Arts"]);
        assert!(matches!(
            add_grade(&b, &catalog, &form("Grade 12", Some("Arts"), None)),
            Err(AppError::Duplicate(_))
        ));
        assert!(matches!(
            add_grade(&b, &catalog, &form("Grade 3", Some("Arts"), None)),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn edit_keeps_the_id_and_delete_removes_both_documents() {
        let dir = temp_dir("edit");
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let catalog = Settings::defaults().catalog;
        add_grade(&b, &catalog, &form("Grade 6", None, None)).expect("add");
        let g = edit_grade(&b, "Grade 6", Some("Year Six"), None).expect("edit");
        assert_eq!(g.id, "Grade 6");
        assert_eq!(g.name, "Year Six");
        assert_eq!(g.grade_img, None);

        delete_grade(&b, "Grade 6").expect("delete");
        assert!(b.get(GRADES, "Grade 6").expect("get").is_none());
        assert!(b.get(YEARS, "Grade 6").expect("get").is_none());
        assert!(list_grades(&b).expect("list").is_empty());
    }
}
