//! Subject Directory: flat registry of `(subjectName, grade[, stream])` records.

use crate::config::CatalogSettings;
use crate::error::AppError;
use crate::pagination::{paginate, Page};
use crate::store::{from_document, to_document, Document, DocumentStore, SetMode};
use crate::validation::{self, Check, Form, Rule};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

pub const SUBJECTS: &str = "subjects";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectForm {
    pub grade: String,
    pub subject: String,
    pub stream: Option<String>,
}

impl Form for SubjectForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "grade" => Some(&self.grade),
            "subject" => Some(&self.subject),
            "stream" => self.stream.as_deref(),
            _ => None,
        }
    }
}

fn subject_rules() -> Vec<Rule> {
    vec![
        Rule::new("grade", Check::Required, "Grade is required"),
        Rule::new("subject", Check::Required, "Subject is required"),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubjectDoc {
    subject_name: String,
    grade: String,
    #[serde(default)]
    stream: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub subject_name: String,
    pub grade: String,
    pub stream: Option<String>,
}

impl Subject {
    fn from_doc(id: String, doc: Document) -> Result<Self, AppError> {
        let d: SubjectDoc = from_document(doc)?;
        Ok(Self {
            id,
            subject_name: d.subject_name,
            grade: d.grade,
            stream: d.stream,
        })
    }
}

/// First letter upper-cased, the rest lower-cased: "mATHS" -> "Maths".
pub fn normalize_subject_name(raw: &str) -> String {
    let mut chars = raw.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn subject_doc_id(subject_name: &str, grade: &str, stream: Option<&str>) -> String {
    match stream {
        Some(s) => format!("{}-{}-{}", subject_name, grade, s),
        None => format!("{}-{}", subject_name, grade),
    }
}

fn clean_stream(stream: Option<&str>) -> Option<String> {
    stream
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn add_subject(
    store: &dyn DocumentStore,
    catalog: &CatalogSettings,
    form: &SubjectForm,
) -> Result<Subject, AppError> {
    validation::validate(form, &subject_rules(), validation::today())
        .map_err(AppError::Validation)?;

    let grade = form.grade.trim().to_string();
    let subject_name = normalize_subject_name(&form.subject);
    let stream = clean_stream(form.stream.as_deref());
    if stream.is_some() && !catalog.is_terminal(&grade) {
        return Err(AppError::invalid(
            "stream",
            format!("streams are only available for {}", catalog.terminal_grades.join(", ")),
        ));
    }

    let existing = store.query_eq(
        SUBJECTS,
        &[
            ("subjectName", json!(subject_name)),
            ("grade", json!(grade)),
        ],
    )?;
    if !existing.is_empty() {
        warn!(subject = %subject_name, grade = %grade, "duplicate subject rejected");
        return Err(AppError::Duplicate(format!(
            "The subject \"{}\" already exists for {}!",
            subject_name, grade
        )));
    }

    let id = subject_doc_id(&subject_name, &grade, stream.as_deref());
    let doc = SubjectDoc {
        subject_name: subject_name.clone(),
        grade: grade.clone(),
        stream: stream.clone(),
    };
    store.set(SUBJECTS, &id, &to_document(&doc)?, SetMode::Overwrite)?;
    info!(collection = SUBJECTS, id = %id, "subject added");

    Ok(Subject {
        id,
        subject_name,
        grade,
        stream,
    })
}

pub fn list_subjects(
    store: &dyn DocumentStore,
    grade: Option<&str>,
    page: usize,
    page_size: usize,
) -> Result<Page<Subject>, AppError> {
    let grade = grade.map(str::trim).filter(|g| !g.is_empty());
    let mut subjects = Vec::new();
    for (id, doc) in store.get_all(SUBJECTS)? {
        let subject = Subject::from_doc(id, doc)?;
        if grade.map(|g| subject.grade == g).unwrap_or(true) {
            subjects.push(subject);
        }
    }
    Ok(paginate(subjects, page, page_size))
}

/// Direct field update. Catalog documents keyed by the old name are left alone.
pub fn edit_subject(
    store: &dyn DocumentStore,
    id: &str,
    subject_name: &str,
    grade: &str,
) -> Result<Subject, AppError> {
    let form = SubjectForm {
        grade: grade.to_string(),
        subject: subject_name.to_string(),
        stream: None,
    };
    validation::validate(&form, &subject_rules(), validation::today())
        .map_err(AppError::Validation)?;
    let Some(doc) = store.get(SUBJECTS, id)? else {
        return Err(AppError::NotFound(format!("subject not found: {}", id)));
    };
    let subject_name = normalize_subject_name(subject_name);
    let grade = grade.trim();
    let clash = store
        .query_eq(
            SUBJECTS,
            &[("subjectName", json!(subject_name)), ("grade", json!(grade))],
        )?
        .into_iter()
        .any(|(other, _)| other != id);
    if clash {
        warn!(subject = %subject_name, grade = %grade, "duplicate subject rejected");
        return Err(AppError::Duplicate(format!(
            "The subject \"{}\" already exists for {}!",
            subject_name, grade
        )));
    }
    let mut fields = Document::new();
    fields.insert("subjectName".into(), Value::String(subject_name));
    fields.insert("grade".into(), Value::String(grade.to_string()));
    store.update(SUBJECTS, id, &fields)?;
    info!(collection = SUBJECTS, id = %id, "subject updated");

    let mut updated = doc;
    updated.extend(fields);
    Subject::from_doc(id.to_string(), updated)
}

pub fn delete_subject(store: &dyn DocumentStore, id: &str) -> Result<(), AppError> {
    if store.get(SUBJECTS, id)?.is_none() {
        return Err(AppError::NotFound(format!("subject not found: {}", id)));
    }
    store.delete(SUBJECTS, id)?;
    info!(collection = SUBJECTS, id = %id, "subject deleted");
    Ok(())
}
