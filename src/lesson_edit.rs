//! The lesson edit dialog: `idle -> editing -> idle` on a successful commit,
//! or back to `editing` with the error recorded when the commit fails.

use crate::catalog::{self, LessonsView};
use crate::error::AppError;
use crate::images::ImageUpload;
use crate::store::Backend;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LessonEdit {
    #[default]
    Idle,
    #[serde(rename_all = "camelCase")]
    Editing {
        grade: String,
        subject: String,
        lesson_name: String,
        error: Option<String>,
    },
}

impl LessonEdit {
    /// Starting over while editing discards the previous draft.
    pub fn begin(&mut self, grade: &str, subject: &str, lesson_name: &str) {
        *self = LessonEdit::Editing {
            grade: grade.to_string(),
            subject: subject.to_string(),
            lesson_name: lesson_name.to_string(),
            error: None,
        };
    }

    pub fn cancel(&mut self) {
        *self = LessonEdit::Idle;
    }

    pub fn commit(
        &mut self,
        backend: &dyn Backend,
        new_name: &str,
        image: Option<&ImageUpload>,
    ) -> Result<LessonsView, AppError> {
        let LessonEdit::Editing {
            grade,
            subject,
            lesson_name,
            error,
        } = self
        else {
            return Err(AppError::BadParams("no lesson is being edited".into()));
        };
        match catalog::rename_lesson(backend, grade, subject, lesson_name, new_name, image) {
            Ok(view) => {
                *self = LessonEdit::Idle;
                Ok(view)
            }
            Err(e) => {
                *error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{add_lesson, CatalogLessonForm};
    use crate::store::LocalBackend;

    fn seeded() -> LocalBackend {
        let dir = std::env::temp_dir().join(format!("schooladmind-edit-{}", uuid::Uuid::new_v4()));
        let b = LocalBackend::open_in_memory(&dir.join("blobs")).expect("backend");
        let img = dir.join("bio.png");
        std::fs::write(&img, b"png").expect("write");
        add_lesson(
            &b,
            &CatalogLessonForm {
                grade: "Grade 7".into(),
                subject: "Biology".into(),
                lesson_name: "Plants".into(),
                image: Some(ImageUpload { path: img }),
            },
        )
        .expect("seed");
        b
    }

    #[test]
    fn commit_while_idle_is_rejected() {
        let b = seeded();
        let mut flow = LessonEdit::default();
        assert!(matches!(flow.commit(&b, "x", None), Err(AppError::BadParams(_))));
        assert_eq!(flow, LessonEdit::Idle);
    }

    #[test]
    fn success_returns_to_idle() {
        let b = seeded();
        let mut flow = LessonEdit::default();
        flow.begin("Grade 7", "Biology", "Plants");
        let view = flow.commit(&b, "Flowering plants", None).expect("commit");
        assert_eq!(view.lesson_list, vec!["Flowering plants"]);
        assert_eq!(flow, LessonEdit::Idle);
    }

    #[test]
    fn failure_stays_in_editing_with_the_error() {
        let b = seeded();
        let mut flow = LessonEdit::default();
        flow.begin("Grade 7", "Biology", "Animals");
        assert!(flow.commit(&b, "Mammals", None).is_err());
        match &flow {
            LessonEdit::Editing { lesson_name, error, .. } => {
                assert_eq!(lesson_name, "Animals");
                assert!(error.is_some());
            }
            LessonEdit::Idle => panic!("expected editing"),
        }
        flow.cancel();
        assert_eq!(flow, LessonEdit::Idle);
    }

    #[test]
    fn serializes_with_a_state_tag() {
        let mut flow = LessonEdit::default();
        assert_eq!(serde_json::to_value(&flow).expect("json")["state"], "idle");
        flow.begin("Grade 7", "Biology", "Plants");
        let v = serde_json::to_value(&flow).expect("json");
        assert_eq!(v["state"], "editing");
        assert_eq!(v["lessonName"], "Plants");
    }
}
