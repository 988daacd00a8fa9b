//! Admin session held in process state, and the client route table it guards.

use crate::config::AdminSettings;
use crate::error::AppError;
use crate::validation::{self, Check, Form, Rule};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub started_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl Form for LoginForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "username" => Some(&self.username),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

pub fn login(admin: &AdminSettings, form: &LoginForm) -> Result<Session, AppError> {
    let rules = [
        Rule::new("username", Check::Required, "Username is required"),
        Rule::new("password", Check::Required, "Password is required"),
    ];
    validation::validate(form, &rules, validation::today()).map_err(AppError::Validation)?;
    if form.username.trim() != admin.username || form.password != admin.password {
        warn!(username = %form.username.trim(), "login rejected");
        return Err(AppError::AuthFailed(
            "Login failed. Please check your credentials.".into(),
        ));
    }
    let session = Session {
        token: Uuid::new_v4().simple().to_string(),
        user_id: admin.username.clone(),
        started_at: chrono::Utc::now().to_rfc3339(),
    };
    info!(user = %session.user_id, "session started");
    Ok(session)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Login,
    Dashboard,
    AddTeachers,
    TeachersList,
    AddStudents,
    StudentsList,
    AddLessons,
    LessonsList,
    AddSubjects,
    SubjectList,
    AddGrade,
    GradesList,
}

impl Route {
    pub const ALL: [Route; 12] = [
        Route::Login,
        Route::Dashboard,
        Route::AddTeachers,
        Route::TeachersList,
        Route::AddStudents,
        Route::StudentsList,
        Route::AddLessons,
        Route::LessonsList,
        Route::AddSubjects,
        Route::SubjectList,
        Route::AddGrade,
        Route::GradesList,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Dashboard => "/dashboard",
            Route::AddTeachers => "/add-teachers",
            Route::TeachersList => "/teachers-list",
            Route::AddStudents => "/add-students",
            Route::StudentsList => "/students-list",
            Route::AddLessons => "/add-lessons",
            Route::LessonsList => "/lessons-list",
            Route::AddSubjects => "/add-subjects",
            Route::SubjectList => "/subject-list",
            Route::AddGrade => "/add-grade",
            Route::GradesList => "/grades-list",
        }
    }

    /// A trailing slash is ignored, except on the root path.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim();
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        Self::ALL.into_iter().find(|r| r.path() == path)
    }

    pub fn requires_session(self) -> bool {
        self != Route::Login
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDecision {
    pub route: Route,
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

/// Internal routes need a session; without one they redirect to the login page.
pub fn resolve(path: &str, session: Option<&Session>) -> Result<RouteDecision, AppError> {
    let Some(route) = Route::parse(path) else {
        return Err(AppError::NotFound(format!("unknown route: {}", path)));
    };
    let allowed = !route.requires_session() || session.is_some();
    Ok(RouteDecision {
        route,
        allowed,
        redirect: (!allowed).then(|| Route::Login.path()),
    })
}

/// Methods reachable without a session.
pub fn is_public_method(method: &str) -> bool {
    matches!(
        method,
        "health" | "routes.resolve" | "setup.get" | "workspace.select"
    ) || method.starts_with("session.")
}
