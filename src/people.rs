//! Teacher and student registries. Both kinds share this implementation and
//! differ only in collection, name rules and password policy.
//!
//! Profiles are keyed by phone number. Each profile is paired with an auth
//! account whose email is `<phone>@<emailDomain>`.

use crate::config::AccountSettings;
use crate::error::AppError;
use crate::pagination::{paginate, Page};
use crate::saga::Saga;
use crate::store::{from_document, to_document, AuthUser, Backend, Document, DocumentStore, SetMode, StoreError};
use crate::validation::{self, Check, Form, Rule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonKind {
    Teacher,
    Student,
}

impl PersonKind {
    pub fn collection(self) -> &'static str {
        match self {
            PersonKind::Teacher => "Teacher",
            PersonKind::Student => "Student",
        }
    }

    fn label(self) -> &'static str {
        match self {
            PersonKind::Teacher => "teacher",
            PersonKind::Student => "student",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonForm {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub birth_date: String,
    pub school: String,
    pub district: String,
    pub password: String,
    pub confirm_password: String,
}

impl Form for PersonForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "firstName" => Some(&self.first_name),
            "lastName" => Some(&self.last_name),
            "phoneNumber" => Some(&self.phone_number),
            "birthDate" => Some(&self.birth_date),
            "school" => Some(&self.school),
            "district" => Some(&self.district),
            "password" => Some(&self.password),
            "confirmPassword" => Some(&self.confirm_password),
            _ => None,
        }
    }
}

/// Fields `update` may touch.
const UPDATABLE: [&str; 5] = ["firstName", "lastName", "birthDate", "school", "district"];

pub fn person_rules(kind: PersonKind, accounts: &AccountSettings) -> Vec<Rule> {
    let mut rules = Vec::new();
    if kind == PersonKind::Teacher {
        rules.push(Rule::new("firstName", Check::Required, "First name is required"));
    }
    rules.push(Rule::new("firstName", Check::MaxLen(15), "Must be 15 characters or less"));
    if kind == PersonKind::Teacher {
        rules.push(Rule::new("lastName", Check::Required, "Last name is required"));
    }
    rules.push(Rule::new("lastName", Check::MaxLen(20), "Must be 20 characters or less"));
    rules.extend([
        Rule::new("phoneNumber", Check::Required, "Phone number is required"),
        Rule::new("phoneNumber", Check::Digits, "Must be only digits"),
        Rule::new("phoneNumber", Check::ExactLen(10), "Must be exactly 10 digits"),
        Rule::new("birthDate", Check::Required, "Birthdate is required"),
        Rule::new("birthDate", Check::Date, "Invalid date"),
        Rule::new("birthDate", Check::DateNotFuture, "Birthdate cannot be in the future"),
        Rule::new("school", Check::Required, "School is required"),
        Rule::new("school", Check::MaxLen(50), "Must be 50 characters or less"),
        Rule::new("district", Check::Required, "District is required"),
        Rule::new("district", Check::MaxLen(50), "Must be 50 characters or less"),
        Rule::new("password", Check::Required, "Password is required"),
    ]);
    if kind == PersonKind::Student {
        let min = accounts.student_min_password_length;
        rules.push(Rule::new(
            "password",
            Check::MinLen(min),
            format!("Password must be at least {} characters", min),
        ));
    }
    rules.extend([
        Rule::new("confirmPassword", Check::Required, "Confirm password is required"),
        Rule::new("confirmPassword", Check::MatchesField("password"), "Passwords must match"),
    ]);
    rules
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileDoc {
    phone_number: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    birth_date: String,
    #[serde(default)]
    school: String,
    #[serde(default)]
    district: String,
    #[serde(default)]
    email: String,
    /// Needed to re-authenticate before the account can be deleted.
    #[serde(default)]
    password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonView {
    pub id: String,
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub school: String,
    pub district: String,
    pub email: String,
}

impl PersonView {
    fn new(id: String, d: ProfileDoc) -> Self {
        Self {
            id,
            phone_number: d.phone_number,
            first_name: d.first_name,
            last_name: d.last_name,
            birth_date: d.birth_date,
            school: d.school,
            district: d.district,
            email: d.email,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.phone_number, &self.first_name, &self.last_name]
            .iter()
            .any(|v| v.to_lowercase().contains(needle))
    }
}

/// Partial profile edit. `phoneNumber` is the key and is never accepted here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub school: Option<String>,
    pub district: Option<String>,
}

pub fn account_email(phone: &str, accounts: &AccountSettings) -> String {
    format!("{}@{}", phone, accounts.email_domain)
}

fn load_profile(
    store: &dyn DocumentStore,
    kind: PersonKind,
    id: &str,
) -> Result<ProfileDoc, AppError> {
    match store.get(kind.collection(), id)? {
        Some(doc) => Ok(from_document(doc)?),
        None => Err(AppError::NotFound(format!("{} not found: {}", kind.label(), id))),
    }
}

pub fn register(
    backend: &dyn Backend,
    kind: PersonKind,
    accounts: &AccountSettings,
    form: &PersonForm,
) -> Result<PersonView, AppError> {
    validation::validate(form, &person_rules(kind, accounts), validation::today())
        .map_err(AppError::Validation)?;
    let store = backend.documents();
    let collection = kind.collection();
    let phone = form.phone_number.trim().to_string();
    if store.get(collection, &phone)?.is_some() {
        warn!(collection, id = %phone, "duplicate profile rejected");
        return Err(AppError::Duplicate(format!(
            "A {} with phone number {} already exists.",
            kind.label(),
            phone
        )));
    }

    let email = account_email(&phone, accounts);
    let profile = ProfileDoc {
        phone_number: phone.clone(),
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        birth_date: form.birth_date.trim().to_string(),
        school: form.school.trim().to_string(),
        district: form.district.trim().to_string(),
        email: email.clone(),
        password: form.password.clone(),
    };
    let data = to_document(&profile)?;

    let mut saga = Saga::new("people.register");
    let user = saga.step("create account", || {
        backend
            .auth()
            .create_account(&email, &form.password)
            .map_err(|e| match e {
                StoreError::EmailInUse(email) => {
                    warn!(%email, "account email already in use");
                    AppError::Duplicate(format!("An account for {} already exists.", email))
                }
                other => other.into(),
            })
    })?;
    saga.on_rollback("delete account", move || {
        backend.auth().delete_account(&user)?;
        Ok(())
    });
    saga.step("write profile", || {
        store.set(collection, &phone, &data, SetMode::Overwrite)?;
        Ok(())
    })?;
    saga.finish();

    info!(collection, id = %phone, "{} registered", kind.label());
    Ok(PersonView::new(phone, profile))
}

/// Case-insensitive substring filter on phone number and names.
pub fn list(
    store: &dyn DocumentStore,
    kind: PersonKind,
    filter: Option<&str>,
    page: usize,
    page_size: usize,
) -> Result<Page<PersonView>, AppError> {
    let needle = filter
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty());
    let mut people = Vec::new();
    for (id, doc) in store.get_all(kind.collection())? {
        let view = PersonView::new(id, from_document(doc)?);
        if needle.as_deref().map(|n| view.matches(n)).unwrap_or(true) {
            people.push(view);
        }
    }
    Ok(paginate(people, page, page_size))
}

pub fn update(
    store: &dyn DocumentStore,
    kind: PersonKind,
    accounts: &AccountSettings,
    id: &str,
    patch: &PersonUpdate,
) -> Result<PersonView, AppError> {
    let mut profile = load_profile(store, kind, id)?;
    let mut fields = Document::new();
    let edits = [
        ("firstName", &patch.first_name, &mut profile.first_name),
        ("lastName", &patch.last_name, &mut profile.last_name),
        ("birthDate", &patch.birth_date, &mut profile.birth_date),
        ("school", &patch.school, &mut profile.school),
        ("district", &patch.district, &mut profile.district),
    ];
    for (field, new, current) in edits {
        if let Some(v) = new {
            *current = v.trim().to_string();
            fields.insert(field.to_string(), Value::String(current.clone()));
        }
    }

    let form = PersonForm {
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        phone_number: profile.phone_number.clone(),
        birth_date: profile.birth_date.clone(),
        school: profile.school.clone(),
        district: profile.district.clone(),
        ..PersonForm::default()
    };
    let rules: Vec<Rule> = person_rules(kind, accounts)
        .into_iter()
        .filter(|r| UPDATABLE.contains(&r.field) && fields.contains_key(r.field))
        .collect();
    validation::validate(&form, &rules, validation::today()).map_err(AppError::Validation)?;

    if !fields.is_empty() {
        store.update(kind.collection(), id, &fields)?;
        info!(collection = kind.collection(), id, "{} updated", kind.label());
    }
    Ok(PersonView::new(id.to_string(), profile))
}

/// Signs in as the person with the stored password, then deletes the account
/// and the profile. A failed sign-in aborts before anything is removed.
pub fn delete(backend: &dyn Backend, kind: PersonKind, id: &str) -> Result<(), AppError> {
    let store = backend.documents();
    let collection = kind.collection();
    let profile = load_profile(store, kind, id)?;

    let user: AuthUser = backend
        .auth()
        .sign_in(&profile.email, &profile.password)
        .map_err(|e| match e {
            StoreError::InvalidCredentials => {
                warn!(collection, id, "re-authentication failed; delete aborted");
                AppError::AuthFailed(format!(
                    "Could not sign in as {}; nothing was deleted.",
                    profile.email
                ))
            }
            other => other.into(),
        })?;

    let mut saga = Saga::new("people.delete");
    saga.step("delete account", || {
        backend.auth().delete_account(&user)?;
        Ok(())
    })?;
    saga.on_rollback("recreate account", || {
        backend
            .auth()
            .create_account(&profile.email, &profile.password)?;
        Ok(())
    });
    saga.step("delete profile", || {
        store.delete(collection, id)?;
        Ok(())
    })?;
    saga.finish();

    info!(collection, id, "{} deleted", kind.label());
    Ok(())
}
