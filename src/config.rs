use crate::db;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupSection {
    Pagination,
    Accounts,
    Admin,
    Storage,
    Catalog,
}

impl SetupSection {
    pub const ALL: [SetupSection; 5] = [
        Self::Pagination,
        Self::Accounts,
        Self::Admin,
        Self::Storage,
        Self::Catalog,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pagination" => Some(Self::Pagination),
            "accounts" => Some(Self::Accounts),
            "admin" => Some(Self::Admin),
            "storage" => Some(Self::Storage),
            "catalog" => Some(Self::Catalog),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pagination => "pagination",
            Self::Accounts => "accounts",
            Self::Admin => "admin",
            Self::Storage => "storage",
            Self::Catalog => "catalog",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Pagination => "setup.pagination",
            Self::Accounts => "setup.accounts",
            Self::Admin => "setup.admin",
            Self::Storage => "setup.storage",
            Self::Catalog => "setup.catalog",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Pagination => json!({
            "subjectsPageSize": 8,
            "peoplePageSize": 6
        }),
        SetupSection::Accounts => json!({
            "emailDomain": "example.com",
            "studentMinPasswordLength": 6
        }),
        SetupSection::Admin => json!({
            "username": "admin",
            "password": "adminadmin"
        }),
        SetupSection::Storage => json!({
            "publicBaseUrl": null
        }),
        SetupSection::Catalog => json!({
            "terminalGrades": ["Grade 12", "Grade 13"],
            "gradeCount": 13
        }),
    }
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be an integer", key))?;
    if n < min || n > max {
        return Err(format!("{} must be between {} and {}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v
        .as_str()
        .ok_or_else(|| format!("{} must be a string", key))?
        .trim()
        .to_string();
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    if s.chars().count() > max_len {
        return Err(format!("{} must be at most {} characters", key, max_len));
    }
    Ok(s)
}

fn parse_nullable_string_max(v: &Value, key: &str, max_len: usize) -> Result<Value, String> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::String(parse_string_max(v, key, max_len)?))
}

fn parse_string_list(v: &Value, key: &str, max_items: usize) -> Result<Value, String> {
    let items = v
        .as_array()
        .ok_or_else(|| format!("{} must be an array of strings", key))?;
    if items.len() > max_items {
        return Err(format!("{} must have at most {} entries", key, max_items));
    }
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        out.push(Value::String(parse_string_max(item, key, 40)?));
    }
    Ok(Value::Array(out))
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

pub fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        let parsed = match (section, k.as_str()) {
            (SetupSection::Pagination, "subjectsPageSize" | "peoplePageSize") => {
                json!(parse_i64_range(v, k, 1, 100)?)
            }
            (SetupSection::Accounts, "emailDomain") => json!(parse_string_max(v, k, 120)?),
            (SetupSection::Accounts, "studentMinPasswordLength") => {
                json!(parse_i64_range(v, k, 1, 64)?)
            }
            (SetupSection::Admin, "username" | "password") => json!(parse_string_max(v, k, 120)?),
            (SetupSection::Storage, "publicBaseUrl") => parse_nullable_string_max(v, k, 500)?,
            (SetupSection::Catalog, "terminalGrades") => parse_string_list(v, k, 20)?,
            (SetupSection::Catalog, "gradeCount") => json!(parse_i64_range(v, k, 1, 20)?),
            _ => return Err(format!("unknown {} field: {}", section.name(), k)),
        };
        obj.insert(k.clone(), parsed);
    }
    Ok(())
}

pub fn load_section(conn: &Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults field by field.
            for (k, v) in saved_obj {
                let mut one = Map::new();
                one.insert(k.clone(), v.clone());
                let _ = merge_section_patch(section, &mut current, &one);
            }
        }
    }
    Ok(current)
}

pub fn update_section(
    conn: &Connection,
    section: SetupSection,
    patch: &Map<String, Value>,
) -> anyhow::Result<Result<Value, String>> {
    let mut current = load_section(conn, section)?;
    if let Err(msg) = merge_section_patch(section, &mut current, patch) {
        return Ok(Err(msg));
    }
    db::settings_set_json(conn, section.key(), &current)?;
    Ok(Ok(current))
}

fn typed<T: DeserializeOwned>(value: Value) -> anyhow::Result<T> {
    Ok(serde_json::from_value(value)?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSettings {
    pub subjects_page_size: usize,
    pub people_page_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    pub email_domain: String,
    pub student_min_password_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    pub public_base_url: Option<String>,
}

impl StorageSettings {
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        typed(load_section(conn, SetupSection::Storage)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSettings {
    pub terminal_grades: Vec<String>,
    pub grade_count: usize,
}

impl CatalogSettings {
    pub fn is_terminal(&self, grade: &str) -> bool {
        self.terminal_grades.iter().any(|g| g == grade)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub pagination: PaginationSettings,
    pub accounts: AccountSettings,
    pub admin: AdminSettings,
    pub storage: StorageSettings,
    pub catalog: CatalogSettings,
}

impl Settings {
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        Ok(Self {
            pagination: typed(load_section(conn, SetupSection::Pagination)?)?,
            accounts: typed(load_section(conn, SetupSection::Accounts)?)?,
            admin: typed(load_section(conn, SetupSection::Admin)?)?,
            storage: StorageSettings::load(conn)?,
            catalog: typed(load_section(conn, SetupSection::Catalog)?)?,
        })
    }

    /// Defaults, used before any workspace is selected.
    pub fn defaults() -> Self {
        let section = default_section;
        Self {
            pagination: serde_json::from_value(section(SetupSection::Pagination))
                .unwrap_or(PaginationSettings {
                    subjects_page_size: 8,
                    people_page_size: 6,
                }),
            accounts: serde_json::from_value(section(SetupSection::Accounts)).unwrap_or(
                AccountSettings {
                    email_domain: "example.com".to_string(),
                    student_min_password_length: 6,
                },
            ),
            admin: serde_json::from_value(section(SetupSection::Admin)).unwrap_or(AdminSettings {
                username: "admin".to_string(),
                password: "adminadmin".to_string(),
            }),
            storage: StorageSettings {
                public_base_url: None,
            },
            catalog: serde_json::from_value(section(SetupSection::Catalog)).unwrap_or(
                CatalogSettings {
                    terminal_grades: vec!["Grade 12".to_string(), "Grade 13".to_string()],
                    grade_count: 13,
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_rejects_unknown_and_out_of_range_fields() {
        let mut current = default_section(SetupSection::Pagination);
        let patch = json!({ "peoplePageSize": 0 });
        assert!(merge_section_patch(
            SetupSection::Pagination,
            &mut current,
            patch.as_object().expect("object")
        )
        .is_err());

        let patch = json!({ "rowsPerPage": 5 });
        let msg = merge_section_patch(
            SetupSection::Pagination,
            &mut current,
            patch.as_object().expect("object"),
        )
        .expect_err("unknown field");
        assert!(msg.contains("rowsPerPage"));
    }

    #[test]
    fn saved_values_override_defaults() {
        let conn = db::open_in_memory().expect("db");
        let patch = json!({ "subjectsPageSize": 3 });
        update_section(
            &conn,
            SetupSection::Pagination,
            patch.as_object().expect("object"),
        )
        .expect("update")
        .expect("valid patch");
        let settings = Settings::load(&conn).expect("load");
        assert_eq!(settings.pagination.subjects_page_size, 3);
        assert_eq!(settings.pagination.people_page_size, 6);
        assert!(settings.catalog.is_terminal("Grade 13"));
        assert!(!settings.catalog.is_terminal("Grade 11"));
    }
}
