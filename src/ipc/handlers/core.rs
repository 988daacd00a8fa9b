use super::{flatten, Handled};
use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::lesson_edit::LessonEdit;
use crate::store::LocalBackend;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> Handled {
    Ok(ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "sessionActive": state.session.is_some(),
        }),
    ))
}

fn path_param(req: &Request, key: &str) -> Result<PathBuf, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v.trim())),
        _ => Err(err(&req.id, "bad_params", format!("missing params.{}", key), None)),
    }
}

/// Swaps in a freshly opened workspace. Edit drafts belong to the old one.
/// A failed open leaves the current workspace in place.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let backend = LocalBackend::open(path)?;
    state.workspace = Some(path.to_path_buf());
    state.backend = Some(backend);
    state.lesson_edit = LessonEdit::Idle;
    info!(workspace = %path.to_string_lossy(), "workspace opened");
    Ok(())
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> Handled {
    let path = path_param(req, "path")?;
    open_workspace(state, &path)
        .map_err(|e| err(&req.id, "db_open_failed", format!("{e:?}"), None))?;
    Ok(ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })))
}

fn handle_export_bundle(state: &mut AppState, req: &Request) -> Handled {
    let out = path_param(req, "outPath")?;
    let Some(workspace) = state.workspace.clone() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let export = backup::export_workspace_bundle(&workspace, &out).map_err(|e| {
        err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out.to_string_lossy() })),
        )
    })?;
    info!(path = %out.to_string_lossy(), blobs = export.blob_count, "workspace exported");
    Ok(ok(
        &req.id,
        json!({
            "path": out.to_string_lossy(),
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "blobCount": export.blob_count,
        }),
    ))
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> Handled {
    let src = path_param(req, "bundlePath")?;
    let Some(workspace) = state.workspace.clone() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    if !src.is_file() {
        return Err(err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": src.to_string_lossy() })),
        ));
    }

    // The database file is replaced underneath us; close it first.
    state.backend = None;
    let imported = backup::import_workspace_bundle(&src, &workspace);
    let reopened = open_workspace(state, &workspace);
    let import = imported.map_err(|e| {
        err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": src.to_string_lossy() })),
        )
    })?;
    reopened.map_err(|e| err(&req.id, "db_open_failed", format!("{e:?}"), None))?;

    info!(path = %src.to_string_lossy(), format = %import.bundle_format_detected, "workspace imported");
    Ok(ok(
        &req.id,
        json!({
            "workspacePath": workspace.to_string_lossy(),
            "bundleFormatDetected": import.bundle_format_detected,
            "blobCount": import.blob_count,
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        "workspace.exportBundle" => handle_export_bundle(state, req),
        "workspace.importBundle" => handle_import_bundle(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
