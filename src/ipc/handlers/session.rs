use super::{flatten, Handled};
use crate::config::Settings;
use crate::ipc::error::{app_err, ok};
use crate::ipc::helpers::{load_settings, parse_params, respond};
use crate::ipc::types::{AppState, Request};
use crate::session::{self, LoginForm};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

fn handle_login(state: &mut AppState, req: &Request) -> Handled {
    let form: LoginForm = parse_params(req)?;
    // Before a workspace exists only the built-in credentials apply.
    let admin = match state.backend.as_ref() {
        Some(backend) => load_settings(backend, req)?.admin,
        None => Settings::defaults().admin,
    };
    let session = session::login(&admin, &form).map_err(|e| app_err(&req.id, &e))?;
    state.session = Some(session.clone());
    Ok(respond(req, Ok(session)))
}

fn handle_logout(state: &mut AppState, req: &Request) -> Handled {
    if let Some(s) = state.session.take() {
        info!(user = %s.user_id, "session ended");
    }
    state.lesson_edit.cancel();
    Ok(ok(&req.id, json!({ "loggedOut": true })))
}

fn handle_get(state: &mut AppState, req: &Request) -> Handled {
    Ok(ok(&req.id, json!({ "session": state.session })))
}

#[derive(Deserialize)]
struct ResolveParams {
    path: String,
}

fn handle_resolve(state: &mut AppState, req: &Request) -> Handled {
    let p: ResolveParams = parse_params(req)?;
    Ok(respond(req, session::resolve(&p.path, state.session.as_ref())))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handled = match req.method.as_str() {
        "session.login" => handle_login(state, req),
        "session.logout" => handle_logout(state, req),
        "session.get" => handle_get(state, req),
        "routes.resolve" => handle_resolve(state, req),
        _ => return None,
    };
    Some(flatten(handled))
}
