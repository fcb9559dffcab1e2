use chrono::Utc;
use serde_json::{json, Value};

use crate::error::UploadError;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::params;
use crate::ipc::types::{AppState, Request};
use crate::reconcile;
use crate::sheet::{self, SheetSource};

fn unlock(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let code = params::required_str(&req.params, "code")?;
    let session = state.gate.unlock(code, Utc::now())?;
    Ok(json!({
        "sessionToken": session.token,
        "expiresAt": session.expires_at.to_rfc3339(),
    }))
}

fn lock(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let token = params::required_str(&req.params, "sessionToken")?;
    Ok(json!({ "revoked": state.gate.lock(token) }))
}

fn upload(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let token = params::required_str(&req.params, "sessionToken")?;
    state.gate.authorize(token, Utc::now())?;

    let department = params::department(&req.params)?;
    let semester = params::semester(&req.params)?;
    let source = SheetSource::parse(params::required_str(&req.params, "source")?)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };

    tracing::info!(%department, %semester, source = %source.describe(), "upload started");
    let result = sheet::read_sheet(&source, &state.sheets)
        .map_err(UploadError::from)
        .and_then(|table| reconcile::reconcile(conn, department, semester, &table));
    match result {
        Ok(report) => {
            tracing::info!(
                %department,
                %semester,
                records = report.records_written,
                "upload finished"
            );
            serde_json::to_value(&report)
                .map_err(|e| HandlerErr::new("upload_failed", e.to_string()))
        }
        Err(e) => {
            tracing::error!(%department, %semester, error = %e, "upload failed");
            let mut he = HandlerErr::from(e);
            match he.details.as_mut() {
                Some(Value::Object(map)) => {
                    map.insert("source".to_string(), json!(source.describe()));
                }
                _ => he.details = Some(json!({ "source": source.describe() })),
            }
            Err(he)
        }
    }
}

fn respond(req: &Request, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "upload.unlock" => Some(respond(req, unlock(state, req))),
        "upload.lock" => Some(respond(req, lock(state, req))),
        "results.upload" => Some(respond(req, upload(state, req))),
        _ => None,
    }
}
