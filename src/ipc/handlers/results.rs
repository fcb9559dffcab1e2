use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::params;
use crate::ipc::types::{AppState, Request};
use crate::model::{Department, Semester};
use crate::store;
use crate::viewer::{self, ViewOutcome};
use serde_json::{json, Value};

fn handle_options(_state: &mut AppState, req: &Request) -> Value {
    ok(
        &req.id,
        json!({
            "departments": Department::ALL,
            "semesters": Semester::all().collect::<Vec<_>>(),
        }),
    )
}

fn view_result(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let enrollment = params::enrollment(&req.params)?;
    let department = params::department(&req.params)?;
    let semester = params::semester(&req.params)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };

    match viewer::view(conn, enrollment, department, semester)? {
        ViewOutcome::NotFound => Ok(json!({ "found": false })),
        ViewOutcome::Found(res) => {
            let marks = res
                .marks
                .iter()
                .map(|(subject, marks)| json!({ "subject": subject, "marks": marks }))
                .collect::<Vec<_>>();
            Ok(json!({
                "found": true,
                "student": res.student,
                "marks": marks,
            }))
        }
    }
}

fn slice_info(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let department = params::department(&req.params)?;
    let semester = params::semester(&req.params)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let stats = store::slice_stats(conn, department, semester)?;
    Ok(json!({
        "department": department,
        "semester": semester,
        "records": stats.records,
        "students": stats.students,
        "subjects": stats.subjects,
    }))
}

fn handle_view(state: &mut AppState, req: &Request) -> Value {
    match view_result(state, req) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_slice_info(state: &mut AppState, req: &Request) -> Value {
    match slice_info(state, req) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "results.options" => Some(handle_options(state, req)),
        "results.view" => Some(handle_view(state, req)),
        "results.sliceInfo" => Some(handle_slice_info(state, req)),
        _ => None,
    }
}
