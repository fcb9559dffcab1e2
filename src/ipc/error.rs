use serde_json::json;

use crate::error::{GateError, SheetError, StoreError, UploadError, ValidationError};

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// A failed handler step, rendered as an error envelope by the caller.
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ValidationError> for HandlerErr {
    fn from(e: ValidationError) -> Self {
        HandlerErr::new("bad_params", e.to_string())
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        HandlerErr::new("db_query_failed", e.to_string())
    }
}

impl From<GateError> for HandlerErr {
    fn from(e: GateError) -> Self {
        let code = match e {
            GateError::Disabled => "uploads_disabled",
            GateError::InvalidCode | GateError::InvalidSession => "unauthorized",
        };
        HandlerErr::new(code, e.to_string())
    }
}

impl From<SheetError> for HandlerErr {
    fn from(e: SheetError) -> Self {
        let code = match e {
            SheetError::SourceUnavailable(_) => "source_unavailable",
            SheetError::Auth(_) => "source_auth_failed",
        };
        HandlerErr::new(code, e.to_string())
    }
}

impl From<UploadError> for HandlerErr {
    fn from(e: UploadError) -> Self {
        let message = e.to_string();
        match e {
            UploadError::Source(inner) => inner.into(),
            UploadError::Store(_) => HandlerErr::new("upload_failed", message),
            UploadError::MissingColumn(column) => HandlerErr::new("upload_failed", message)
                .with_details(json!({ "missingColumn": column })),
        }
    }
}
