use serde::Serialize;
use serde_json::Value;

use crate::router::RouteError;

/// What a handler (or a short-circuiting filter) returns.
///
/// The payload is forwarded untouched to whatever renders responses; this
/// crate does not serialize or render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Reply {
    /// Plain value
    Json(Value),
    /// Template name plus model
    View { template: String, model: Value },
    /// Redirect instruction
    Redirect { url: String, status: u16 },
    /// Raw body with an explicit status
    Content { body: String, status: u16 },
    /// File to be served by the static layer
    StaticFile { path: String },
    /// Nothing to send beyond the status
    Empty,
}

impl Reply {
    #[must_use]
    pub fn view(template: &str, model: Value) -> Self {
        Reply::View {
            template: template.to_string(),
            model,
        }
    }

    /// Temporary redirect (302).
    #[must_use]
    pub fn redirect(url: &str) -> Self {
        Reply::Redirect {
            url: url.to_string(),
            status: 302,
        }
    }

    #[must_use]
    pub fn content(status: u16, body: &str) -> Self {
        Reply::Content {
            body: body.to_string(),
            status,
        }
    }

    /// Status the reply asks for, if it carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Reply::Redirect { status, .. } | Reply::Content { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Reply::Empty
    }
}

impl From<String> for Reply {
    fn from(body: String) -> Self {
        Reply::Content { body, status: 200 }
    }
}

impl From<&str> for Reply {
    fn from(body: &str) -> Self {
        Reply::content(200, body)
    }
}

/// Final outcome of a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    pub reply: Reply,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, reply: Reply) -> Self {
        Self { status, reply }
    }

    /// 200 unless the reply carries its own status.
    #[must_use]
    pub fn ok(reply: Reply) -> Self {
        let status = reply.status().unwrap_or(200);
        Self { status, reply }
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::new(status, Reply::Json(serde_json::json!({ "error": message })))
    }

    /// Bare status with an empty reply.
    #[must_use]
    pub fn status_only(status: u16) -> Self {
        Self::new(status, Reply::Empty)
    }

    #[must_use]
    pub fn from_route_error(err: &RouteError) -> Self {
        let mut response = Self::error(err.status(), &err.to_string());
        if let (RouteError::MethodNotAllowed { allowed, .. }, Reply::Json(Value::Object(body))) =
            (err, &mut response.reply)
        {
            body.insert(
                "allowed".to_string(),
                Value::Array(
                    allowed
                        .iter()
                        .map(|m| Value::String(m.as_str().to_string()))
                        .collect(),
                ),
            );
        }
        response
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::MethodSet;
    use http::Method;
    use serde_json::json;

    #[test]
    fn test_ok_uses_reply_status() {
        assert_eq!(HandlerResponse::ok(Reply::redirect("/login")).status, 302);
        assert_eq!(HandlerResponse::ok(json!({"a": 1}).into()).status, 200);
    }

    #[test]
    fn test_route_error_mapping() {
        let err = RouteError::MethodNotAllowed {
            path: "/x".into(),
            allowed: MethodSet::from([Method::GET, Method::PUT]),
        };
        let response = HandlerResponse::from_route_error(&err);
        assert_eq!(response.status, 405);
        let Reply::Json(body) = response.reply else {
            panic!("expected json body");
        };
        assert_eq!(body["allowed"], json!(["GET", "PUT"]));
    }

    #[test]
    fn test_reply_serialization() {
        let reply = Reply::view("blog/article", json!({"id": 1}));
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({"kind": "view", "data": {"template": "blog/article", "model": {"id": 1}}})
        );
    }
}
