use serde_json::Value;
use std::borrow::Cow;

use super::schema::Source;
use super::session::SessionStore;
use crate::dispatcher::RequestContext;

/// A value found for one candidate key.
#[derive(Debug, Clone, PartialEq)]
pub enum Found<'a> {
    /// Single value (path variable or cookie)
    Text(&'a str),
    /// Multi-valued entry (form or header)
    Multi(&'a [String]),
    /// Raw session value
    Json(Value),
}

impl<'a> Found<'a> {
    /// The value a scalar field is cast from.
    #[must_use]
    pub fn first(self) -> Option<Cow<'a, str>> {
        match self {
            Found::Text(text) => Some(Cow::Borrowed(text)),
            Found::Multi(values) => values.first().map(|v| Cow::Borrowed(v.as_str())),
            Found::Json(Value::Array(items)) => items.into_iter().find_map(json_text),
            Found::Json(value) => json_text(value),
        }
    }

    /// Every value a sequence field is cast from.
    #[must_use]
    pub fn all(self) -> Vec<Cow<'a, str>> {
        match self {
            Found::Text(text) => vec![Cow::Borrowed(text)],
            Found::Multi(values) => values.iter().map(|v| Cow::Borrowed(v.as_str())).collect(),
            Found::Json(Value::Array(items)) => items.into_iter().filter_map(json_text).collect(),
            Found::Json(value) => json_text(value).into_iter().collect(),
        }
    }
}

/// Strings cast as-is; numbers and booleans cast from their text.
fn json_text<'a>(value: Value) -> Option<Cow<'a, str>> {
    match value {
        Value::String(s) => Some(Cow::Owned(s)),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Everything a schema binds from for one request.
#[derive(Clone, Copy)]
pub struct Sources<'r> {
    context: &'r RequestContext,
    sessions: Option<&'r dyn SessionStore>,
    session_id: Option<&'r str>,
}

impl<'r> Sources<'r> {
    /// Sources without a session store; session-tagged fields stay zero.
    #[must_use]
    pub fn new(context: &'r RequestContext) -> Self {
        Self {
            context,
            sessions: None,
            session_id: None,
        }
    }

    #[must_use]
    pub fn with_session(mut self, store: &'r dyn SessionStore, session_id: Option<&'r str>) -> Self {
        self.sessions = Some(store);
        self.session_id = session_id;
        self
    }

    #[must_use]
    pub fn context(&self) -> &'r RequestContext {
        self.context
    }

    /// Look up one key in one source. Empty entries count as missing.
    ///
    /// For [`Source::Form`] a path variable wins over a form value of the
    /// same name.
    #[must_use]
    pub fn lookup(&self, source: Source, key: &str) -> Option<Found<'r>> {
        let request = self.context.request();
        match source {
            Source::Form => {
                if let Some(value) = self.context.get_path_param(key) {
                    return Some(Found::Text(value));
                }
                let values = request.form_values(key);
                (!values.is_empty()).then_some(Found::Multi(values))
            }
            Source::Cookie => request.get_cookie(key).map(Found::Text),
            Source::Header => {
                let values = request.header_values(key);
                (!values.is_empty()).then_some(Found::Multi(values))
            }
            Source::Session => {
                let store = self.sessions?;
                let session_id = self.session_id?;
                match store.get(session_id, key)? {
                    Value::Null => None,
                    value => Some(Found::Json(value)),
                }
            }
            Source::Context => None,
        }
    }
}
