use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::ParamVec;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

const CONTENT_TYPE: &str = "content-type";

/// Everything the binder can read for one request.
///
/// `form` holds query-string pairs and urlencoded body pairs together, in
/// arrival order per key. Header names are stored lower-cased. `body` keeps
/// any other raw payload; it is only read for a JSON content type.
#[derive(Debug, Clone)]
pub struct RequestData {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Query and form values, multi-valued
    pub form: HashMap<String, Vec<String>>,
    /// Cookies in header order
    pub cookies: Vec<(String, String)>,
    /// Headers keyed by lower-case name
    pub headers: HashMap<String, Vec<String>>,
    /// Raw request body
    pub body: Vec<u8>,
}

impl RequestData {
    /// Build from a method and a URI; a `?query` suffix is parsed into `form`.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, form) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_query_params(query)),
            None => (uri, HashMap::new()),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            form,
            cookies: Vec::new(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Attach a raw body with its content type.
    #[must_use]
    pub fn with_body(self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut request = self.with_header(CONTENT_TYPE, content_type);
        request.body = body.into();
        request
    }

    /// Attach an `application/json` body.
    #[must_use]
    pub fn with_json_body(self, body: impl Into<Vec<u8>>) -> Self {
        self.with_body("application/json", body)
    }

    /// Append pairs from an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn with_form_body(mut self, body: &str) -> Self {
        for (key, values) in parse_query_params(body) {
            self.form.entry(key).or_default().extend(values);
        }
        self
    }

    /// Append one form value.
    #[must_use]
    pub fn with_form_value(mut self, key: &str, value: &str) -> Self {
        self.form
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Append a header. A valid `x-request-id` also becomes the request id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name == REQUEST_ID_HEADER {
            self.request_id = RequestId::from_header_or_new(Some(value));
        }
        self.headers.entry(name).or_default().push(value.to_string());
        self
    }

    /// Parse a `Cookie:` header value (`a=b; c=d`) and append its pairs.
    #[must_use]
    pub fn with_cookie_header(mut self, header: &str) -> Self {
        self.cookies.extend(parse_cookies(header));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    /// First value of a header (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().map(String::as_str)
    }

    /// All values of a header (case-insensitive), empty if absent.
    #[must_use]
    pub fn header_values(&self, name: &str) -> &[String] {
        let found = match self.headers.get(name) {
            Some(values) => Some(values),
            None => self.headers.get(&name.to_ascii_lowercase()),
        };
        found.map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether the content type names JSON (`application/json`, `text/json`,
    /// `application/vnd.api+json`, ...).
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.get_header(CONTENT_TYPE)
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }

    /// First cookie with this name.
    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All form values for `key`, empty if absent.
    #[must_use]
    pub fn form_values(&self, key: &str) -> &[String] {
        self.form.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// First form value for `key`.
    #[inline]
    #[must_use]
    pub fn get_form_value(&self, key: &str) -> Option<&str> {
        self.form_values(key).first().map(String::as_str)
    }
}

/// The live request as handed to handlers, filters and binder rules.
///
/// Cloning is cheap: the request data is shared.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request: Arc<RequestData>,
    route_name: Option<Arc<str>>,
    path_params: ParamVec,
}

impl RequestContext {
    #[must_use]
    pub fn new(request: Arc<RequestData>) -> Self {
        Self {
            request,
            route_name: None,
            path_params: ParamVec::new(),
        }
    }

    /// Context after route resolution.
    #[must_use]
    pub fn with_route(mut self, name: Arc<str>, path_params: ParamVec) -> Self {
        self.route_name = Some(name);
        self.path_params = path_params;
        self
    }

    #[must_use]
    pub fn request(&self) -> &RequestData {
        &self.request
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Route the request resolved to; `None` inside filter pre hooks.
    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        self.route_name.as_deref()
    }

    #[must_use]
    pub fn path_params(&self) -> &ParamVec {
        &self.path_params
    }

    /// Get a path parameter by name. Last write wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Arc::new(RequestData::new(Method::GET, "/")))
    }
}

/// Parse a `Cookie:` header value into name/value pairs.
///
/// Pairs are separated by `;`. A pair without `=` has an empty value.
#[must_use]
pub fn parse_cookies(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Parse a query string (without the leading `?`) into multi-valued pairs.
#[must_use]
pub fn parse_query_params(query: &str) -> HashMap<String, Vec<String>> {
    let mut params: HashMap<String, Vec<String>> = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        params.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_split_off() {
        let req = RequestData::new(Method::GET, "/search?q=rust+lang&tag=a&tag=b");
        assert_eq!(req.path, "/search");
        assert_eq!(req.get_form_value("q"), Some("rust lang"));
        assert_eq!(req.form_values("tag"), ["a", "b"]);
        assert!(req.form_values("missing").is_empty());
    }

    #[test]
    fn test_form_body_appends() {
        let req = RequestData::new(Method::POST, "/save?tag=a").with_form_body("tag=b&name=x%20y");
        assert_eq!(req.form_values("tag"), ["a", "b"]);
        assert_eq!(req.get_form_value("name"), Some("x y"));
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let req = RequestData::new(Method::GET, "/").with_header("X-Token", "abc");
        assert_eq!(req.get_header("x-token"), Some("abc"));
        assert_eq!(req.get_header("X-TOKEN"), Some("abc"));
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let req = RequestData::new(Method::POST, "/save").with_json_body(r#"{"a":1}"#);
        assert!(req.is_json());
        assert_eq!(req.get_header("Content-Type"), Some("application/json"));
        assert_eq!(req.body, br#"{"a":1}"#);

        let req = RequestData::new(Method::POST, "/save").with_body("text/plain", "a=1");
        assert!(!req.is_json());
        assert!(!RequestData::new(Method::GET, "/").is_json());
    }

    #[test]
    fn test_request_id_header() {
        let id = RequestId::new();
        let req = RequestData::new(Method::GET, "/").with_header("X-Request-Id", &id.to_string());
        assert_eq!(req.request_id, id);
    }

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("a=1; b = two ;flag; =skip");
        assert_eq!(
            cookies,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }
}
