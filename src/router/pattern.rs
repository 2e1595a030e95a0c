//! Path template compiler.
//!
//! A template such as `/blog/{blogName}/article/{articleId}-{pageId}` is cleaned,
//! split into tokens on both `/` and `.` and every token is classified as a
//! [`Segment`]. The resulting [`RoutePattern`] is what the pattern matcher
//! eliminates candidates against at request time.

use regex::Regex;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;

use super::core::{ParamVec, MAX_INLINE_PARAMS};
use super::error::RouteError;

/// Token produced for the root path (`/`), which would otherwise split into nothing.
pub const ROOT_TOKEN: &str = "/";

/// Tokens are borrowed from the cleaned path; most paths have ≤16 of them.
pub const MAX_INLINE_TOKENS: usize = 16;

/// Stack-allocated token list for the hot path.
pub type TokenVec<'a> = SmallVec<[&'a str; MAX_INLINE_TOKENS]>;

/// Lexically clean a path.
///
/// Repeated separators collapse, `.` elements are dropped, `..` removes the
/// preceding element (never climbing above the root) and a trailing `/` is
/// removed. The empty path cleans to `/`. Already-clean input is borrowed.
#[must_use]
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_clean(path) {
        return Cow::Borrowed(path);
    }

    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::with_capacity(path.matches('/').count() + 1);
    for elem in path.split('/') {
        match elem {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if rooted {
        Cow::Owned(format!("/{joined}"))
    } else if joined.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(joined)
    }
}

fn is_clean(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    if path.is_empty() || path.ends_with('/') {
        return false;
    }
    path.split('/').enumerate().all(|(i, elem)| match elem {
        "" => i == 0,
        "." | ".." => false,
        _ => true,
    })
}

/// Split an already-cleaned path on `/` and `.`, dropping empty pieces.
///
/// The root path yields the single token [`ROOT_TOKEN`] so that it can be
/// matched like any other literal.
#[must_use]
pub fn tokenize(cleaned: &str) -> TokenVec<'_> {
    let tokens: TokenVec<'_> = cleaned
        .split(['/', '.'])
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        let mut root = TokenVec::new();
        root.push(ROOT_TOKEN);
        return root;
    }
    tokens
}

/// One token of a compiled template.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Must equal the request token exactly.
    Literal(Arc<str>),
    /// `{name}`: matches any request token and captures it.
    Variable(Arc<str>),
    /// A token mixing literal text and variables, e.g. `{articleId}-{pageId}`.
    Composite(CompositeSegment),
    /// A bare `*`; the pattern is then matched by prefix/suffix on the raw path.
    Wildcard,
}

impl Segment {
    fn variable_names(&self) -> &[Arc<str>] {
        match self {
            Segment::Variable(name) => std::slice::from_ref(name),
            Segment::Composite(c) => &c.names,
            Segment::Literal(_) | Segment::Wildcard => &[],
        }
    }
}

/// A token with several variables separated by literal text.
#[derive(Debug, Clone)]
pub struct CompositeSegment {
    source: Arc<str>,
    names: Vec<Arc<str>>,
    regex: Regex,
}

impl CompositeSegment {
    /// The token as written in the template.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names in order of appearance.
    #[must_use]
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }
}

/// Literal text around the `*` of a wildcard template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardBounds {
    pub prefix: String,
    pub suffix: String,
}

impl WildcardBounds {
    /// Substring-containment check against the whole raw request path.
    #[must_use]
    pub fn admits(&self, raw_path: &str) -> bool {
        raw_path.len() >= self.prefix.len() + self.suffix.len()
            && raw_path.starts_with(self.prefix.as_str())
            && raw_path.ends_with(self.suffix.as_str())
    }
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: Arc<str>,
    segments: Vec<Segment>,
    var_positions: SmallVec<[usize; MAX_INLINE_PARAMS]>,
    wildcard: Option<WildcardBounds>,
}

impl RoutePattern {
    /// Compile a template.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] for more than one `*`, a `*` combined
    /// with variables, empty or unbalanced braces, adjacent variables inside one
    /// token, or a variable name used twice.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let cleaned = normalize_path(template);
        let tokens = tokenize(&cleaned);

        let mut segments = Vec::with_capacity(tokens.len());
        let mut var_positions = SmallVec::new();
        let mut names: SmallVec<[Arc<str>; MAX_INLINE_PARAMS]> = SmallVec::new();
        let mut wildcards = 0usize;

        for (position, token) in tokens.iter().enumerate() {
            let segment = classify(token, &cleaned)?;
            match &segment {
                Segment::Wildcard => wildcards += 1,
                Segment::Variable(_) | Segment::Composite(_) => {
                    for name in segment.variable_names() {
                        if names.contains(name) {
                            return Err(invalid(&cleaned, "variable name used more than once"));
                        }
                        names.push(Arc::clone(name));
                    }
                    var_positions.push(position);
                }
                Segment::Literal(_) => {}
            }
            segments.push(segment);
        }

        if wildcards > 1 {
            return Err(invalid(&cleaned, "at most one wildcard is allowed"));
        }
        if wildcards == 1 && !var_positions.is_empty() {
            return Err(invalid(&cleaned, "a wildcard pattern cannot contain variables"));
        }

        let wildcard = if wildcards == 1 {
            cleaned.split_once('*').map(|(prefix, suffix)| WildcardBounds {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            })
        } else {
            None
        };

        Ok(Self {
            template: Arc::from(&*cleaned),
            segments,
            var_positions,
            wildcard,
        })
    }

    /// The cleaned template this pattern was compiled from.
    #[must_use]
    pub fn template(&self) -> &Arc<str> {
        &self.template
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn token_count(&self) -> usize {
        self.segments.len()
    }

    /// Positions of variable (and composite) segments.
    #[must_use]
    pub fn var_positions(&self) -> &[usize] {
        &self.var_positions
    }

    #[must_use]
    pub fn wildcard(&self) -> Option<&WildcardBounds> {
        self.wildcard.as_ref()
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.wildcard.is_some()
    }

    /// True when the pattern needs the pattern matcher (variables or a wildcard).
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.is_wildcard() || !self.var_positions.is_empty()
    }

    #[must_use]
    pub fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.segments.iter().map(|s| s.variable_names().len()).sum()
    }

    /// Per-token check used during elimination. Wildcard segments never match a
    /// single token; wildcard patterns are decided by [`WildcardBounds::admits`].
    #[must_use]
    pub fn matches_token(&self, position: usize, token: &str) -> bool {
        match self.segments.get(position) {
            Some(Segment::Literal(lit)) => lit.as_ref() == token,
            Some(Segment::Variable(_)) => true,
            Some(Segment::Composite(c)) => c.regex.is_match(token),
            Some(Segment::Wildcard) | None => false,
        }
    }

    /// Extract variable values from the request tokens at the recorded positions.
    #[must_use]
    pub fn extract(&self, tokens: &[&str]) -> ParamVec {
        let mut params = ParamVec::new();
        for &position in &self.var_positions {
            let Some(token) = tokens.get(position) else {
                continue;
            };
            match &self.segments[position] {
                Segment::Variable(name) => params.push((Arc::clone(name), decode(token))),
                Segment::Composite(c) => {
                    if let Some(captures) = c.regex.captures(token) {
                        for (i, name) in c.names.iter().enumerate() {
                            if let Some(value) = captures.get(i + 1) {
                                params.push((Arc::clone(name), decode(value.as_str())));
                            }
                        }
                    }
                }
                Segment::Literal(_) | Segment::Wildcard => {}
            }
        }
        params
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

fn invalid(template: &str, reason: &'static str) -> RouteError {
    RouteError::InvalidPattern {
        template: template.to_string(),
        reason,
    }
}

enum Piece<'a> {
    Lit(&'a str),
    Var(&'a str),
}

fn classify(token: &str, template: &str) -> Result<Segment, RouteError> {
    if token == "*" {
        return Ok(Segment::Wildcard);
    }
    if !token.contains(['{', '}']) {
        return Ok(Segment::Literal(Arc::from(token)));
    }

    let mut pieces: SmallVec<[Piece<'_>; 4]> = SmallVec::new();
    let mut rest = token;
    while !rest.is_empty() {
        match rest.find('{') {
            Some(0) => {
                let end = rest
                    .find('}')
                    .ok_or_else(|| invalid(template, "unbalanced braces"))?;
                let name = &rest[1..end];
                if name.is_empty() {
                    return Err(invalid(template, "empty variable name"));
                }
                if name.contains('{') {
                    return Err(invalid(template, "unbalanced braces"));
                }
                if matches!(pieces.last(), Some(Piece::Var(_))) {
                    return Err(invalid(template, "adjacent variables need a literal separator"));
                }
                pieces.push(Piece::Var(name));
                rest = &rest[end + 1..];
            }
            Some(start) => {
                let lit = &rest[..start];
                if lit.contains('}') {
                    return Err(invalid(template, "unbalanced braces"));
                }
                pieces.push(Piece::Lit(lit));
                rest = &rest[start..];
            }
            None => {
                if rest.contains('}') {
                    return Err(invalid(template, "unbalanced braces"));
                }
                pieces.push(Piece::Lit(rest));
                rest = "";
            }
        }
    }

    if let [Piece::Var(name)] = pieces.as_slice() {
        return Ok(Segment::Variable(Arc::from(*name)));
    }

    let mut expr = String::with_capacity(token.len() + 16);
    let mut names = Vec::new();
    expr.push('^');
    for piece in &pieces {
        match piece {
            Piece::Lit(lit) => expr.push_str(&regex::escape(lit)),
            Piece::Var(name) => {
                expr.push_str("(.+?)");
                names.push(Arc::from(*name));
            }
        }
    }
    expr.push('$');

    let regex =
        Regex::new(&expr).map_err(|_| invalid(template, "composite segment is not matchable"))?;
    Ok(Segment::Composite(CompositeSegment {
        source: Arc::from(token),
        names,
        regex,
    }))
}
