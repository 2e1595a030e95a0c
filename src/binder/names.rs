//! Candidate lookup keys for a declared field name.

/// Explicit key value meaning "derive the keys by convention".
pub const CONVENTION_MARKER: &str = "~";

/// `UserId` -> `userId`. Only an ASCII upper-case first letter is changed.
#[must_use]
pub fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {
            let mut out = String::with_capacity(name.len());
            out.push(first.to_ascii_lowercase());
            out.push_str(chars.as_str());
            out
        }
        _ => name.to_string(),
    }
}

/// `UserId` -> `user_id`.
///
/// Every ASCII upper-case letter becomes `_` plus its lower-case form, and a
/// leading `_` produced by the first letter is dropped. Runs of capitals are not
/// grouped: `ID` becomes `i_d`.
#[must_use]
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    match out.strip_prefix('_') {
        Some(rest) => rest.to_string(),
        None => out,
    }
}

/// The three conventional keys, in lookup order.
#[must_use]
pub fn convention_keys(name: &str) -> Vec<String> {
    vec![lower_camel(name), name.to_string(), snake_case(name)]
}

/// Keys to try for a field, in order.
///
/// No explicit key (or the [`CONVENTION_MARKER`]) yields the conventional keys;
/// anything else is the single verbatim key.
#[must_use]
pub fn resolve_keys(name: &str, explicit: Option<&str>) -> Vec<String> {
    match explicit {
        None | Some(CONVENTION_MARKER) | Some("") => convention_keys(name),
        Some(key) => vec![key.to_string()],
    }
}
