//! Request-side inputs to the policy evaluator.
//!
//! The dispatch layer copies what the evaluator needs out of the HTTP request
//! (addressed identifiers, client metadata, the raw parameter bag) so the
//! engine stays transport-agnostic.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};

use bitflow_core::{CollegeId, DepartmentId, DomainError};

pub const COLLEGE_ID_PARAM: &str = "collegeId";
pub const DEPARTMENT_ID_PARAM: &str = "departmentId";

const REDACTED: &str = "[REDACTED]";
/// Matched anywhere in the normalized key, so `tokenCount` is redacted too.
const SENSITIVE_KEY_FRAGMENTS: [&str; 5] = ["password", "token", "secret", "authorization", "apikey"];
/// Too short to match inside other words; only a whole key segment counts.
const SENSITIVE_KEY_SEGMENTS: [&str; 1] = ["otp"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub path_params: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
    pub body: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_path_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(key.into(), value.into());
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    /// College addressed by the request (path, then body, then query).
    pub fn addressed_college_id(&self) -> Result<Option<CollegeId>, DomainError> {
        self.addressed(COLLEGE_ID_PARAM)
    }

    /// Department addressed by the request (path, then body, then query).
    pub fn addressed_department_id(&self) -> Result<Option<DepartmentId>, DomainError> {
        self.addressed(DEPARTMENT_ID_PARAM)
    }

    fn addressed<T>(&self, key: &str) -> Result<Option<T>, DomainError>
    where
        T: FromStr<Err = DomainError>,
    {
        match self.raw_param(key)? {
            Some(raw) => raw.parse().map(Some),
            None => Ok(None),
        }
    }

    /// First non-empty value for `key`; empty strings fall through to the next source.
    fn raw_param(&self, key: &str) -> Result<Option<&str>, DomainError> {
        if let Some(v) = self.path_params.get(key).filter(|v| !v.is_empty()) {
            return Ok(Some(v.as_str()));
        }

        if let Some(v) = self.body.as_ref().and_then(|b| b.get(key)) {
            match v {
                JsonValue::String(s) if !s.is_empty() => return Ok(Some(s.as_str())),
                JsonValue::String(_) | JsonValue::Null => {}
                other => {
                    return Err(DomainError::invalid_id(format!(
                        "{key} must be a string, got {other}"
                    )));
                }
            }
        }

        Ok(self
            .query_params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty()))
    }

    /// Parameter bag for the audit trail, with credential-like keys redacted.
    pub fn sanitized_params(&self) -> JsonValue {
        let to_object = |m: &BTreeMap<String, String>| {
            m.iter()
                .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                .collect::<Map<String, JsonValue>>()
        };

        let mut bag = Map::new();
        bag.insert("path".into(), JsonValue::Object(to_object(&self.path_params)));
        bag.insert("query".into(), JsonValue::Object(to_object(&self.query_params)));
        bag.insert("body".into(), self.body.clone().unwrap_or(JsonValue::Null));

        let mut bag = JsonValue::Object(bag);
        redact(&mut bag);
        bag
    }
}

fn is_sensitive(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace(['_', '-'], "");
    SENSITIVE_KEY_FRAGMENTS.iter().any(|f| normalized.contains(f))
        || key_segments(key)
            .iter()
            .any(|seg| SENSITIVE_KEY_SEGMENTS.contains(&seg.as_str()))
}

/// Split `snake_case`, `kebab-case` and `camelCase` keys into lowercase words.
/// Acronym runs stay together: `OTPCode` is `otp`, `code`.
fn key_segments(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if !prev.is_uppercase() || next_is_lower {
                segments.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn redact(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            for (k, v) in map.iter_mut() {
                if is_sensitive(k) {
                    *v = JsonValue::String(REDACTED.to_string());
                } else {
                    redact(v);
                }
            }
        }
        JsonValue::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
