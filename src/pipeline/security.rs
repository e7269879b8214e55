//! Input sanitization: markup injection and HTTP parameter pollution.
//!
//! Input the stage cannot parse is forwarded unchanged so that downstream
//! validation fails explicitly. The only rejection is a JSON or urlencoded
//! body larger than the sanitization limit, which would otherwise reach the
//! handler raw.

use std::borrow::Cow;
use std::sync::LazyLock;

use async_trait::async_trait;
use axum::body::{Body, Bytes, to_bytes};
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, Uri, header, uri::PathAndQuery};
use regex::Regex;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::AppError;
use crate::pipeline::Stage;

static SCRIPT_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid regex"));

/// Encodes angle brackets and strips `javascript:` URL schemes.
pub fn sanitize_str(input: &str) -> Cow<'_, str> {
    if !input.contains(['<', '>']) && !SCRIPT_SCHEME.is_match(input) {
        return Cow::Borrowed(input);
    }

    // Removing one match can splice a new one together (`javajavascript:script:`),
    // so strip until none is left. Every pass shortens the string.
    let mut stripped = input.to_string();
    while SCRIPT_SCHEME.is_match(&stripped) {
        stripped = SCRIPT_SCHEME.replace_all(&stripped, "").into_owned();
    }
    Cow::Owned(stripped.replace('<', "&lt;").replace('>', "&gt;"))
}

/// Sanitizes every string in a JSON document. Object keys are left as is.
///
/// Duplicate object keys were already collapsed to their last occurrence by
/// the JSON parser.
pub fn sanitize_json(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s).into_owned()),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_json).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, sanitize_json(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Decodes an urlencoded string into keys with every value, in arrival order.
pub fn parse_params(encoded: &str) -> Vec<(String, Vec<String>)> {
    let mut params: Vec<(String, Vec<String>)> = Vec::new();

    for (key, value) in form_urlencoded::parse(encoded.as_bytes()) {
        match params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => params.push((key.into_owned(), vec![value.into_owned()])),
        }
    }

    params
}

/// Collapses repeated keys to their last value and sanitizes the values.
///
/// Keys keep the position of their first occurrence.
pub fn collapse_params(encoded: &str) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());

    for (key, values) in parse_params(encoded) {
        if let Some(last) = values.last() {
            serializer.append_pair(&key, &sanitize_str(last));
        }
    }

    serializer.finish()
}

/// Pipeline stage applying markup sanitization and pollution collapse to
/// the query string, header values, and JSON or urlencoded bodies.
pub struct SecurityFilterStage {
    body_limit: usize,
}

impl SecurityFilterStage {
    /// `body_limit` caps how many body bytes are buffered for sanitization.
    pub fn new(body_limit: usize) -> Self {
        Self { body_limit }
    }

    fn too_large(&self) -> AppError {
        AppError::bad_request(format!(
            "Request body exceeds the {} byte limit",
            self.body_limit
        ))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

fn body_kind(headers: &HeaderMap) -> Option<BodyKind> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        Some(BodyKind::Json)
    } else if mime == "application/x-www-form-urlencoded" {
        Some(BodyKind::Form)
    } else {
        None
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn rewrite_query(uri: &Uri) -> Option<Uri> {
    let query = uri.query()?;
    let collapsed = collapse_params(query);
    if collapsed == query {
        return None;
    }

    let path_and_query = if collapsed.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), collapsed)
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

fn sanitize_headers(headers: &mut HeaderMap) {
    for value in headers.values_mut() {
        let Ok(text) = value.to_str() else {
            continue;
        };
        if let Cow::Owned(clean) = sanitize_str(text)
            && let Ok(replacement) = HeaderValue::from_str(&clean)
        {
            *value = replacement;
        }
    }
}

fn sanitize_body(kind: BodyKind, bytes: &Bytes) -> Option<Bytes> {
    match kind {
        BodyKind::Json => {
            let value: Value = serde_json::from_slice(bytes).ok()?;
            serde_json::to_vec(&sanitize_json(value)).ok().map(Bytes::from)
        }
        BodyKind::Form => {
            let text = std::str::from_utf8(bytes).ok()?;
            Some(Bytes::from(collapse_params(text)))
        }
    }
}

#[async_trait]
impl Stage for SecurityFilterStage {
    fn name(&self) -> &'static str {
        "security_filter"
    }

    async fn process(&self, req: Request) -> Result<Request, AppError> {
        let (mut parts, body) = req.into_parts();

        if let Some(uri) = rewrite_query(&parts.uri) {
            parts.uri = uri;
        }
        sanitize_headers(&mut parts.headers);

        let Some(kind) = body_kind(&parts.headers) else {
            return Ok(Request::from_parts(parts, body));
        };

        // A body that cannot be buffered would reach the handler unsanitized.
        if declared_length(&parts.headers).is_some_and(|len| len > self.body_limit) {
            return Err(self.too_large());
        }

        let bytes = match to_bytes(body, self.body_limit).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "request body could not be buffered for sanitization");
                return Err(self.too_large());
            }
        };

        let bytes = match sanitize_body(kind, &bytes) {
            Some(clean) => {
                parts
                    .headers
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(clean.len()));
                clean
            }
            None => bytes,
        };

        Ok(Request::from_parts(parts, Body::from(bytes)))
    }
}
