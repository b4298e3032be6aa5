//! Request view passed to handlers.
//!
//! # Responsibilities
//! - Strip the query string from the path
//! - Hold query, form fields and headers
//! - Carry route parameters once a pattern route matched
//! - Sanitize body parameters for GET and POST
//!
//! # Design Decisions
//! - Method is lower-case on display, matching route registration
//! - Route params are empty until the router writes them

use std::collections::BTreeMap;

use axum::http::HeaderMap;
use url::form_urlencoded;

use crate::routing::{Method, RouteParams};

/// A parsed incoming request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    headers: HeaderMap,
    route_params: RouteParams,
}

impl Request {
    /// Build a request from a method and a path with an optional query string.
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_pairs(query.as_bytes())),
            None => (uri, Vec::new()),
        };

        Self {
            method,
            path: path.to_string(),
            query,
            form: Vec::new(),
            headers: HeaderMap::new(),
            route_params: RouteParams::new(),
        }
    }

    /// Attach an `application/x-www-form-urlencoded` body.
    pub fn with_form(mut self, body: &[u8]) -> Self {
        self.form = parse_pairs(body);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Request path with the query string removed.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::Get
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::Post
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw query parameter, unsanitized.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        last_value(&self.query, name)
    }

    /// Raw form field, unsanitized.
    pub fn form_field(&self, name: &str) -> Option<&str> {
        last_value(&self.form, name)
    }

    /// Sanitized body parameters: query for GET, form fields for POST.
    pub fn body(&self) -> BTreeMap<String, String> {
        let source = match self.method {
            Method::Get => &self.query,
            Method::Post => &self.form,
        };
        source
            .iter()
            .map(|(k, v)| (k.clone(), sanitize_special_chars(v)))
            .collect()
    }

    pub fn route_params(&self) -> &RouteParams {
        &self.route_params
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name)
    }

    pub fn set_route_params(&mut self, params: RouteParams) {
        self.route_params = params;
    }
}

fn parse_pairs(input: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(input).into_owned().collect()
}

fn last_value<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Encode `& " ' < >` and ASCII control characters as numeric HTML entities.
pub fn sanitize_special_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' | '"' | '\'' | '<' | '>' => out.push_str(&format!("&#{};", c as u32)),
            c if (c as u32) < 32 => out.push_str(&format!("&#{};", c as u32)),
            c => out.push(c),
        }
    }
    out
}
