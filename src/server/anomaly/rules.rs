use std::str;

use anyhow::{Context, Result};
use url::form_urlencoded;

use super::config::AnomalyConfig;
use super::{PatternTag, RequestView, Rule, Severity};

/// Literal and percent-encoded forms of a parent directory step.
const TRAVERSAL_MARKERS: [&str; 8] = [
    "../",
    "..\\",
    "%2e%2e%2f",
    "%2e%2e/",
    "..%2f",
    "%2e%2e%5c",
    "%2e%2e\\",
    "..%5c",
];

const PAGE_SIZE_KEYS: [&str; 4] = ["limit", "page_size", "pagesize", "per_page"];

pub fn default_rules(cfg: &AnomalyConfig) -> Vec<Rule> {
    let mut rules = vec![
        Rule {
            tag: PatternTag::PathTraversal,
            severity: Severity::Severe,
            check: path_traversal,
        },
        Rule {
            tag: PatternTag::SqlInjectionAttempt,
            severity: Severity::Severe,
            check: sql_injection,
        },
        Rule {
            tag: PatternTag::NosqlInjectionAttempt,
            severity: Severity::Severe,
            check: nosql_injection,
        },
        Rule {
            tag: PatternTag::UnauthorizedAdminAccess,
            severity: Severity::Suspicious,
            check: admin_access,
        },
        Rule {
            tag: PatternTag::PotentialDataScraping,
            severity: Severity::Suspicious,
            check: data_scraping,
        },
    ];
    if cfg.enumeration_detection {
        rules.push(Rule {
            tag: PatternTag::UserEnumerationAttempt,
            severity: Severity::Suspicious,
            check: user_enumeration,
        });
    }
    rules
}

fn path_traversal(view: &RequestView, _cfg: &AnomalyConfig) -> Result<bool> {
    let path = view.path.to_lowercase();
    Ok(TRAVERSAL_MARKERS.iter().any(|marker| path.contains(marker)))
}

fn sql_injection(view: &RequestView, cfg: &AnomalyConfig) -> Result<bool> {
    if view.query.is_empty() {
        return Ok(false);
    }
    let query = decode_query(view.query).to_lowercase();
    Ok(cfg
        .sql_denylist
        .iter()
        .any(|fragment| contains_fragment(&query, fragment)))
}

fn nosql_injection(view: &RequestView, cfg: &AnomalyConfig) -> Result<bool> {
    let body = match view.body {
        Some(body) if !body.is_empty() => body,
        _ => return Ok(false),
    };
    let body = str::from_utf8(body).context("request body is not utf-8")?;
    let body = body.to_lowercase();
    Ok(cfg
        .nosql_operators
        .iter()
        .any(|op| contains_token(&body, op)))
}

fn admin_access(view: &RequestView, cfg: &AnomalyConfig) -> Result<bool> {
    if view.is_admin() {
        return Ok(false);
    }
    Ok(segments(view.path).any(|segment| {
        let segment = segment.to_lowercase();
        cfg.admin_segments.iter().any(|admin| *admin == segment)
    }))
}

fn data_scraping(view: &RequestView, cfg: &AnomalyConfig) -> Result<bool> {
    if view.is_admin() || view.query.is_empty() {
        return Ok(false);
    }
    for (key, value) in form_urlencoded::parse(view.query.as_bytes()) {
        if !PAGE_SIZE_KEYS.contains(&key.to_lowercase().as_str()) {
            continue;
        }
        // Non-numeric sizes are rejected by the handlers, not here
        if let Ok(size) = value.trim().parse::<u64>() {
            if size > cfg.max_page_size {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn user_enumeration(view: &RequestView, _cfg: &AnomalyConfig) -> Result<bool> {
    if view.is_admin() {
        return Ok(false);
    }
    let caller = view.identity.map(|id| id.user_id.as_str());

    let mut iter = segments(view.path);
    while let Some(segment) = iter.next() {
        if segment != "user" && segment != "users" {
            continue;
        }
        if let Some(target) = iter.next() {
            if Some(target) != caller {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Decodes the query into `key=value` pairs joined with `&`.
fn decode_query(query: &str) -> String {
    form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| {
            if value.is_empty() {
                key.into_owned()
            } else {
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Whether the SQL `fragment` appears in `s`. Fragments made of punctuation
/// only, such as the comment markers `--` and `/*`, count only when followed
/// by whitespace or the end of input, so `mid--century` is no match.
fn contains_fragment(s: &str, fragment: &str) -> bool {
    if fragment.is_empty() {
        return false;
    }
    if fragment.chars().any(char::is_alphanumeric) {
        return s.contains(fragment);
    }
    s.match_indices(fragment).any(|(pos, _)| {
        s[pos + fragment.len()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace)
    })
}

/// Whether `op` appears in `s` not followed by an identifier character, so
/// that `$ne` does not match `$next`.
fn contains_token(s: &str, op: &str) -> bool {
    if op.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = s[start..].find(op) {
        let end = start + pos + op.len();
        match s[end..].chars().next() {
            Some(c) if c.is_alphanumeric() || c == '_' => start = end,
            _ => return true,
        }
    }
    false
}
