mod rules;

pub mod config;

use std::fmt::Display;

use anyhow::Result;
use config::AnomalyConfig;
use log::warn;
use serde::Serialize;

use crate::types::identity::IdentityContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatternTag {
    PathTraversal,
    SqlInjectionAttempt,
    NosqlInjectionAttempt,
    UnauthorizedAdminAccess,
    PotentialDataScraping,
    UserEnumerationAttempt,
}

impl PatternTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathTraversal => "PATH_TRAVERSAL",
            Self::SqlInjectionAttempt => "SQL_INJECTION_ATTEMPT",
            Self::NosqlInjectionAttempt => "NOSQL_INJECTION_ATTEMPT",
            Self::UnauthorizedAdminAccess => "UNAUTHORIZED_ADMIN_ACCESS",
            Self::PotentialDataScraping => "POTENTIAL_DATA_SCRAPING",
            Self::UserEnumerationAttempt => "USER_ENUMERATION_ATTEMPT",
        }
    }

    /// Log-only patterns go to the operator log and are never recorded as the
    /// request's security violation.
    pub fn is_log_only(&self) -> bool {
        matches!(self, Self::UserEnumerationAttempt)
    }
}

impl Display for PatternTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Suspicious,
    Severe,
}

/// Normalized view of a request, the only input of the rules.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Raw query string, without the leading `?`.
    pub query: &'a str,
    pub body: Option<&'a [u8]>,
    pub identity: Option<&'a IdentityContext>,
}

impl RequestView<'_> {
    pub fn is_admin(&self) -> bool {
        self.identity.map(|id| id.is_admin()).unwrap_or(false)
    }
}

/// Outcome of one scan: every matching pattern, and the highest severity
/// among them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    pub patterns: Vec<PatternTag>,
    pub severity: Severity,
}

impl Scan {
    pub fn is_severe(&self) -> bool {
        self.severity == Severity::Severe
    }

    /// Patterns that should be recorded against the request.
    pub fn recorded(&self) -> impl Iterator<Item = PatternTag> + '_ {
        self.patterns.iter().copied().filter(|tag| !tag.is_log_only())
    }

    pub fn describe(&self) -> String {
        self.recorded()
            .map(|tag| tag.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A predicate over the request view, tagged with the pattern it detects.
/// `Err` means the rule itself failed.
pub struct Rule {
    pub tag: PatternTag,
    pub severity: Severity,
    pub check: fn(&RequestView, &AnomalyConfig) -> Result<bool>,
}

/// Stateless pass over path, query and body. Rules are evaluated in order and
/// all matches are collected.
pub struct AnomalyDetector {
    rules: Vec<Rule>,
    cfg: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(cfg: AnomalyConfig) -> Self {
        Self::with_rules(rules::default_rules(&cfg), cfg)
    }

    pub fn with_rules(rules: Vec<Rule>, cfg: AnomalyConfig) -> Self {
        Self { rules, cfg }
    }

    /// A failing rule is skipped and logged; it never flags or blocks the
    /// request.
    pub fn scan(&self, view: &RequestView) -> Scan {
        let mut scan = Scan::default();
        for rule in self.rules.iter() {
            match (rule.check)(view, &self.cfg) {
                Ok(true) => {
                    scan.patterns.push(rule.tag);
                    if rule.severity > scan.severity {
                        scan.severity = rule.severity;
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "Anomaly rule {} failed on {} {}, skipped: {e:#}",
                        rule.tag, view.method, view.path
                    );
                }
            }
        }
        scan
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use crate::config::CommonConfig;
    use crate::types::identity::Role;

    use super::*;

    fn view<'a>(
        path: &'a str,
        query: &'a str,
        identity: Option<&'a IdentityContext>,
    ) -> RequestView<'a> {
        RequestView {
            method: "GET",
            path,
            query,
            body: None,
            identity,
        }
    }

    #[test]
    fn test_clean() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let caller = IdentityContext::new("u1", Role::Customer);
        let scan = detector.scan(&view("/api/resources/product/p1", "limit=20", Some(&caller)));
        assert_eq!(scan, Scan::default());
    }

    #[test]
    fn test_collects_all_matches() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let caller = IdentityContext::new("u1", Role::Customer);
        let scan = detector.scan(&view(
            "/api/admin/../secrets",
            "limit=500&q=1' OR '1'='1",
            Some(&caller),
        ));
        assert_eq!(
            scan.patterns,
            vec![
                PatternTag::PathTraversal,
                PatternTag::SqlInjectionAttempt,
                PatternTag::UnauthorizedAdminAccess,
                PatternTag::PotentialDataScraping,
            ]
        );
        assert!(scan.is_severe());
    }

    #[test]
    fn test_traversal_any_role() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let admin = IdentityContext::new("root", Role::Admin);
        for identity in [None, Some(&admin)] {
            let scan = detector.scan(&view("/api/resources/../../etc/passwd", "", identity));
            assert_eq!(scan.patterns, vec![PatternTag::PathTraversal]);
            assert_eq!(scan.severity, Severity::Severe);
        }
    }

    #[test]
    fn test_scraping_suspicious() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let caller = IdentityContext::new("u1", Role::Customer);
        let scan = detector.scan(&view("/api/resources/product", "limit=150", Some(&caller)));
        assert_eq!(scan.patterns, vec![PatternTag::PotentialDataScraping]);
        assert_eq!(scan.severity, Severity::Suspicious);
        assert_eq!(scan.describe(), "POTENTIAL_DATA_SCRAPING");

        let admin = IdentityContext::new("root", Role::Admin);
        let scan = detector.scan(&view("/api/resources/product", "limit=150", Some(&admin)));
        assert_eq!(scan.severity, Severity::None);
    }

    #[test]
    fn test_enumeration_log_only() {
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let caller = IdentityContext::new("u1", Role::Customer);
        let scan = detector.scan(&view("/api/resources/users/u2", "", Some(&caller)));
        assert_eq!(scan.patterns, vec![PatternTag::UserEnumerationAttempt]);
        assert_eq!(scan.severity, Severity::Suspicious);
        assert_eq!(scan.recorded().count(), 0);

        let scan = detector.scan(&view("/api/resources/users/u1", "", Some(&caller)));
        assert!(scan.patterns.is_empty());
    }

    #[test]
    fn test_failing_rule_fails_open() {
        fn broken(_view: &RequestView, _cfg: &AnomalyConfig) -> Result<bool> {
            bail!("rule crashed")
        }
        fn always(_view: &RequestView, _cfg: &AnomalyConfig) -> Result<bool> {
            Ok(true)
        }

        let rules = vec![
            Rule {
                tag: PatternTag::PathTraversal,
                severity: Severity::Severe,
                check: broken,
            },
            Rule {
                tag: PatternTag::PotentialDataScraping,
                severity: Severity::Suspicious,
                check: always,
            },
        ];
        let detector = AnomalyDetector::with_rules(rules, AnomalyConfig::default());
        let scan = detector.scan(&view("/../", "", None));
        assert_eq!(scan.patterns, vec![PatternTag::PotentialDataScraping]);
        assert_eq!(scan.severity, Severity::Suspicious);
    }
}
