//! Request record → feature vector. Pure given the clock passed in.

use super::{FeatureVector, RequestRecord, FEATURE_COUNT, FEATURE_NAMES};
use crate::error::ExtractionError;
use chrono::{Datelike, Local, NaiveDateTime, Timelike};

const SQL_KEYWORDS: [&str; 14] = [
    "select", "union", "where", "from", "or", "and", "exec", "execute", "insert", "update",
    "delete", "drop", "table", "database",
];

const SCRIPT_PATTERNS: [&str; 8] = [
    "<script",
    "javascript:",
    "onerror=",
    "onload=",
    "onmouseover=",
    "alert(",
    "document.",
    "window.",
];

const MAX_TIME_SINCE_LAST: f64 = 3600.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract using the local wall clock for `hour` and `day`.
    pub fn extract(&self, record: &RequestRecord) -> Result<FeatureVector, ExtractionError> {
        self.extract_at(record, Local::now().naive_local())
    }

    /// Extract with an explicit scoring instant.
    pub fn extract_at(
        &self,
        record: &RequestRecord,
        now: NaiveDateTime,
    ) -> Result<FeatureVector, ExtractionError> {
        if let Some(precomputed) = &record.features {
            let mut values = [0.0f32; FEATURE_COUNT];
            for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
                let v = precomputed
                    .get(name)
                    .ok_or_else(|| ExtractionError::MissingFeature(name.to_string()))?;
                *slot = *v as f32;
            }
            return Ok(FeatureVector::from_values(values));
        }

        let email = record.email.as_deref().unwrap_or("");
        let password = record.password.as_deref().unwrap_or("");
        let user_agent = record.user_agent.as_deref().unwrap_or("");
        let octets = parse_octets(record.ip_or_default())?;
        let password_lower = password.to_lowercase();

        let values = [
            email.chars().count() as f32,
            password.chars().count() as f32,
            password.chars().filter(|c| !c.is_alphanumeric()).count() as f32,
            flag(record.method.as_deref() == Some("POST")),
            flag(record.endpoint.as_deref() == Some("/api/login")),
            user_agent.chars().count() as f32,
            octets[0] as f32,
            octets[1] as f32,
            octets[2] as f32,
            octets[3] as f32,
            clamp_elapsed(record.time_since_last) as f32,
            record.body.as_ref().map_or(0, |b| b.len()) as f32,
            flag(SQL_KEYWORDS.iter().any(|kw| password_lower.contains(kw))),
            flag(SCRIPT_PATTERNS.iter().any(|p| password_lower.contains(p))),
            now.hour() as f32,
            now.weekday().num_days_from_monday() as f32,
            flag(email.ends_with("@gmail.com")),
            flag(email.ends_with("@yahoo.com")),
            flag(email.ends_with("@outlook.com")),
            0.0,
        ];
        Ok(FeatureVector::from_values(values))
    }
}

fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn clamp_elapsed(secs: Option<f64>) -> f64 {
    match secs {
        Some(s) if s.is_finite() => s.clamp(0.0, MAX_TIME_SINCE_LAST),
        _ => 0.0,
    }
}

/// Exactly four dot-separated components, each 0..=255.
fn parse_octets(ip: &str) -> Result<[u8; 4], ExtractionError> {
    let malformed = || ExtractionError::MalformedIp(ip.to_string());
    let mut out = [0u8; 4];
    let mut parts = ip.split('.');
    for slot in out.iter_mut() {
        *slot = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(malformed)?;
    }
    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn at() -> NaiveDateTime {
        // a Wednesday
        NaiveDate::from_ymd_opt(2025, 5, 7)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    fn sqli_record() -> RequestRecord {
        RequestRecord {
            email: Some("a@gmail.com".into()),
            password: Some("' OR 1=1".into()),
            method: Some("POST".into()),
            endpoint: Some("/api/login".into()),
            ip: Some("10.0.0.5".into()),
            user_agent: Some("x".into()),
            ..Default::default()
        }
    }

    #[test]
    fn sqli_login_scenario() {
        let fv = FeatureExtractor::new().extract_at(&sqli_record(), at()).unwrap();
        assert_eq!(fv.len(), FEATURE_COUNT);
        assert_eq!(fv.get("has_sql"), Some(1.0));
        assert_eq!(fv.get("has_script"), Some(0.0));
        assert_eq!(fv.get("is_login_endpoint"), Some(1.0));
        assert_eq!(fv.get("is_gmail"), Some(1.0));
        assert_eq!(fv.get("is_post"), Some(1.0));
        assert_eq!(fv.get("email_length"), Some(11.0));
        assert_eq!(fv.get("password_length"), Some(8.0));
        // ' space space =
        assert_eq!(fv.get("password_special_chars"), Some(4.0));
        assert_eq!(fv.get("ip_octet_1"), Some(10.0));
        assert_eq!(fv.get("ip_octet_4"), Some(5.0));
        assert_eq!(fv.get("hour"), Some(14.0));
        assert_eq!(fv.get("day"), Some(2.0));
        assert_eq!(fv.get("dummy"), Some(0.0));
    }

    #[test]
    fn empty_get_request() {
        let r = RequestRecord {
            method: Some("GET".into()),
            ip: Some("0.0.0.0".into()),
            ..Default::default()
        };
        let fv = FeatureExtractor::new().extract_at(&r, at()).unwrap();
        for name in ["email_length", "password_length", "user_agent_length", "is_post"] {
            assert_eq!(fv.get(name), Some(0.0), "{name}");
        }
        for i in 1..=4 {
            assert_eq!(fv.get(&format!("ip_octet_{i}")), Some(0.0));
        }
    }

    #[test]
    fn absent_ip_falls_back_to_zero_address() {
        let fv = FeatureExtractor::new()
            .extract_at(&RequestRecord::default(), at())
            .unwrap();
        assert_eq!(fv.get("ip_octet_1"), Some(0.0));
    }

    #[test]
    fn malformed_ip_is_rejected() {
        let ex = FeatureExtractor::new();
        for bad in ["10.0.5", "10.0.0.5.1", "10.0.x.5", "256.1.1.1", "", "10..0.1"] {
            let r = RequestRecord {
                ip: Some(bad.into()),
                ..Default::default()
            };
            assert_eq!(
                ex.extract_at(&r, at()),
                Err(ExtractionError::MalformedIp(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn method_and_endpoint_match_exactly() {
        let r = RequestRecord {
            method: Some("post".into()),
            endpoint: Some("/api/login/".into()),
            ..Default::default()
        };
        let fv = FeatureExtractor::new().extract_at(&r, at()).unwrap();
        assert_eq!(fv.get("is_post"), Some(0.0));
        assert_eq!(fv.get("is_login_endpoint"), Some(0.0));
    }

    #[test]
    fn script_patterns_are_case_insensitive() {
        let r = RequestRecord {
            password: Some("<SCRIPT>Alert(1)</script>".into()),
            ..Default::default()
        };
        let fv = FeatureExtractor::new().extract_at(&r, at()).unwrap();
        assert_eq!(fv.get("has_script"), Some(1.0));
    }

    #[test]
    fn elapsed_time_is_clamped() {
        let ex = FeatureExtractor::new();
        for (input, want) in [(Some(-5.0), 0.0), (Some(99999.0), 3600.0), (Some(12.5), 12.5), (None, 0.0)] {
            let r = RequestRecord {
                time_since_last: input,
                ..Default::default()
            };
            let fv = ex.extract_at(&r, at()).unwrap();
            assert_eq!(fv.get("time_since_last"), Some(want));
        }
    }

    #[test]
    fn body_fields_and_other_domains() {
        let mut body = serde_json::Map::new();
        body.insert("email".into(), "x".into());
        body.insert("password".into(), "y".into());
        body.insert("remember".into(), true.into());
        let r = RequestRecord {
            email: Some("bob@outlook.com".into()),
            body: Some(body),
            ..Default::default()
        };
        let fv = FeatureExtractor::new().extract_at(&r, at()).unwrap();
        assert_eq!(fv.get("body_field_count"), Some(3.0));
        assert_eq!(fv.get("is_outlook"), Some(1.0));
        assert_eq!(fv.get("is_gmail"), Some(0.0));
    }

    #[test]
    fn same_instant_same_vector() {
        let ex = FeatureExtractor::new();
        let a = ex.extract_at(&sqli_record(), at()).unwrap();
        let b = ex.extract_at(&sqli_record(), at()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn precomputed_features_follow_fixed_order() {
        let map: HashMap<String, f64> = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as f64))
            .collect();
        let r = RequestRecord {
            features: Some(map.clone()),
            ip: Some("bogus".into()),
            ..Default::default()
        };
        let fv = FeatureExtractor::new().extract_at(&r, at()).unwrap();
        let expected: Vec<f32> = (0..FEATURE_COUNT).map(|i| i as f32).collect();
        assert_eq!(fv.as_slice(), expected.as_slice());

        let mut partial = map;
        partial.remove("day");
        let r = RequestRecord {
            features: Some(partial),
            ..Default::default()
        };
        assert_eq!(
            FeatureExtractor::new().extract_at(&r, at()),
            Err(ExtractionError::MissingFeature("day".into()))
        );
    }
}
