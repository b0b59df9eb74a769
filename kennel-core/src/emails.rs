//! Email list derivation used by record displays.
//!
//! An emails field holds one primary address plus any number of additional
//! ones. Displays show them primary first, each as a link that opens a
//! compose window on behalf of the viewer.

use serde::{Deserialize, Serialize};

const COMPOSE_BASE: &str = "https://mail.google.com/mail/?fs=1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailsValue {
    pub primary_email: Option<String>,
    #[serde(default)]
    pub additional_emails: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailLink {
    pub label: String,
    pub href: String,
}

/// Primary address first, then the additional ones in order.
///
/// Blank entries are dropped, as are repeats of an address already listed
/// (compared case-insensitively, the first spelling wins). Absent input
/// yields an empty list.
pub fn collect_emails(value: Option<&EmailsValue>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };

    let candidates = value
        .primary_email
        .iter()
        .chain(value.additional_emails.iter().flatten());

    let mut out: Vec<String> = Vec::new();
    for email in candidates {
        let email = email.trim();
        if email.is_empty() {
            continue;
        }
        if out.iter().any(|seen| seen.eq_ignore_ascii_case(email)) {
            continue;
        }
        out.push(email.to_string());
    }
    out
}

/// Compose link for `email`, opened as `viewer_email` when known.
pub fn compose_url(email: &str, viewer_email: Option<&str>) -> String {
    let authuser = viewer_email
        .map(|v| urlencoding::encode(v).into_owned())
        .unwrap_or_default();
    format!("{COMPOSE_BASE}&to={email}&tf=cm&authuser={authuser}")
}

pub fn email_links(value: Option<&EmailsValue>, viewer_email: Option<&str>) -> Vec<EmailLink> {
    collect_emails(value)
        .into_iter()
        .map(|email| EmailLink {
            href: compose_url(&email, viewer_email),
            label: email,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(primary: Option<&str>, additional: &[&str]) -> EmailsValue {
        EmailsValue {
            primary_email: primary.map(str::to_string),
            additional_emails: Some(additional.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn primary_comes_first() {
        let v = value(Some("a@x.com"), &["b@x.com"]);
        assert_eq!(collect_emails(Some(&v)), vec!["a@x.com", "b@x.com"]);
    }

    #[test]
    fn empty_and_absent_values_yield_nothing() {
        assert!(collect_emails(Some(&value(None, &[]))).is_empty());
        assert!(collect_emails(None).is_empty());
        assert!(collect_emails(Some(&EmailsValue::default())).is_empty());
    }

    #[test]
    fn blanks_and_duplicates_are_dropped() {
        let v = value(Some(""), &["b@x.com", "  ", "B@x.com", "c@x.com", "b@x.com"]);
        assert_eq!(collect_emails(Some(&v)), vec!["b@x.com", "c@x.com"]);

        let v = value(Some("a@x.com"), &["A@X.COM"]);
        assert_eq!(collect_emails(Some(&v)), vec!["a@x.com"]);
    }

    #[test]
    fn missing_additional_list_deserializes() {
        let v: EmailsValue = serde_json::from_str(r#"{"primaryEmail":"a@x.com"}"#).unwrap();
        assert_eq!(collect_emails(Some(&v)), vec!["a@x.com"]);

        let v: EmailsValue =
            serde_json::from_str(r#"{"primaryEmail":null,"additionalEmails":null}"#).unwrap();
        assert!(collect_emails(Some(&v)).is_empty());
    }

    #[test]
    fn compose_url_encodes_viewer_only() {
        assert_eq!(
            compose_url("a@x.com", Some("me+crm@y.com")),
            "https://mail.google.com/mail/?fs=1&to=a@x.com&tf=cm&authuser=me%2Bcrm%40y.com"
        );
        assert_eq!(
            compose_url("a@x.com", None),
            "https://mail.google.com/mail/?fs=1&to=a@x.com&tf=cm&authuser="
        );
    }

    #[test]
    fn links_follow_collected_order() {
        let v = value(Some("a@x.com"), &["b@x.com"]);
        let links = email_links(Some(&v), Some("me@y.com"));
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].label, "a@x.com");
        assert!(links[1].href.contains("to=b@x.com"));
        assert!(links[1].href.ends_with("authuser=me%40y.com"));
    }
}
