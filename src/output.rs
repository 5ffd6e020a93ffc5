use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::constants::CREDENTIAL_PROCESS_VERSION;
use crate::credentials::Credentials;

/// The credential_process JSON contract.
///
/// SessionToken is always present and null for credentials without one.
/// Expiration is present only for time-limited credentials, which is how
/// callers tell permanent keys apart from sessions.
#[derive(Debug, Serialize)]
struct ProcessOutput<'a> {
    #[serde(rename = "Version")]
    version: u32,
    #[serde(rename = "AccessKeyId")]
    access_key_id: &'a str,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: &'a str,
    #[serde(rename = "SessionToken")]
    session_token: Option<&'a str>,
    #[serde(rename = "Expiration", skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

/// Render credentials for stdout. Everything else goes to stderr, so
/// callers can parse stdout unconditionally.
pub fn render(
    credentials: &Credentials,
    expiration: Option<DateTime<Utc>>,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ProcessOutput {
        version: CREDENTIAL_PROCESS_VERSION,
        access_key_id: &credentials.access_key_id,
        secret_access_key: &credentials.secret_access_key,
        session_token: credentials.session_token.as_deref(),
        expiration: expiration.map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true)),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_session_credentials_render_every_field() {
        let credentials = Credentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: Some("FQoGZXIvYXdzEBY".to_string()),
        };
        let expiration = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let rendered = render(&credentials, Some(expiration)).unwrap();
        assert_eq!(
            rendered,
            r#"{
  "Version": 1,
  "AccessKeyId": "AKIAEXAMPLE",
  "SecretAccessKey": "wJalrXUtnFEMI",
  "SessionToken": "FQoGZXIvYXdzEBY",
  "Expiration": "2024-05-01T12:00:00Z"
}"#
        );
    }

    #[test]
    fn test_static_credentials_have_null_token_and_no_expiration() {
        let credentials = Credentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: None,
        };

        let rendered = render(&credentials, None).unwrap();
        assert_eq!(
            rendered,
            r#"{
  "Version": 1,
  "AccessKeyId": "AKIAEXAMPLE",
  "SecretAccessKey": "wJalrXUtnFEMI",
  "SessionToken": null
}"#
        );
    }

    #[test]
    fn test_output_parses_back() {
        let credentials = Credentials {
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            session_token: Some("token".to_string()),
        };

        let rendered = render(&credentials, Some(Utc::now())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["Version"], 1);
        assert_eq!(value["AccessKeyId"], "AKIAEXAMPLE");
        assert!(value["Expiration"].as_str().unwrap().ends_with('Z'));
    }
}
