use crate::CONFIG;
use std::env::var;

#[derive(Debug, Clone)]
pub struct Secrets {
    pub twilio_account_sid: String,
    pub twilio_api_key: String,
    pub twilio_api_secret: String,
    pub twilio_app_sid: String,
    pub twilio_caller_id: String,
    /// Enables webhook signature checks on `/voice` when present.
    pub twilio_auth_token: Option<String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| var(name).ok())
    }

    /// Builds the secrets from any variable source. Missing credentials are
    /// logged but tolerated, token issuance reports them per request.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let required = |name: &str| {
            lookup(name).filter(|v| !v.is_empty()).unwrap_or_else(|| {
                log::warn!("{name} is not set, token generation will fail");
                String::new()
            })
        };

        Self {
            twilio_account_sid: required("TWILIO_ACCOUNT_SID"),
            twilio_api_key: required("TWILIO_API_KEY"),
            twilio_api_secret: required("TWILIO_API_SECRET"),
            twilio_app_sid: required("TWIML_APP_SID"),
            twilio_caller_id: lookup("CALLER_ID")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| CONFIG.dialer.default_caller_id.to_owned()),
            twilio_auth_token: lookup("TWILIO_AUTH_TOKEN").filter(|v| !v.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reads_all_variables() {
        let vars: HashMap<&str, &str> = [
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_API_KEY", "SK123"),
            ("TWILIO_API_SECRET", "shh"),
            ("TWIML_APP_SID", "AP123"),
            ("CALLER_ID", "+15550001111"),
            ("TWILIO_AUTH_TOKEN", "auth"),
        ]
        .into_iter()
        .collect();

        let secrets = Secrets::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(secrets.twilio_account_sid, "AC123");
        assert_eq!(secrets.twilio_api_key, "SK123");
        assert_eq!(secrets.twilio_api_secret, "shh");
        assert_eq!(secrets.twilio_app_sid, "AP123");
        assert_eq!(secrets.twilio_caller_id, "+15550001111");
        assert_eq!(secrets.twilio_auth_token.as_deref(), Some("auth"));
    }

    #[test]
    fn falls_back_when_unset() {
        let secrets = Secrets::from_lookup(|_| None);

        assert!(secrets.twilio_api_secret.is_empty());
        assert_eq!(secrets.twilio_caller_id, CONFIG.dialer.default_caller_id);
        assert!(secrets.twilio_auth_token.is_none());
    }

    #[test]
    fn empty_auth_token_disables_signature_checks() {
        let secrets = Secrets::from_lookup(|name| {
            (name == "TWILIO_AUTH_TOKEN").then(String::new)
        });

        assert!(secrets.twilio_auth_token.is_none());
    }
}
