use crate::{
    secrets::Secrets,
    twiml::{Dial, DialTarget, Say, Twiml},
    CONFIG,
};
use axum::{
    body::Bytes,
    http::{header, HeaderMap},
    Extension,
};
use serde_json::Value;

/// Symbols besides ASCII digits that may appear in a dialable phone number.
pub const PHONE_NUMBER_SYMBOLS: [char; 5] = ['+', '-', '(', ')', ' '];

pub async fn voice_handler(
    secrets: Extension<Secrets>,
    headers: HeaderMap,
    body: Bytes,
) -> Twiml {
    let to = destination(&headers, &body);
    log::info!("Received call to: {to:?}");

    generate_routing_twiml(&secrets, to.trim())
}

/// Decide where the call goes. An empty destination greets the caller and
/// rings the default dialer identity.
pub fn generate_routing_twiml(secrets: &Secrets, to: &str) -> Twiml {
    let mut twiml = Twiml::new();

    let target = if to.is_empty() {
        twiml.add(&Say::new(CONFIG.dialer.greeting));
        DialTarget::Client(CONFIG.dialer.identity.to_owned())
    } else if is_phone_number(to) {
        DialTarget::Number(to.to_owned())
    } else {
        DialTarget::Client(to.to_owned())
    };

    twiml.add(&Dial {
        caller_id: secrets.twilio_caller_id.clone(),
        answer_on_bridge: CONFIG.dialer.answer_on_bridge,
        timeout_seconds: CONFIG.dialer.dial_timeout as u32,
        target,
    });

    twiml
}

/// True when `to` is non-empty and made only of digits and [`PHONE_NUMBER_SYMBOLS`].
pub fn is_phone_number(to: &str) -> bool {
    !to.is_empty()
        && to
            .chars()
            .all(|c| c.is_ascii_digit() || PHONE_NUMBER_SYMBOLS.contains(&c))
}

/// Extracts the `To` field from a JSON or form-encoded body. Anything
/// unreadable yields an empty destination.
fn destination(headers: &HeaderMap, body: &[u8]) -> String {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    if is_json {
        let Ok(Value::Object(fields)) = serde_json::from_slice::<Value>(body) else {
            return String::new();
        };
        match fields.get("To").or_else(|| fields.get("to")) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    } else {
        let mut fallback = None;
        for (key, value) in url::form_urlencoded::parse(body) {
            match key.as_ref() {
                "To" => return value.into_owned(),
                "to" if fallback.is_none() => fallback = Some(value.into_owned()),
                _ => {}
            }
        }
        fallback.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn secrets() -> Secrets {
        Secrets::from_lookup(|name| (name == "CALLER_ID").then(|| "+15550009999".to_owned()))
    }

    fn form() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        headers
    }

    fn json() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers
    }

    #[test]
    fn classifies_phone_numbers() {
        assert!(is_phone_number("+15551234567"));
        assert!(is_phone_number("+1 (555) 123-4567"));
        assert!(!is_phone_number("support-desk"));
        assert!(!is_phone_number("555.123.4567"));
        assert!(!is_phone_number(""));
    }

    #[test]
    fn dials_phone_number() {
        let xml = generate_routing_twiml(&secrets(), "+15551234567").as_twiml();

        assert!(xml.contains("<Number>+15551234567</Number>"));
        assert!(xml.contains("callerId=\"+15550009999\""));
        assert!(xml.contains("answerOnBridge=\"true\""));
        assert!(xml.contains("timeout=\"30\""));
        assert!(!xml.contains("<Say>"));
    }

    #[test]
    fn dials_client_identity() {
        let xml = generate_routing_twiml(&secrets(), "support-desk").as_twiml();

        assert!(xml.contains("<Client>support-desk</Client>"));
        assert!(!xml.contains("<Number>"));
    }

    #[test]
    fn empty_destination_greets_and_rings_default_identity() {
        let xml = generate_routing_twiml(&secrets(), "").as_twiml();

        let greeting = format!("<Say>{}</Say>", CONFIG.dialer.greeting);
        let client = format!("<Client>{}</Client>", CONFIG.dialer.identity);
        let say = xml.find(&greeting).expect("greeting");
        let dial = xml.find(&client).expect("default client");
        assert!(say < dial);
    }

    #[test]
    fn client_identity_is_escaped() {
        let xml = generate_routing_twiml(&secrets(), "<bob&alice>").as_twiml();

        assert!(xml.contains("<Client>&lt;bob&amp;alice&gt;</Client>"));
    }

    #[test]
    fn reads_form_destination() {
        assert_eq!(
            destination(&form(), b"From=client%3Aagent&To=%2B15551234567"),
            "+15551234567"
        );
    }

    #[test]
    fn reads_json_destination() {
        assert_eq!(destination(&json(), br#"{"To":"support-desk"}"#), "support-desk");
        assert_eq!(destination(&json(), br#"{"to":"support-desk"}"#), "support-desk");
        assert_eq!(destination(&json(), br#"{"To":15551234567}"#), "15551234567");
    }

    #[test]
    fn malformed_bodies_yield_empty_destination() {
        assert_eq!(destination(&json(), b"{not json"), "");
        assert_eq!(destination(&json(), br#"["To"]"#), "");
        assert_eq!(destination(&json(), br#"{"To":null}"#), "");
        assert_eq!(destination(&form(), b""), "");
        assert_eq!(destination(&HeaderMap::new(), b"From=someone"), "");
    }

    #[test]
    fn form_prefers_capitalised_field() {
        assert_eq!(destination(&form(), b"to=lower&To=upper"), "upper");
        assert_eq!(destination(&form(), b"to=lower"), "lower");
    }
}
