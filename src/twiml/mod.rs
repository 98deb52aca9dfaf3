mod dial;
mod say;

pub use dial::{Dial, DialTarget};
pub use say::Say;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

/// A TwiML verb that can render itself as an XML element.
pub trait Action {
    fn as_twiml(&self) -> String;
}

/// A `<Response>` document, verbs are rendered in insertion order.
#[derive(Debug, Default)]
pub struct Twiml {
    body: String,
}

impl Twiml {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, action: &impl Action) -> &mut Self {
        self.body.push_str(&action.as_twiml());
        self
    }

    pub fn as_twiml(&self) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>{}",
            format_xml_string("Response", &[], &self.body)
        )
    }
}

impl IntoResponse for Twiml {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "text/xml")], self.as_twiml()).into_response()
    }
}

/// Renders `<tag attr="value">inner</tag>`, or a self-closing element when
/// `inner` is empty. Attribute values are escaped, `inner` is taken as markup.
pub(crate) fn format_xml_string(tag: &str, attrs: &[(&str, &str)], inner: &str) -> String {
    let attrs: String = attrs
        .iter()
        .map(|(k, v)| format!(" {}=\"{}\"", k, escape_xml(v)))
        .collect();

    if inner.is_empty() {
        format!("<{tag}{attrs}/>")
    } else {
        format!("<{tag}{attrs}>{inner}</{tag}>")
    }
}

pub(crate) fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}
