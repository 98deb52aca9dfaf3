use super::{escape_xml, format_xml_string, Action};

/// Spoken text read to the caller with the platform's default voice.
pub struct Say {
    pub txt: String,
}

impl Say {
    pub fn new(txt: impl Into<String>) -> Self {
        Self { txt: txt.into() }
    }
}

impl Action for Say {
    fn as_twiml(&self) -> String {
        format_xml_string("Say", &[], &escape_xml(&self.txt))
    }
}
