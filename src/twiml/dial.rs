use super::{escape_xml, format_xml_string, Action};

/// Who the call is bridged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialTarget {
    /// A PSTN number, dialed as written.
    Number(String),
    /// A registered client identity, rung inside a browser or app session.
    Client(String),
}

impl Action for DialTarget {
    fn as_twiml(&self) -> String {
        match self {
            DialTarget::Number(number) => format_xml_string("Number", &[], &escape_xml(number)),
            DialTarget::Client(identity) => {
                format_xml_string("Client", &[], &escape_xml(identity))
            }
        }
    }
}

pub struct Dial {
    pub caller_id: String,
    pub answer_on_bridge: bool,
    pub timeout_seconds: u32,
    pub target: DialTarget,
}

impl Action for Dial {
    fn as_twiml(&self) -> String {
        let timeout_string = self.timeout_seconds.to_string();
        let answer_on_bridge = if self.answer_on_bridge { "true" } else { "false" };

        format_xml_string(
            "Dial",
            &[
                ("callerId", self.caller_id.as_str()),
                ("answerOnBridge", answer_on_bridge),
                ("timeout", timeout_string.as_str()),
            ],
            &self.target.as_twiml(),
        )
    }
}
