use crate::CONFIG;
use askama::Template;

pub async fn status_page() -> StatusPage {
    StatusPage {
        identity: CONFIG.dialer.identity,
    }
}

#[derive(Debug, Template)]
#[template(path = "index.html")]
pub struct StatusPage {
    identity: &'static str,
}
