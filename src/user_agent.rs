//! User-Agent string for catalog requests.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/novelcrawl";

/// Default User-Agent for catalog requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("novelcrawl/{version} (catalog-archiver; +{PROJECT_UA_URL})")
}
