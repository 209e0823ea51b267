//! Access-log grammar (combined format with upstream timing fields).

use once_cell::sync::Lazy;
use regex::Regex;

static ACCESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<remote_addr>\S+) - (?P<remote_user>\S+) \[(?P<time_local>[^\]]+)\] "(?P<request>[^"]*)" (?P<status>\d+) (?P<body_bytes_sent>\d+) "(?P<http_referer>[^"]*)" "(?P<http_user_agent>[^"]*)" (?P<upstream_addr>\S+) (?P<request_time>\S+) (?P<upstream_response_time>\S+)$"#,
    )
    .expect("access grammar is a valid regex")
});

/// Raw captures from one access-log line. All fields are present whenever
/// the line matches; `-` placeholders are still raw text at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFields<'a> {
    pub remote_addr: &'a str,
    pub remote_user: &'a str,
    pub time_local: &'a str,
    pub request: &'a str,
    pub status: &'a str,
    pub body_bytes_sent: &'a str,
    pub http_referer: &'a str,
    pub http_user_agent: &'a str,
    pub upstream_addr: &'a str,
    pub request_time: &'a str,
    pub upstream_response_time: &'a str,
}

/// Match one line against the access grammar.
///
/// Returns `None` when the line does not have the fixed layout; the caller
/// decides whether that is worth reporting.
pub fn parse(line: &str) -> Option<AccessFields<'_>> {
    let caps = ACCESS_RE.captures(line)?;
    let field = |name| caps.name(name).map(|m| m.as_str());

    Some(AccessFields {
        remote_addr: field("remote_addr")?,
        remote_user: field("remote_user")?,
        time_local: field("time_local")?,
        request: field("request")?,
        status: field("status")?,
        body_bytes_sent: field("body_bytes_sent")?,
        http_referer: field("http_referer")?,
        http_user_agent: field("http_user_agent")?,
        upstream_addr: field("upstream_addr")?,
        request_time: field("request_time")?,
        upstream_response_time: field("upstream_response_time")?,
    })
}
