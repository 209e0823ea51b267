//! Error-log grammar.
//!
//! Layout: `timestamp [level] pid#tid: *cid message` followed by up to four
//! comma clauses (`client`, `server`, `request`, `host`), each independently
//! optional. The message capture is lazy so the trailing clauses are never
//! swallowed into it.

use once_cell::sync::Lazy;
use regex::Regex;

static ERROR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?P<time_local>\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}) \[(?P<level>\w+)\] (?P<pid>\d+)#\d+: (?:\*\d+)? ?(?P<message>.*?)(?:, client: (?P<client>[^,]+))?(?:, server: (?P<server>[^,]+))?(?:, request: "(?P<request>[^"]+)")?(?:, host: "(?P<host>[^"]+)")?$"#,
    )
    .expect("error grammar is a valid regex")
});

/// Raw captures from one error-log line. The four trailing clauses are
/// tagged present/absent rather than carried as sentinel strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorFields<'a> {
    pub time_local: &'a str,
    pub level: &'a str,
    pub pid: &'a str,
    pub message: &'a str,
    pub client: Option<&'a str>,
    pub server: Option<&'a str>,
    pub request: Option<&'a str>,
    pub host: Option<&'a str>,
}

/// Match one line against the error grammar; `None` when it does not fit.
pub fn parse(line: &str) -> Option<ErrorFields<'_>> {
    let caps = ERROR_RE.captures(line)?;
    let field = |name| caps.name(name).map(|m| m.as_str());

    Some(ErrorFields {
        time_local: field("time_local")?,
        level: field("level")?,
        pid: field("pid")?,
        message: field("message")?,
        client: field("client"),
        server: field("server"),
        request: field("request"),
        host: field("host"),
    })
}
