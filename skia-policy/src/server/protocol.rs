//! Line protocol spoken over the query socket
//!
//! Requests, one per line:
//!   `QUERY <app> <host> <port>`
//!   `FORGET <app>`
//!
//! Responses:
//!   `DIRECT`, `PROXY <host> <port>`, `PROXY <host> <port> NOCACHE`,
//!   `OK`, or `ERROR`.

use crate::decision::Decision;
use crate::error::{PolicyError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Query { app: String, host: String, port: u16 },
    Forget { app: String },
}

impl Request {
    /// Parse one request line.
    ///
    /// Process names may contain spaces, so `QUERY` takes its port and host
    /// from the right and keeps everything before them as the app.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

        match verb {
            "QUERY" => {
                let mut fields = rest.rsplitn(3, char::is_whitespace);
                let port = fields.next().unwrap_or_default();
                let host = fields.next().unwrap_or_default();
                let app = fields.next().map(str::trim_end).unwrap_or_default();
                if app.is_empty() || host.is_empty() {
                    return Err(PolicyError::Query(format!(
                        "QUERY needs <app> <host> <port>, got {:?}",
                        rest
                    )));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| PolicyError::Query(format!("invalid port number: {}", port)))?;
                Ok(Request::Query {
                    app: app.to_string(),
                    host: host.to_string(),
                    port,
                })
            }
            "FORGET" if !rest.is_empty() => Ok(Request::Forget {
                app: rest.to_string(),
            }),
            "" => Err(PolicyError::Query("empty request".to_string())),
            _ => Err(PolicyError::Query(format!("unexpected request: {}", line))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Decision(Decision),
    Ok,
    Error,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Decision(decision) => write!(f, "{}", decision),
            Response::Ok => write!(f, "OK"),
            Response::Error => write!(f, "ERROR"),
        }
    }
}
