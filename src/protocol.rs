//! Line framing for talking to a [`PidService`](crate::service::PidService) over a text channel.
//!
//! Requests: `Init`, `Allocate`, `Release:<pid>`, `Done`.
//! Responses: `Ok`, `Ok:<pid>`, `Err:<kind>`, `Bye`.

use std::{fmt, str::FromStr};

use crate::{Pid, PidError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    Initialize,
    Allocate,
    /// Carries the id as sent, which may lie outside of `u32`.
    Release(i64),
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    Ok,
    Allocated(Pid),
    Error(ErrorKind),
    Bye,
}

/// Error indicator carried by [`Response::Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotInitialized,
    OutOfRange,
    PoolExhausted,
    /// Any failure that is not an allocator outcome.
    Internal,
}

impl ErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotInitialized => "NotInitialized",
            ErrorKind::OutOfRange => "OutOfRange",
            ErrorKind::PoolExhausted => "PoolExhausted",
            ErrorKind::Internal => "Internal",
        }
    }
}

impl From<&PidError> for ErrorKind {
    fn from(value: &PidError) -> Self {
        match value {
            PidError::NotInitialized => ErrorKind::NotInitialized,
            PidError::OutOfRange { .. } => ErrorKind::OutOfRange,
            PidError::PoolExhausted => ErrorKind::PoolExhausted,
            PidError::InvalidRange { .. }
            | PidError::Config(_)
            | PidError::Protocol(_)
            | PidError::Disconnected => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = PidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NotInitialized" => Ok(ErrorKind::NotInitialized),
            "OutOfRange" => Ok(ErrorKind::OutOfRange),
            "PoolExhausted" => Ok(ErrorKind::PoolExhausted),
            "Internal" => Ok(ErrorKind::Internal),
            _ => Err(PidError::Protocol(format!("unknown error kind {s:?}"))),
        }
    }
}

impl Response {
    /// Builds the reply for an allocate call.
    pub(crate) fn from_allocate(result: crate::Result<Pid>) -> Self {
        match result {
            Ok(pid) => Response::Allocated(pid),
            Err(e) => Self::from_error(&e),
        }
    }

    /// Builds the reply for a call that yields nothing on success.
    pub(crate) fn from_unit(result: crate::Result<()>) -> Self {
        match result {
            Ok(()) => Response::Ok,
            Err(e) => Self::from_error(&e),
        }
    }

    fn from_error(e: &PidError) -> Self {
        Response::Error(e.into())
    }
}

impl Request {
    pub fn release(pid: Pid) -> Self {
        Request::Release(pid.get().into())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Initialize => f.write_str("Init"),
            Request::Allocate => f.write_str("Allocate"),
            Request::Release(pid) => write!(f, "Release:{pid}"),
            Request::Done => f.write_str("Done"),
        }
    }
}

impl FromStr for Request {
    type Err = PidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, payload) = split(s);

        match (tag, payload) {
            ("Init", None) => Ok(Request::Initialize),
            ("Allocate", None) => Ok(Request::Allocate),
            ("Release", Some(id)) => parse_id(id).map(Request::Release),
            ("Done", None) => Ok(Request::Done),
            _ => Err(PidError::Protocol(format!("bad request {s:?}"))),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => f.write_str("Ok"),
            Response::Allocated(pid) => write!(f, "Ok:{pid}"),
            Response::Error(kind) => write!(f, "Err:{kind}"),
            Response::Bye => f.write_str("Bye"),
        }
    }
}

impl FromStr for Response {
    type Err = PidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, payload) = split(s);

        match (tag, payload) {
            ("Ok", None) => Ok(Response::Ok),
            ("Ok", Some(pid)) => pid.parse().map(Response::Allocated),
            ("Err", Some(kind)) => kind.parse().map(Response::Error),
            ("Bye", None) => Ok(Response::Bye),
            _ => Err(PidError::Protocol(format!("bad response {s:?}"))),
        }
    }
}

/// Parses an optionally negative decimal id. Values past `i64` saturate, so
/// they still land outside of any pid range.
fn parse_id(s: &str) -> Result<i64, PidError> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, s),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PidError::Protocol(format!("{s:?} is not an id")));
    }

    Ok(s.parse().unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}

fn split(s: &str) -> (&str, Option<&str>) {
    let s = s.trim_end_matches(['\r', '\n']);

    match s.split_once(':') {
        Some((tag, payload)) => (tag, Some(payload)),
        None => (s, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_forms() {
        assert_eq!("Init".parse::<Request>(), Ok(Request::Initialize));
        assert_eq!("Allocate".parse::<Request>(), Ok(Request::Allocate));
        assert_eq!("Release:250".parse::<Request>(), Ok(Request::release(Pid::new(250))));
        assert_eq!("Release:-1".parse::<Request>(), Ok(Request::Release(-1)));
        assert_eq!(
            "Release:4294967296".parse::<Request>(),
            Ok(Request::Release(4_294_967_296))
        );
        assert_eq!(
            "Release:99999999999999999999".parse::<Request>(),
            Ok(Request::Release(i64::MAX))
        );
        assert_eq!("Done\n".parse::<Request>(), Ok(Request::Done));

        assert_eq!(Request::release(Pid::new(7)).to_string(), "Release:7");
        assert_eq!(Request::Release(-3).to_string(), "Release:-3");
        assert_eq!(Request::Initialize.to_string(), "Init");
    }

    #[test]
    fn test_response_wire_forms() {
        assert_eq!("Ok".parse::<Response>(), Ok(Response::Ok));
        assert_eq!("Ok:100".parse::<Response>(), Ok(Response::Allocated(Pid::new(100))));
        assert_eq!(
            "Err:PoolExhausted".parse::<Response>(),
            Ok(Response::Error(ErrorKind::PoolExhausted))
        );
        assert_eq!("Bye".parse::<Response>(), Ok(Response::Bye));

        assert_eq!(
            Response::Error(ErrorKind::NotInitialized).to_string(),
            "Err:NotInitialized"
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "allocate",
            "Allocate:1",
            "Release",
            "Release:",
            "Release:-",
            "Release:+5",
            "Release: 5",
            "Release:5x",
            "Release:x",
            "Done:now",
        ] {
            assert!(
                matches!(bad.parse::<Request>(), Err(PidError::Protocol(_))),
                "{bad:?} should be rejected"
            );
        }

        for bad in ["", "Ok:", "Ok:+7", "Ok:-7", "Err", "Err:Oops", "Bye:1"] {
            assert!(
                matches!(bad.parse::<Response>(), Err(PidError::Protocol(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_results_map_to_responses() {
        assert_eq!(
            Response::from_allocate(Ok(Pid::new(3))),
            Response::Allocated(Pid::new(3))
        );
        assert_eq!(
            Response::from_allocate(Err(PidError::PoolExhausted)),
            Response::Error(ErrorKind::PoolExhausted)
        );
        assert_eq!(
            Response::from_unit(Err(PidError::OutOfRange { pid: 1, min: 2, max: 3 })),
            Response::Error(ErrorKind::OutOfRange)
        );
        assert_eq!(Response::from_unit(Ok(())), Response::Ok);
        assert_eq!(
            Response::from_unit(Err(PidError::Disconnected)),
            Response::Error(ErrorKind::Internal)
        );
        assert_eq!(Response::Error(ErrorKind::Internal).to_string(), "Err:Internal");
    }
}
