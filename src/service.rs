//! Single-owner pid service.
//!
//! One thread owns the [`PidAllocator`]; everybody else talks to it through a
//! [`PidClient`], which sends [`Request`]s over a channel and waits for the
//! matching [`Response`].

use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::{
    protocol::{ErrorKind, Request, Response},
    Pid, PidAllocator, PidError, PidRange, Result,
};

struct Envelope {
    request: Request,
    reply: Sender<Response>,
}

pub struct PidService {
    handle: JoinHandle<usize>,
}

impl PidService {
    /// Starts the owner thread with a fresh, uninitialized allocator over `range`.
    pub fn spawn(range: PidRange) -> std::io::Result<(Self, PidClient)> {
        let (tx, rx) = channel::unbounded();

        let handle = thread::Builder::new()
            .name("pid-service".into())
            .spawn(move || serve(PidAllocator::new(range), rx))?;

        Ok((Self { handle }, PidClient { tx, range }))
    }

    /// Waits for the owner thread to stop and returns how many requests it served.
    pub fn join(self) -> thread::Result<usize> {
        self.handle.join()
    }
}

fn serve(mut allocator: PidAllocator, rx: Receiver<Envelope>) -> usize {
    info!(
        min = allocator.range().min(),
        max = allocator.range().max(),
        "pid service started"
    );

    let mut served = 0;

    for Envelope { request, reply } in rx.iter() {
        served += 1;

        let response = match request {
            Request::Initialize => {
                allocator.initialize();
                Response::Ok
            }
            Request::Allocate => Response::from_allocate(allocator.allocate()),
            Request::Release(raw) => match u32::try_from(raw) {
                Ok(pid) => Response::from_unit(allocator.release(Pid::new(pid))),
                Err(_) if !allocator.is_initialized() => {
                    Response::Error(ErrorKind::NotInitialized)
                }
                Err(_) => {
                    warn!(pid = raw, "invalid pid");
                    Response::Error(ErrorKind::OutOfRange)
                }
            },
            Request::Done => Response::Bye,
        };

        debug!(%request, %response, "served");

        if reply.send(response).is_err() {
            warn!(%request, "client went away before the reply");
        }

        if request == Request::Done {
            break;
        }
    }

    info!(served, in_use = allocator.in_use(), "pid service stopped");

    served
}

/// Cloneable handle to a running [`PidService`].
#[derive(Clone, Debug)]
pub struct PidClient {
    tx: Sender<Envelope>,
    range: PidRange,
}

impl PidClient {
    pub fn range(&self) -> PidRange {
        self.range
    }

    pub fn request(&self, request: Request) -> Result<Response> {
        let (reply, response) = channel::bounded(1);

        self.tx
            .send(Envelope { request, reply })
            .map_err(|_| PidError::Disconnected)?;

        response.recv().map_err(|_| PidError::Disconnected)
    }

    /// Sends one wire-framed request and returns the wire-framed reply.
    pub fn request_line(&self, line: &str) -> Result<String> {
        let request = line.parse()?;

        self.request(request).map(|response| response.to_string())
    }

    pub fn initialize(&self) -> Result<()> {
        match self.request(Request::Initialize)? {
            Response::Ok => Ok(()),
            other => Err(self.unexpected(other)),
        }
    }

    pub fn allocate(&self) -> Result<Pid> {
        match self.request(Request::Allocate)? {
            Response::Allocated(pid) => Ok(pid),
            Response::Error(kind) => Err(self.error(kind, None)),
            other => Err(self.unexpected(other)),
        }
    }

    pub fn release(&self, pid: Pid) -> Result<()> {
        match self.request(Request::release(pid))? {
            Response::Ok => Ok(()),
            Response::Error(kind) => Err(self.error(kind, Some(pid))),
            other => Err(self.unexpected(other)),
        }
    }

    /// Asks the service to stop after replying.
    pub fn shutdown(&self) -> Result<()> {
        match self.request(Request::Done)? {
            Response::Bye => Ok(()),
            other => Err(self.unexpected(other)),
        }
    }

    fn error(&self, kind: ErrorKind, pid: Option<Pid>) -> PidError {
        match kind {
            ErrorKind::NotInitialized => PidError::NotInitialized,
            ErrorKind::PoolExhausted => PidError::PoolExhausted,
            ErrorKind::OutOfRange => PidError::OutOfRange {
                pid: pid.map_or(0, Pid::get),
                min: self.range.min(),
                max: self.range.max(),
            },
            ErrorKind::Internal => {
                PidError::Protocol("service reported an internal error".into())
            }
        }
    }

    fn unexpected(&self, response: Response) -> PidError {
        PidError::Protocol(format!("unexpected response {response}"))
    }
}
