//! One-shot completion latch for a download request.
//!
//! Several events can try to conclude a download: the resolver round trip,
//! a transcoder failure, the transcoder exiting, and the client going away.
//! Whichever reaches [`ResponseGate::finalize`] first decides the outcome;
//! later attempts are logged and otherwise ignored.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use uuid::Uuid;

/// The event that concluded a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FinalizeSource {
    /// Resolution or validation produced the final answer.
    Resolver = 1,
    /// The transcoder failed to start or its output stream broke.
    ProcessError = 2,
    /// The transcoder exited on its own.
    ProcessExit = 3,
    /// The client closed the connection.
    ClientDisconnect = 4,
}

impl FinalizeSource {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Resolver),
            2 => Some(Self::ProcessError),
            3 => Some(Self::ProcessExit),
            4 => Some(Self::ClientDisconnect),
            _ => None,
        }
    }
}

impl fmt::Display for FinalizeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolver => "resolver",
            Self::ProcessError => "process_error",
            Self::ProcessExit => "process_exit",
            Self::ClientDisconnect => "client_disconnect",
        };
        f.write_str(name)
    }
}

const OPEN: u8 = 0;

#[derive(Debug)]
pub struct ResponseGate {
    job_id: Uuid,
    finalized: AtomicU8,
    headers_sent: AtomicBool,
}

impl ResponseGate {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            finalized: AtomicU8::new(OPEN),
            headers_sent: AtomicBool::new(false),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Claim the outcome. Returns `true` only for the first caller.
    pub fn finalize(&self, source: FinalizeSource) -> bool {
        match self.finalized.compare_exchange(
            OPEN,
            source as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                tracing::debug!(job_id = %self.job_id, %source, "request finalized");
                true
            }
            Err(winner) => {
                tracing::debug!(
                    job_id = %self.job_id,
                    %source,
                    winner = ?FinalizeSource::from_u8(winner),
                    "request already finalized, ignoring"
                );
                false
            }
        }
    }

    pub fn finalized_by(&self) -> Option<FinalizeSource> {
        FinalizeSource::from_u8(self.finalized.load(Ordering::Acquire))
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized_by().is_some()
    }

    /// Record that status and headers are on their way to the client.
    /// From here on failures can only be logged.
    pub fn mark_headers_sent(&self) {
        self.headers_sent.store(true, Ordering::Release);
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent.load(Ordering::Acquire)
    }
}
