//! Session management
//!
//! A session is one run of an executable. It owns a timestamped directory holding the log file and
//! the archives, and fixes the epoch that log lines and status reports are timed against.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::{fs, path::PathBuf};
use thiserror::Error;

use crate::{host, time};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Timestamp appended to session directory names, see `chrono::format::strftime`.
const DIR_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the archive directory inside a session.
const ARCH_DIR_NAME: &str = "arch";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Session {
    /// `{parent}/{exec_name}_{timestamp}`
    pub session_root: PathBuf,

    /// Directory archives are written into
    pub arch_root: PathBuf,

    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (HWY_PLANNER_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started in this process")]
    AlreadyStarted,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a session in `sessions_dir`, relative to the software root.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        Self::new_in(root.join(sessions_dir), exec_name)
    }

    /// Start a session inside an explicit parent directory.
    ///
    /// Only one session may be started per process.
    pub fn new_in(parent: PathBuf, exec_name: &str) -> Result<Self, SessionError> {
        let now = Utc::now();
        SESSION_EPOCH
            .try_init_once(|| now)
            .map_err(|_| SessionError::AlreadyStarted)?;

        let session_root = parent.join(format!(
            "{}_{}",
            exec_name,
            now.format(DIR_TIMESTAMP_FORMAT)
        ));
        let arch_root = session_root.join(ARCH_DIR_NAME);

        fs::create_dir_all(&arch_root).map_err(SessionError::CannotCreateDir)?;

        Ok(Session {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
            arch_root,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the session started, or `NaN` before any session has been started.
pub fn get_elapsed_seconds() -> f64 {
    SESSION_EPOCH
        .get()
        .and_then(|e| time::duration_to_seconds(Utc::now() - *e))
        .unwrap_or(std::f64::NAN)
}

/// The instant the session started, if one has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
