//! Filesystem Remote Resolver
//!
//! Serves the JSON-Schema-Test-Suite `remotes/` tree. A reference such as
//! `http://localhost:1234/baseUriChange/folderInteger.json` maps onto
//! `<base_dir>/remotes/baseUriChange/folderInteger.json`.
//!
//! Nothing is cached: fixtures may be regenerated between runs and every call
//! reads the current file from disk.

use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::error::{HarnessError, Result};
use crate::reference::SchemaReference;
use crate::resolver::ByteStream;

/// Directory under the base directory holding remote fixtures
pub const REMOTES_DIR: &str = "remotes";

/// Upper bound on a single fixture read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolves local-fixture URIs to files under `<base_dir>/remotes`
#[derive(Debug, Clone)]
pub struct FsRemoteResolver {
    base_dir: PathBuf,
    remotes_dir: PathBuf,
    read_timeout: Duration,
}

impl FsRemoteResolver {
    /// Create a resolver rooted at `base_dir`, which must be a readable directory
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let invalid = |reason: String| HarnessError::InvalidBaseDirectory {
            path: base_dir.clone(),
            reason,
        };

        let metadata = fs::metadata(&base_dir).map_err(|e| invalid(e.to_string()))?;
        if !metadata.is_dir() {
            return Err(invalid("not a directory".to_string()));
        }
        fs::read_dir(&base_dir).map_err(|e| invalid(e.to_string()))?;

        let remotes_dir = base_dir.join(REMOTES_DIR);
        Ok(Self {
            base_dir,
            remotes_dir,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a URI path onto the remotes tree.
    ///
    /// Leading and trailing `/` are trimmed and the remaining segments are
    /// joined with the host separator. `.` and `..` segments are refused so a
    /// reference cannot leave the remotes tree.
    pub fn path_for(&self, uri_path: &str) -> Result<PathBuf> {
        let trimmed = uri_path.trim_matches('/');
        let not_found = || HarnessError::ResourceNotFound {
            path: self.remotes_dir.join(trimmed),
        };

        if trimmed.is_empty() {
            return Err(not_found());
        }

        let mut path = self.remotes_dir.clone();
        for segment in trimmed.split('/') {
            match segment {
                "" => continue,
                "." | ".." => return Err(not_found()),
                _ => path.push(segment),
            }
        }
        Ok(path)
    }

    /// Open the fixture backing `reference`
    pub fn resolve(&self, reference: &SchemaReference) -> Result<ByteStream> {
        self.resolve_path(reference.path())
    }

    /// Open the fixture at a URI path
    pub fn resolve_path(&self, uri_path: &str) -> Result<ByteStream> {
        let path = self.path_for(uri_path)?;
        let bytes = read_with_timeout(&path, self.read_timeout)?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}

/// Read a whole file on a helper thread, giving up after `timeout`.
///
/// Each call spawns its own thread. On timeout that thread is left blocked in
/// the read and exits whenever the read returns, so a run leaks at most one
/// thread per timed-out reference.
fn read_with_timeout(path: &Path, timeout: Duration) -> Result<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    let target = path.to_path_buf();
    thread::spawn(move || {
        // receiver is gone if the read timed out
        let _ = tx.send(fs::read(&target));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => Err(HarnessError::ResourceNotFound {
            path: path.to_path_buf(),
        }),
        Ok(Err(source)) => Err(HarnessError::Io {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) => Err(wait_error(path, e, timeout)),
    }
}

fn wait_error(path: &Path, error: RecvTimeoutError, timeout: Duration) -> HarnessError {
    let source = match error {
        RecvTimeoutError::Timeout => io::Error::new(
            io::ErrorKind::TimedOut,
            format!("read did not finish within {:?}", timeout),
        ),
        RecvTimeoutError::Disconnected => {
            io::Error::new(io::ErrorKind::Other, "reader thread exited without a result")
        }
    };
    HarnessError::Io {
        path: path.to_path_buf(),
        source,
    }
}
