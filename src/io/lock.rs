use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_FILE: &str = ".lock";

/// Advisory lock serializing read-modify-write cycles on a store directory.
///
/// Held by every command that opens the store and by `tstack watch` while it
/// sweeps. The holder's pid is written into the file for error messages.
/// The file itself is left in place: unlinking it on release would let a
/// waiter lock an inode nobody else can see.
pub struct FileLock {
    _file: File,
}

/// Error type for lock operations
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not acquire lock on {path}: {}", holder_hint(.holder))]
    Timeout { path: PathBuf, holder: Option<u32> },
}

fn holder_hint(holder: &Option<u32>) -> String {
    match holder {
        Some(pid) => format!("held by tstack process {}", pid),
        None => "another tstack process may be writing".to_string(),
    }
}

impl FileLock {
    /// Acquire the lock on `store_dir`, polling until `timeout` elapses.
    pub fn acquire(store_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = store_dir.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateError {
                path: path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        while try_lock(&file).is_err() {
            if start.elapsed() >= timeout {
                let holder = read_holder(&mut file);
                return Err(LockError::Timeout { path, holder });
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        if let Err(e) = write_holder(&mut file) {
            tracing::debug!(error = %e, "could not record lock holder");
        }
        Ok(FileLock { _file: file })
    }

    /// Acquire with default timeout (5 seconds)
    pub fn acquire_default(store_dir: &Path) -> Result<Self, LockError> {
        Self::acquire(store_dir, Duration::from_secs(5))
    }
}

fn write_holder(file: &mut File) -> std::io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    write!(file, "{}", std::process::id())
}

fn read_holder(file: &mut File) -> Option<u32> {
    let mut text = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut text).ok()?;
    text.trim().parse().ok()
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    // SAFETY: fd is a valid open descriptor owned by `file` for this call.
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
