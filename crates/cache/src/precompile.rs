//! Hooks into a host-side precompilation cache
//!
//! After every write the engine calls [`Precompiler::invalidate`] and then
//! [`Precompiler::compile`] on the final path; after every delete it calls
//! `invalidate`. The hooks only run when a precompiler is attached and the
//! capability is enabled, see [`precompile_available`].

use std::env;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

/// Environment variable enabling the precompile hooks process-wide
pub const PRECOMPILE_ENV: &str = "WARMSTASH_PRECOMPILE";

/// Host cache of precompiled/hot file contents keyed by path
pub trait Precompiler: Send + Sync {
    /// Drop whatever is held for `path`
    fn invalidate(&self, path: &Path) -> io::Result<()>;

    /// Load `path` into the host cache
    fn compile(&self, path: &Path) -> io::Result<()>;
}

/// Whether precompile hooks are enabled for this process
///
/// Read from [`PRECOMPILE_ENV`] on first use and fixed for the lifetime of
/// the process.
pub fn precompile_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        env::var(PRECOMPILE_ENV)
            .ok()
            .and_then(|value| parse_flag(&value))
            .unwrap_or(false)
    })
}

/// Parse a boolean switch the way ini-style flags are written
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Keeps freshly written items in the OS page cache
///
/// On Linux `compile` asks the kernel to read the file ahead
/// (`POSIX_FADV_WILLNEED`) and `invalidate` lets it drop the cached pages
/// (`POSIX_FADV_DONTNEED`). On other platforms both calls do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageCacheWarmer;

impl Precompiler for PageCacheWarmer {
    fn invalidate(&self, path: &Path) -> io::Result<()> {
        #[cfg(target_os = "linux")]
        {
            advise(path, libc::POSIX_FADV_DONTNEED)
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = path;
            Ok(())
        }
    }

    fn compile(&self, path: &Path) -> io::Result<()> {
        #[cfg(target_os = "linux")]
        {
            advise(path, libc::POSIX_FADV_WILLNEED)
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = path;
            Ok(())
        }
    }
}

#[cfg(target_os = "linux")]
fn advise(path: &Path, advice: libc::c_int) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        // Nothing cached for a file that no longer exists
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    // SAFETY: the descriptor is owned by `file` and stays open for the call
    let rc = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, advice) };
    if rc != 0 {
        return Err(io::Error::from_raw_os_error(rc));
    }
    Ok(())
}
