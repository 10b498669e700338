use std::ffi::{CString, NulError};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use log::debug;
use nix::errno::Errno;
use nix::fcntl::{fcntl, open, FcntlArg, FdFlag, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, execve, fork, ForkResult, Pid};
use thiserror::Error;

use crate::shell::parser::ast::{RedirectKind, Redirection};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("pipe: {0}")]
    Pipe(#[source] Errno),
    #[error("fork: {0}")]
    Fork(#[source] Errno),
    #[error("wait: {0}")]
    Wait(#[source] Errno),
    #[error("argument contains a NUL byte: {0}")]
    InvalidArgument(#[from] NulError),
}

/// A descriptor change applied in the child, in order, before exec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FdAction {
    Dup { from: RawFd, to: RawFd },
    Open(Redirection),
}

#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub program: PathBuf,
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    pub fd_actions: Vec<FdAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildHandle(pub i32);

pub trait Spawner {
    fn spawn(&mut self, request: &SpawnRequest) -> Result<ChildHandle, SpawnError>;

    /// Blocks until the child terminates and returns its exit status.
    fn wait(&mut self, child: ChildHandle) -> Result<i32, SpawnError>;
}

/// Spawns real processes with fork and execve.
#[derive(Debug, Default)]
pub struct ForkSpawner;

// Everything the child needs is converted before fork, diagnostics included.
// The child must not allocate: other threads may hold the allocator lock.
enum ChildAction {
    Dup { from: RawFd, to: RawFd },
    Open { path: CString, flags: OFlag, to: RawFd },
}

struct ChildFailure<'a> {
    label: &'a [u8],
    errno: Errno,
}

fn open_flags(kind: RedirectKind) -> OFlag {
    match kind {
        RedirectKind::Input => OFlag::O_RDONLY,
        RedirectKind::Output => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        RedirectKind::Append => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
    }
}

fn to_cstring(path: &Path) -> Result<CString, NulError> {
    CString::new(path.as_os_str().as_bytes())
}

impl ChildAction {
    fn prepare(action: &FdAction) -> Result<Self, NulError> {
        Ok(match action {
            FdAction::Dup { from, to } => ChildAction::Dup { from: *from, to: *to },
            FdAction::Open(redirection) => ChildAction::Open {
                path: CString::new(redirection.filename.as_bytes())?,
                flags: open_flags(redirection.kind),
                to: redirection.target_fd,
            },
        })
    }

    fn apply(&self) -> Result<(), ChildFailure<'_>> {
        match self {
            // dup2 onto itself keeps FD_CLOEXEC, so the flag is cleared instead.
            ChildAction::Dup { from, to } if from == to => {
                fcntl(*from, FcntlArg::F_SETFD(FdFlag::empty())).map_err(|errno| ChildFailure {
                    label: b"fcntl",
                    errno,
                })?;
            }
            ChildAction::Dup { from, to } => {
                dup2(*from, *to).map_err(|errno| ChildFailure {
                    label: b"dup2",
                    errno,
                })?;
            }
            ChildAction::Open { path, flags, to } => {
                let fd = open(path.as_c_str(), *flags, Mode::from_bits_truncate(0o644)).map_err(
                    |errno| ChildFailure {
                        label: path.as_bytes(),
                        errno,
                    },
                )?;
                if fd != *to {
                    let dup_result = dup2(fd, *to);
                    let _ = close(fd);
                    dup_result.map_err(|errno| ChildFailure {
                        label: b"dup2",
                        errno,
                    })?;
                }
            }
        }
        Ok(())
    }
}

fn write_stderr(bytes: &[u8]) {
    // SAFETY: plain write(2) on a borrowed buffer.
    unsafe {
        libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len());
    }
}

fn report(failure: &ChildFailure<'_>) {
    write_stderr(b"minish: ");
    write_stderr(failure.label);
    write_stderr(b": ");
    write_stderr(failure.errno.desc().as_bytes());
    write_stderr(b"\n");
}

fn run_child(program: &CString, argv: &[CString], env: &[CString], actions: &[ChildAction]) -> i32 {
    for action in actions {
        if let Err(failure) = action.apply() {
            report(&failure);
            return 1;
        }
    }

    match execve(program, argv, env) {
        Ok(never) => match never {},
        Err(errno) => {
            report(&ChildFailure {
                label: program.as_bytes(),
                errno,
            });
            1
        }
    }
}

impl Spawner for ForkSpawner {
    fn spawn(&mut self, request: &SpawnRequest) -> Result<ChildHandle, SpawnError> {
        let program = to_cstring(&request.program)?;
        let argv = request
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let env = request
            .env
            .iter()
            .map(|(key, value)| CString::new(format!("{}={}", key, value)))
            .collect::<Result<Vec<_>, _>>()?;
        let actions = request
            .fd_actions
            .iter()
            .map(ChildAction::prepare)
            .collect::<Result<Vec<_>, _>>()?;

        // SAFETY: the child only touches pre-built data, then execs or _exits.
        match unsafe { fork() }.map_err(SpawnError::Fork)? {
            ForkResult::Parent { child } => {
                debug!("spawned {} as pid {}", request.program.display(), child);
                Ok(ChildHandle(child.as_raw()))
            }
            ForkResult::Child => {
                let status = run_child(&program, &argv, &env, &actions);
                // SAFETY: skips the parent's atexit handlers and buffered output.
                unsafe { libc::_exit(status) }
            }
        }
    }

    fn wait(&mut self, child: ChildHandle) -> Result<i32, SpawnError> {
        loop {
            match waitpid(Pid::from_raw(child.0), None) {
                Ok(WaitStatus::Exited(_, code)) => return Ok(code),
                Ok(WaitStatus::Signaled(_, signal, _core_dumped)) => return Ok(128 + signal as i32),
                Ok(status) => debug!("pid {} reported {:?}", child.0, status),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(SpawnError::Wait(e)),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::utils::path::PathResolver;
    use std::fs;

    fn request(program: &str, args: &[&str]) -> SpawnRequest {
        SpawnRequest {
            program: PathResolver::from_env().resolve(program).unwrap(),
            argv: std::iter::once(program)
                .chain(args.iter().copied())
                .map(String::from)
                .collect(),
            env: Vec::new(),
            fd_actions: Vec::new(),
        }
    }

    #[test]
    fn test_exit_code() {
        let mut spawner = ForkSpawner;
        let child = spawner.spawn(&request("sh", &["-c", "exit 42"])).unwrap();
        assert_eq!(spawner.wait(child).unwrap(), 42);
    }

    #[test]
    fn test_signaled_status() {
        let mut spawner = ForkSpawner;
        let child = spawner.spawn(&request("sh", &["-c", "kill -9 $$"])).unwrap();
        assert_eq!(spawner.wait(child).unwrap(), 128 + 9);
    }

    #[test]
    fn test_open_actions() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let mut spawner = ForkSpawner;

        let mut req = request("printf", &["abc"]);
        req.fd_actions = vec![FdAction::Open(Redirection::new(
            RedirectKind::Output,
            out.display().to_string(),
        ))];
        let child = spawner.spawn(&req).unwrap();
        assert_eq!(spawner.wait(child).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "abc");
    }

    #[test]
    fn test_failed_redirect_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let mut spawner = ForkSpawner;

        let mut req = request("cat", &[]);
        req.fd_actions = vec![FdAction::Open(Redirection::new(
            RedirectKind::Input,
            missing.display().to_string(),
        ))];
        let child = spawner.spawn(&req).unwrap();
        assert_eq!(spawner.wait(child).unwrap(), 1);
    }

    #[test]
    fn test_exec_failure_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut spawner = ForkSpawner;
        let req = SpawnRequest {
            program: dir.path().join("nope"),
            argv: vec!["nope".to_string()],
            env: Vec::new(),
            fd_actions: Vec::new(),
        };
        let child = spawner.spawn(&req).unwrap();
        assert_eq!(spawner.wait(child).unwrap(), 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_dup_onto_itself_survives_exec() {
        use nix::unistd::pipe2;
        use std::io::Read;
        use std::os::unix::io::AsRawFd;

        let (reader, writer) = pipe2(OFlag::O_CLOEXEC).unwrap();
        let fd = writer.as_raw_fd();
        let mut spawner = ForkSpawner;

        let script = format!("printf kept >/proc/self/fd/{}", fd);
        let mut req = request("sh", &["-c", &script]);
        req.fd_actions = vec![FdAction::Dup { from: fd, to: fd }];
        let child = spawner.spawn(&req).unwrap();
        drop(writer);

        assert_eq!(spawner.wait(child).unwrap(), 0);
        let mut output = String::new();
        fs::File::from(reader).read_to_string(&mut output).unwrap();
        assert_eq!(output, "kept");
    }

    #[test]
    fn test_nul_byte_is_rejected() {
        let mut spawner = ForkSpawner;
        let req = request("printf", &["a\0b"]);
        assert!(matches!(spawner.spawn(&req), Err(SpawnError::InvalidArgument(_))));
    }
}
