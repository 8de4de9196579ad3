//! Thin wrappers around the epoll syscalls.
//!
//! Every fd of interest carries its own number in the event payload, so the
//! event loops dispatch on `event.u64` directly.

use std::io;
use std::os::fd::RawFd;

/// Create an epoll instance.
pub fn create() -> io::Result<RawFd> {
    let fd = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(fd)
}

fn ctl(epoll_fd: RawFd, op: libc::c_int, fd: RawFd, events: u32) -> io::Result<()> {
    let mut ev = libc::epoll_event {
        events,
        u64: fd as u64,
    };
    let ret = unsafe { libc::epoll_ctl(epoll_fd, op, fd, &mut ev) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Register `fd` with the given interest mask.
pub fn add(epoll_fd: RawFd, fd: RawFd, events: u32) -> io::Result<()> {
    ctl(epoll_fd, libc::EPOLL_CTL_ADD, fd, events)
}

/// Replace the interest mask for `fd`. With edge-triggered interest this
/// also re-edges readiness that is still pending.
pub fn modify(epoll_fd: RawFd, fd: RawFd, events: u32) -> io::Result<()> {
    ctl(epoll_fd, libc::EPOLL_CTL_MOD, fd, events)
}

/// Remove `fd` from the epoll set.
pub fn del(epoll_fd: RawFd, fd: RawFd) -> io::Result<()> {
    let ret = unsafe { libc::epoll_ctl(epoll_fd, libc::EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Wait for events, retrying on EINTR. Returns the number of events filled
/// into `events`.
pub fn wait(
    epoll_fd: RawFd,
    events: &mut [libc::epoll_event],
    timeout_ms: i32,
) -> io::Result<usize> {
    loop {
        let n = unsafe {
            libc::epoll_wait(
                epoll_fd,
                events.as_mut_ptr(),
                events.len() as libc::c_int,
                timeout_ms,
            )
        };
        if n >= 0 {
            return Ok(n as usize);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
