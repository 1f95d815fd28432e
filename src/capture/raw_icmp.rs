//! Raw ICMP socket implementation

use super::{Capture, RxInfo};
use crate::{Error, Result};
use std::net::Ipv4Addr;
use std::os::unix::io::{AsRawFd, RawFd};
use tokio::io::unix::AsyncFd;

/// Raw `AF_INET`/`IPPROTO_ICMP` socket.
///
/// The kernel builds the IPv4 header on send; received packets include it.
/// Opening one requires root or `CAP_NET_RAW`.
pub struct RawIcmpSocket {
    async_fd: AsyncFd<RawFd>,
}

impl RawIcmpSocket {
    pub fn open() -> Result<Self> {
        let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_RAW, libc::IPPROTO_ICMP) };

        if fd < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }

        // Set non-blocking
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
        let ret = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if flags < 0 || ret < 0 {
            let err = std::io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(Error::Io(err));
        }

        let async_fd = match AsyncFd::new(fd) {
            Ok(async_fd) => async_fd,
            Err(e) => {
                unsafe { libc::close(fd) };
                return Err(Error::Io(e));
            }
        };

        Ok(Self { async_fd })
    }

    /// Receive one IPv4 packet (async)
    pub async fn recv(&mut self, buf: &mut [u8]) -> Result<RxInfo> {
        loop {
            let mut guard = self.async_fd.readable_mut().await.map_err(Error::Io)?;

            match guard.try_io(|inner| {
                let fd = *inner.get_ref();
                let mut addr: libc::sockaddr_in = unsafe { std::mem::zeroed() };
                let mut addr_len = std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
                let n = unsafe {
                    libc::recvfrom(
                        fd,
                        buf.as_mut_ptr() as *mut _,
                        buf.len(),
                        0,
                        &mut addr as *mut _ as *mut libc::sockaddr,
                        &mut addr_len,
                    )
                };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok((n as usize, Ipv4Addr::from(u32::from_be(addr.sin_addr.s_addr))))
                }
            }) {
                Ok(Ok((len, source))) => return Ok(RxInfo { len, source }),
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_would_block) => continue,
            }
        }
    }

    /// Send an ICMP message (header + payload) to `dst` (async)
    pub async fn send_to(&mut self, buf: &[u8], dst: Ipv4Addr) -> Result<usize> {
        let addr = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: 0,
            sin_addr: libc::in_addr {
                s_addr: u32::from(dst).to_be(),
            },
            sin_zero: [0; 8],
        };

        loop {
            let mut guard = self.async_fd.writable_mut().await.map_err(Error::Io)?;

            match guard.try_io(|inner| {
                let fd = *inner.get_ref();
                let n = unsafe {
                    libc::sendto(
                        fd,
                        buf.as_ptr() as *const _,
                        buf.len(),
                        0,
                        &addr as *const _ as *const libc::sockaddr,
                        std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                    )
                };
                if n < 0 {
                    Err(std::io::Error::last_os_error())
                } else {
                    Ok(n as usize)
                }
            }) {
                Ok(Ok(len)) => return Ok(len),
                Ok(Err(e)) => return Err(Error::Io(e)),
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsRawFd for RawIcmpSocket {
    fn as_raw_fd(&self) -> RawFd {
        *self.async_fd.get_ref()
    }
}

impl Drop for RawIcmpSocket {
    fn drop(&mut self) {
        unsafe { libc::close(*self.async_fd.get_ref()) };
    }
}

impl Capture for RawIcmpSocket {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<RxInfo> {
        RawIcmpSocket::recv(self, buf).await
    }

    async fn send_to(&mut self, buf: &[u8], dst: Ipv4Addr) -> Result<usize> {
        RawIcmpSocket::send_to(self, buf, dst).await
    }
}
