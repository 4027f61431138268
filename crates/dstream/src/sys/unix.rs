//! Unix socket implementation using libc

use std::io;
use std::mem;
use std::net::Ipv4Addr;
use std::os::unix::io::RawFd;
use std::time::Duration;

use dstream_core::{PlatformSocket, Recv, RecvBuffer, SocketKind};
use nix::errno::Errno;

/// The network stack needs no process-wide setup on unix.
pub fn init_network() -> io::Result<()> {
    Ok(())
}

/// Exclusively owned socket descriptor, closed on drop.
#[derive(Debug)]
pub struct Socket {
    fd: RawFd,
}

#[inline]
fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret == -1 {
        Err(Socket::last_error())
    } else {
        Ok(ret)
    }
}

/// Map a failed receive's errno onto the blocking-read contract
fn classify_recv_error(errno: Errno) -> io::Result<Recv> {
    match errno {
        Errno::EAGAIN => Ok(Recv::TimedOut),
        Errno::EINTR => Ok(Recv::Interrupted),
        e => Err(io::Error::from(e)),
    }
}

fn new_socket(domain: libc::c_int, ty: libc::c_int, protocol: libc::c_int) -> io::Result<RawFd> {
    #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
    let ty = ty | libc::SOCK_CLOEXEC;
    cvt(unsafe { libc::socket(domain, ty, protocol) })
}

impl Socket {
    /// Raw descriptor, still owned by `self`
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    fn setsockopt_raw(
        &self,
        level: libc::c_int,
        name: libc::c_int,
        value: *const libc::c_void,
        len: libc::socklen_t,
    ) -> io::Result<()> {
        cvt(unsafe { libc::setsockopt(self.fd, level, name, value, len) }).map(|_| ())
    }

    fn setsockopt<T>(&self, level: libc::c_int, name: libc::c_int, value: &T) -> io::Result<()> {
        self.setsockopt_raw(
            level,
            name,
            value as *const T as *const libc::c_void,
            mem::size_of::<T>() as libc::socklen_t,
        )
    }
}

impl PlatformSocket for Socket {
    fn open(kind: SocketKind) -> io::Result<Self> {
        let fd = match kind {
            SocketKind::Datagram => new_socket(libc::AF_INET, libc::SOCK_DGRAM, 0)?,
            #[cfg(target_os = "linux")]
            // Protocol 0 receives nothing until the link-layer bind names a
            // protocol, so no frame slips in before the filter is attached.
            SocketKind::Packet => new_socket(libc::AF_PACKET, libc::SOCK_RAW, 0)?,
            #[cfg(not(target_os = "linux"))]
            SocketKind::Packet => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "link-layer capture sockets are Linux only",
                ))
            }
        };
        Ok(Self { fd })
    }

    fn set_recv_buffer(&self, bytes: usize) -> io::Result<RecvBuffer> {
        let size = bytes.min(libc::c_int::MAX as usize) as libc::c_int;

        // SO_RCVBUFFORCE ignores net.core.rmem_max but needs CAP_NET_ADMIN
        #[cfg(target_os = "linux")]
        {
            if self.setsockopt(libc::SOL_SOCKET, libc::SO_RCVBUFFORCE, &size).is_ok() {
                return Ok(RecvBuffer::Forced);
            }
        }

        self.setsockopt(libc::SOL_SOCKET, libc::SO_RCVBUF, &size)?;
        Ok(RecvBuffer::Limited)
    }

    fn bind_ipv4(&self, addr: Ipv4Addr, port: u16) -> io::Result<()> {
        let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
        sin.sin_family = libc::AF_INET as libc::sa_family_t;
        sin.sin_port = port.to_be();
        sin.sin_addr = libc::in_addr {
            s_addr: u32::from(addr).to_be(),
        };
        #[cfg(any(
            target_os = "macos",
            target_os = "ios",
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        ))]
        {
            sin.sin_len = mem::size_of::<libc::sockaddr_in>() as u8;
        }

        cvt(unsafe {
            libc::bind(
                self.fd,
                &sin as *const libc::sockaddr_in as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        })
        .map(|_| ())
    }

    fn local_port(&self) -> io::Result<u16> {
        let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
        cvt(unsafe {
            libc::getsockname(
                self.fd,
                &mut sin as *mut libc::sockaddr_in as *mut libc::sockaddr,
                &mut len,
            )
        })?;
        Ok(u16::from_be(sin.sin_port))
    }

    fn set_recv_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        // A zero timeval means "no timeout"
        let tv = match timeout {
            Some(d) => libc::timeval {
                tv_sec: d.as_secs() as libc::time_t,
                tv_usec: d.subsec_micros() as libc::suseconds_t,
            },
            None => libc::timeval { tv_sec: 0, tv_usec: 0 },
        };
        self.setsockopt(libc::SOL_SOCKET, libc::SO_RCVTIMEO, &tv)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<Recv> {
        let n = unsafe { libc::recv(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
        if n >= 0 {
            Ok(Recv::Data(n as usize))
        } else {
            classify_recv_error(Errno::last())
        }
    }

    fn last_error() -> io::Error {
        io::Error::from(Errno::last())
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if self.fd >= 0 {
            unsafe { libc::close(self.fd); }
            self.fd = -1;
        }
    }
}

// ── Linux link-layer capture ──

#[cfg(target_os = "linux")]
nix::ioctl_readwrite_bad!(siocgifindex, libc::SIOCGIFINDEX, libc::ifreq);

#[cfg(target_os = "linux")]
impl Socket {
    /// Attach a classic BPF program (`SO_ATTACH_FILTER`)
    pub fn attach_filter(&self, program: &[libc::sock_filter]) -> io::Result<()> {
        let fprog = libc::sock_fprog {
            len: program.len() as libc::c_ushort,
            filter: program.as_ptr() as *mut libc::sock_filter,
        };
        self.setsockopt(libc::SOL_SOCKET, libc::SO_ATTACH_FILTER, &fprog)
    }

    /// Restrict the socket to one interface (`SO_BINDTODEVICE`)
    pub fn bind_to_device(&self, device: &str) -> io::Result<()> {
        self.setsockopt_raw(
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            device.as_ptr() as *const libc::c_void,
            device.len() as libc::socklen_t,
        )
    }

    /// Kernel-assigned interface index (`SIOCGIFINDEX`)
    pub fn interface_index(&self, device: &str) -> io::Result<libc::c_int> {
        let mut ifr: libc::ifreq = unsafe { mem::zeroed() };
        let name = device.as_bytes();
        if name.len() >= ifr.ifr_name.len() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "interface name too long"));
        }
        for (dst, &src) in ifr.ifr_name.iter_mut().zip(name) {
            *dst = src as libc::c_char;
        }

        unsafe { siocgifindex(self.fd, &mut ifr) }.map_err(io::Error::from)?;
        Ok(unsafe { ifr.ifr_ifru.ifru_ifindex })
    }

    /// Bind to interface `ifindex`, receiving every protocol (`ETH_P_ALL`)
    pub fn bind_link(&self, ifindex: libc::c_int) -> io::Result<()> {
        let mut sll: libc::sockaddr_ll = unsafe { mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as libc::c_ushort;
        sll.sll_protocol = (libc::ETH_P_ALL as u16).to_be();
        sll.sll_ifindex = ifindex;

        cvt(unsafe {
            libc::bind(
                self.fd,
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        })
        .map(|_| ())
    }

    /// Receive one frame along with its packet type (`PACKET_HOST`,
    /// `PACKET_OUTGOING`, ...). The type is only meaningful for `Recv::Data`.
    pub fn recv_link(&self, buf: &mut [u8]) -> io::Result<(Recv, u8)> {
        let mut sll: libc::sockaddr_ll = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
        let n = unsafe {
            libc::recvfrom(
                self.fd,
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
                0,
                &mut sll as *mut libc::sockaddr_ll as *mut libc::sockaddr,
                &mut len,
            )
        };
        if n >= 0 {
            Ok((Recv::Data(n as usize), sll.sll_pkttype))
        } else {
            classify_recv_error(Errno::last()).map(|r| (r, 0))
        }
    }
}
