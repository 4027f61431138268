//! Windows socket implementation using Winsock2
//!
//! Winsock must be started once per process before the first socket call.
//! `init_network` does that behind a `Once` and registers `WSACleanup` to
//! run at process exit. Link-layer capture does not exist here.

use std::io;
use std::mem;
use std::net::Ipv4Addr;
use std::sync::OnceLock;
use std::time::Duration;

use dstream_core::{PlatformSocket, Recv, RecvBuffer, SocketKind};
use windows_sys::Win32::Networking::WinSock::{
    bind, closesocket, getsockname, recv, setsockopt, socket, WSACleanup, WSAGetLastError, WSAStartup,
    AF_INET, INVALID_SOCKET, IPPROTO_UDP, SOCKADDR, SOCKADDR_IN, SOCKET, SOCKET_ERROR, SOCK_DGRAM,
    SOL_SOCKET, SO_RCVBUF, SO_RCVTIMEO, WSADATA, WSAEINTR, WSAETIMEDOUT,
};

static WSA_STARTUP: OnceLock<Result<(), i32>> = OnceLock::new();

extern "C" fn wsa_cleanup() {
    unsafe { WSACleanup(); }
}

/// Start Winsock 2.2 once for the whole process.
pub fn init_network() -> io::Result<()> {
    let res = WSA_STARTUP.get_or_init(|| {
        let mut data: WSADATA = unsafe { mem::zeroed() };
        let rc = unsafe { WSAStartup(0x0202, &mut data) };
        if rc != 0 {
            return Err(rc);
        }
        unsafe { libc::atexit(wsa_cleanup); }
        Ok(())
    });
    match res {
        Ok(()) => Ok(()),
        Err(rc) => Err(io::Error::from_raw_os_error(*rc)),
    }
}

/// Exclusively owned Winsock handle, closed on drop.
#[derive(Debug)]
pub struct Socket {
    sock: SOCKET,
}

impl Socket {
    fn setsockopt<T>(&self, level: i32, name: i32, value: &T) -> io::Result<()> {
        let rc = unsafe {
            setsockopt(
                self.sock,
                level,
                name,
                value as *const T as *const u8,
                mem::size_of::<T>() as i32,
            )
        };
        if rc == SOCKET_ERROR {
            Err(Self::last_error())
        } else {
            Ok(())
        }
    }
}

impl PlatformSocket for Socket {
    fn open(kind: SocketKind) -> io::Result<Self> {
        if kind == SocketKind::Packet {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "raw sockets are not supported on Windows",
            ));
        }
        init_network()?;
        let sock = unsafe { socket(AF_INET as i32, SOCK_DGRAM as i32, IPPROTO_UDP as i32) };
        if sock == INVALID_SOCKET {
            return Err(Self::last_error());
        }
        Ok(Self { sock })
    }

    fn set_recv_buffer(&self, bytes: usize) -> io::Result<RecvBuffer> {
        let size = bytes.min(i32::MAX as usize) as i32;
        self.setsockopt(SOL_SOCKET as i32, SO_RCVBUF as i32, &size)?;
        Ok(RecvBuffer::Limited)
    }

    fn bind_ipv4(&self, addr: Ipv4Addr, port: u16) -> io::Result<()> {
        let mut sin: SOCKADDR_IN = unsafe { mem::zeroed() };
        sin.sin_family = AF_INET;
        sin.sin_port = port.to_be();
        sin.sin_addr.S_un.S_addr = u32::from(addr).to_be();

        let rc = unsafe {
            bind(
                self.sock,
                &sin as *const SOCKADDR_IN as *const SOCKADDR,
                mem::size_of::<SOCKADDR_IN>() as i32,
            )
        };
        if rc == SOCKET_ERROR {
            Err(Self::last_error())
        } else {
            Ok(())
        }
    }

    fn local_port(&self) -> io::Result<u16> {
        let mut sin: SOCKADDR_IN = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<SOCKADDR_IN>() as i32;
        let rc = unsafe {
            getsockname(self.sock, &mut sin as *mut SOCKADDR_IN as *mut SOCKADDR, &mut len)
        };
        if rc == SOCKET_ERROR {
            return Err(Self::last_error());
        }
        Ok(u16::from_be(sin.sin_port))
    }

    fn set_recv_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        // Winsock takes a DWORD of milliseconds; 0 disables the timeout
        let ms: u32 = timeout
            .map(|d| d.as_millis().min(u32::MAX as u128) as u32)
            .unwrap_or(0);
        self.setsockopt(SOL_SOCKET as i32, SO_RCVTIMEO as i32, &ms)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<Recv> {
        let len = buf.len().min(i32::MAX as usize) as i32;
        let n = unsafe { recv(self.sock, buf.as_mut_ptr(), len, 0) };
        if n != SOCKET_ERROR {
            return Ok(Recv::Data(n as usize));
        }
        let code = unsafe { WSAGetLastError() };
        if code == WSAETIMEDOUT {
            Ok(Recv::TimedOut)
        } else if code == WSAEINTR {
            Ok(Recv::Interrupted)
        } else {
            Err(io::Error::from_raw_os_error(code))
        }
    }

    fn last_error() -> io::Error {
        io::Error::from_raw_os_error(unsafe { WSAGetLastError() })
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if self.sock != INVALID_SOCKET {
            unsafe { closesocket(self.sock); }
            self.sock = INVALID_SOCKET;
        }
    }
}
