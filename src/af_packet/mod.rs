//! AF_PACKET backend (Linux).

use std::cell::Cell;
use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;

use log::debug;
use nix::net::if_::if_nametoindex;

use crate::api::{Backend, Capabilities, Result};
use crate::errors::Error;
use crate::types::{Direction, LinkType, Timestamp, TimestampPrecision};

// linux/if_packet.h
const PACKET_OUTGOING: u8 = 4;

/// Raw packet socket bound to one interface.
#[derive(Debug)]
pub struct Sock {
    fd: RawFd,
    ifindex: i32,
    link_type: LinkType,
    direction: Direction,
    promisc: bool,
    // PACKET_STATISTICS resets on every read, so drops accumulate here
    dropped: Cell<u64>,
}

impl Sock {
    /// Opens an `AF_PACKET`/`SOCK_RAW` socket bound to `device`.
    ///
    /// `buffer_len` seeds `SO_RCVBUF`. Nanosecond receive timestamps are
    /// enabled up front; `set_timestamp_precision` switches them later.
    pub fn open(device: &str, buffer_len: usize) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (libc::ETH_P_ALL as u16).to_be() as i32,
            )
        };
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }

        match Self::init(fd, device, buffer_len) {
            Ok(sock) => Ok(sock),
            Err(err) => {
                unsafe { libc::close(fd) };
                Err(err)
            }
        }
    }

    fn init(fd: RawFd, device: &str, buffer_len: usize) -> Result<Self> {
        let ifindex = if_nametoindex(device)
            .map_err(|errno| Error::from(io::Error::from(errno)))? as i32;

        let sockaddr = libc::sockaddr_ll {
            sll_family: libc::AF_PACKET as u16,
            sll_protocol: (libc::ETH_P_ALL as u16).to_be(),
            sll_ifindex: ifindex,
            sll_hatype: 0,
            sll_pkttype: 0,
            sll_halen: 0,
            sll_addr: [0; 8],
        };
        let ret = unsafe {
            libc::bind(
                fd,
                &sockaddr as *const _ as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error().into());
        }

        if buffer_len > 0 {
            setsockopt_int(fd, libc::SOL_SOCKET, libc::SO_RCVBUF, buffer_len as i32)?;
        }
        setsockopt_int(fd, libc::SOL_SOCKET, libc::SO_TIMESTAMPNS, 1)?;

        debug!("af_packet: bound to {device} (ifindex {ifindex})");
        Ok(Self {
            fd,
            ifindex,
            link_type: LinkType::ETHERNET,
            direction: Direction::InOut,
            promisc: false,
            dropped: Cell::new(0),
        })
    }

    fn wanted(&self, pkttype: u8) -> bool {
        match self.direction {
            Direction::InOut => true,
            Direction::In => pkttype != PACKET_OUTGOING,
            Direction::Out => pkttype == PACKET_OUTGOING,
        }
    }

    fn timestamp(msg: &libc::msghdr) -> Timestamp {
        let mut cmsg = unsafe { libc::CMSG_FIRSTHDR(msg) };
        while !cmsg.is_null() {
            let hdr = unsafe { &*cmsg };
            if hdr.cmsg_level == libc::SOL_SOCKET {
                if hdr.cmsg_type == libc::SCM_TIMESTAMPNS {
                    let ts: libc::timespec =
                        unsafe { ptr::read_unaligned(libc::CMSG_DATA(cmsg) as *const _) };
                    return Timestamp {
                        secs: ts.tv_sec as i64,
                        nanos: ts.tv_nsec as u32,
                        precision: TimestampPrecision::Nano,
                    };
                }
                if hdr.cmsg_type == libc::SCM_TIMESTAMP {
                    let tv: libc::timeval =
                        unsafe { ptr::read_unaligned(libc::CMSG_DATA(cmsg) as *const _) };
                    return Timestamp {
                        secs: tv.tv_sec as i64,
                        nanos: tv.tv_usec as u32 * 1000,
                        precision: TimestampPrecision::Micro,
                    };
                }
            }
            cmsg = unsafe { libc::CMSG_NXTHDR(msg, cmsg) };
        }

        // frame arrived without a stamp; fall back to the wall clock
        let mut now = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut now) };
        Timestamp {
            secs: now.tv_sec as i64,
            nanos: now.tv_nsec as u32,
            precision: TimestampPrecision::Nano,
        }
    }

    fn set_membership(&self, enable: bool) -> Result<()> {
        let mreq = libc::packet_mreq {
            mr_ifindex: self.ifindex,
            mr_type: libc::PACKET_MR_PROMISC as u16,
            mr_alen: 0,
            mr_address: [0; 8],
        };
        let optname = if enable {
            libc::PACKET_ADD_MEMBERSHIP
        } else {
            libc::PACKET_DROP_MEMBERSHIP
        };
        let ret = unsafe {
            libc::setsockopt(
                self.fd,
                libc::SOL_PACKET,
                optname,
                &mreq as *const _ as *const libc::c_void,
                mem::size_of::<libc::packet_mreq>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }
}

impl Backend for Sock {
    fn recv(&mut self, buf: &mut [u8]) -> Result<(usize, Timestamp)> {
        loop {
            let mut addr: libc::sockaddr_ll = unsafe { mem::zeroed() };
            let mut iov = libc::iovec {
                iov_base: buf.as_mut_ptr() as *mut libc::c_void,
                iov_len: buf.len(),
            };
            // u64-backed so the control buffer is aligned for cmsghdr
            let mut cmsg_space = [0u64; 8];
            let mut msg: libc::msghdr = unsafe { mem::zeroed() };
            msg.msg_name = &mut addr as *mut _ as *mut libc::c_void;
            msg.msg_namelen = mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t;
            msg.msg_iov = &mut iov;
            msg.msg_iovlen = 1;
            msg.msg_control = cmsg_space.as_mut_ptr() as *mut libc::c_void;
            msg.msg_controllen = mem::size_of_val(&cmsg_space) as _;

            let n = unsafe { libc::recvmsg(self.fd, &mut msg, 0) };
            if n < 0 {
                return Err(io::Error::last_os_error().into());
            }
            // direction filtering happens here: the kernel tags each frame
            // with its pkttype and we skip the ones the filter excludes
            if !self.wanted(addr.sll_pkttype) {
                continue;
            }
            return Ok((n as usize, Self::timestamp(&msg)));
        }
    }

    fn send(&mut self, buf: &[u8]) -> Result<usize> {
        let n = unsafe { libc::send(self.fd, buf.as_ptr() as *const libc::c_void, buf.len(), 0) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EMSGSIZE) {
                return Err(Error::TooBigPacket(buf.len()));
            }
            return Err(err.into());
        }
        Ok(n as usize)
    }

    fn link_type(&self) -> LinkType {
        self.link_type
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    fn finalize(&mut self) {
        if self.promisc {
            let _ = self.set_membership(false);
        }
        unsafe { libc::close(self.fd) };
    }

    fn set_direction(&mut self, direction: Direction) -> Result<()> {
        self.direction = direction;
        Ok(())
    }

    fn set_nonblocking(&mut self, nonblock: bool) -> Result<()> {
        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error().into());
        }
        let flags = if nonblock {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        if unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags) } < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    fn set_promiscuous(&mut self, promisc: bool) -> Result<()> {
        if promisc == self.promisc {
            return Ok(());
        }
        self.set_membership(promisc)?;
        self.promisc = promisc;
        Ok(())
    }

    fn set_timestamp_precision(&mut self, precision: TimestampPrecision) -> Result<()> {
        let (on, off) = match precision {
            TimestampPrecision::Nano => (libc::SO_TIMESTAMPNS, libc::SO_TIMESTAMP),
            TimestampPrecision::Micro => (libc::SO_TIMESTAMP, libc::SO_TIMESTAMPNS),
        };
        setsockopt_int(self.fd, libc::SOL_SOCKET, off, 0)?;
        setsockopt_int(self.fd, libc::SOL_SOCKET, on, 1)?;
        Ok(())
    }

    fn dropped(&self) -> u64 {
        let mut stats: libc::tpacket_stats = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<libc::tpacket_stats>() as libc::socklen_t;
        let ret = unsafe {
            libc::getsockopt(
                self.fd,
                libc::SOL_PACKET,
                libc::PACKET_STATISTICS,
                &mut stats as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };
        if ret == 0 {
            self.dropped.set(self.dropped.get() + stats.tp_drops as u64);
        }
        self.dropped.get()
    }
}

fn setsockopt_int(fd: RawFd, level: i32, optname: i32, value: i32) -> Result<()> {
    let ret = unsafe {
        libc::setsockopt(
            fd,
            level,
            optname,
            &value as *const _ as *const libc::c_void,
            mem::size_of::<i32>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Socket;

    #[test]
    fn open_unknown_device_fails() {
        // unprivileged runs fail at socket() with EPERM, privileged ones
        // at ifindex resolution with ENODEV
        let err = Sock::open("does-not-exist0", 65536).unwrap_err();
        assert!(
            matches!(err, Error::NoSuchDevice | Error::PermissionDenied),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    #[ignore = "requires CAP_NET_RAW"]
    fn loopback_roundtrip() {
        let mut socket = Socket::open("lo", 65536).unwrap();
        assert_eq!(socket.link_type(), LinkType::ETHERNET);
        socket.set_nonblocking(true).unwrap();

        // minimal ethernet frame to the loopback device
        let mut frame = [0u8; 60];
        frame[12] = 0x08; // ethertype, arbitrary
        socket.send(&frame).unwrap();

        let mut buf = [0u8; 2048];
        loop {
            match socket.recv(&mut buf) {
                Ok((len, ts)) => {
                    assert!(len >= 14);
                    assert!(ts.secs > 0);
                    break;
                }
                Err(Error::NoPacket) | Err(Error::Interrupted) => continue,
                Err(other) => panic!("recv failed: {other:?}"),
            }
        }
        assert!(socket.stats().tx_packets >= 1);
    }
}
