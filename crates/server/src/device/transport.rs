//! Blocking SEQPACKET transport to the sensor control process
//!
//! The control process listens on a unix `SOCK_SEQPACKET` socket, so message
//! boundaries are supplied by the OS: one `recv` returns exactly one framed
//! packet and no re-framing logic is needed. All calls here block; the
//! transport lives on the dedicated device worker thread, never on the
//! async runtime.

use nix::errno::Errno;
use nix::sys::socket::{
    AddressFamily, MsgFlags, SockFlag, SockType, UnixAddr, connect, recv, send, setsockopt,
    sockopt::ReceiveTimeout, socket,
};
use nix::sys::time::TimeVal;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Receive timeout so the worker loop can poll for commands between packets
const RECV_TIMEOUT: TimeVal = TimeVal::new(0, 100_000);

pub struct Transport {
    fd: OwnedFd,
}

impl Transport {
    /// Connect to the control socket, polling for it to appear first
    ///
    /// The control process may come up after the bridge; the path is polled
    /// up to `attempts` times with `retry` between checks before dialing.
    /// A failed dial after the ceiling is `TransportUnavailable` and fatal.
    pub fn connect(path: &Path, attempts: u32, retry: Duration) -> common::Result<Transport> {
        for _ in 0..attempts {
            if path.exists() {
                break;
            }
            info!("Control socket does not exist yet, waiting");
            std::thread::sleep(retry);
        }

        let fd = socket(
            AddressFamily::Unix,
            SockType::SeqPacket,
            SockFlag::empty(),
            None,
        )
        .map_err(errno_to_io)?;

        let addr = UnixAddr::new(path).map_err(errno_to_io)?;
        connect(fd.as_raw_fd(), &addr).map_err(|e| {
            common::Error::Transport(format!(
                "Control socket {} not available: {}",
                path.display(),
                e
            ))
        })?;

        setsockopt(&fd, ReceiveTimeout, &RECV_TIMEOUT).map_err(errno_to_io)?;

        info!("Connected to control socket {}", path.display());
        Ok(Transport { fd })
    }

    /// Send one packet
    pub fn send(&self, packet: &[u8]) -> common::Result<()> {
        send(self.fd.as_raw_fd(), packet, MsgFlags::empty())
            .map_err(|e| common::Error::Transport(format!("Send failed: {}", e)))?;
        Ok(())
    }

    /// Receive one packet, or `None` on timeout
    ///
    /// A zero-byte read means the peer closed the channel; that and any
    /// socket error are `Disconnected`, which is fatal to the whole bridge.
    pub fn recv(&self, buf: &mut [u8]) -> common::Result<Option<usize>> {
        match recv(self.fd.as_raw_fd(), buf, MsgFlags::empty()) {
            Ok(0) => Err(common::Error::Transport(
                "Control channel closed by peer".to_string(),
            )),
            Ok(size) => Ok(Some(size)),
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => Ok(None),
            Err(e) => Err(common::Error::Transport(format!("Receive failed: {}", e))),
        }
    }
}

#[cfg(test)]
impl Transport {
    /// A connected SEQPACKET pair standing in for bridge and device ends
    pub(crate) fn test_pair() -> (Transport, Transport) {
        use nix::sys::socket::socketpair;

        let (a, b) = socketpair(
            AddressFamily::Unix,
            SockType::SeqPacket,
            None,
            SockFlag::empty(),
        )
        .unwrap();
        setsockopt(&a, ReceiveTimeout, &RECV_TIMEOUT).unwrap();
        setsockopt(&b, ReceiveTimeout, &RECV_TIMEOUT).unwrap();
        (Transport { fd: a }, Transport { fd: b })
    }
}

fn errno_to_io(e: Errno) -> common::Error {
    common::Error::Io(std::io::Error::from_raw_os_error(e as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_pair() -> (Transport, Transport) {
        Transport::test_pair()
    }

    #[test]
    fn test_message_boundaries_preserved() {
        let (bridge, device) = transport_pair();

        bridge.send(&[0x01]).unwrap();
        bridge.send(&[0x06, 0x04]).unwrap();

        let mut buf = [0u8; 1024];
        let n = device.recv(&mut buf).unwrap().unwrap();
        assert_eq!(&buf[..n], &[0x01]);
        let n = device.recv(&mut buf).unwrap().unwrap();
        assert_eq!(&buf[..n], &[0x06, 0x04]);
    }

    #[test]
    fn test_recv_times_out_without_data() {
        let (bridge, _device) = transport_pair();
        let mut buf = [0u8; 1024];
        assert!(matches!(bridge.recv(&mut buf), Ok(None)));
    }

    #[test]
    fn test_recv_errors_after_peer_close() {
        let (bridge, device) = transport_pair();
        drop(device);
        let mut buf = [0u8; 1024];
        assert!(matches!(
            bridge.recv(&mut buf),
            Err(common::Error::Transport(_))
        ));
    }

    #[test]
    fn test_connect_fails_for_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-socket");
        let result = Transport::connect(&path, 2, Duration::from_millis(1));
        assert!(result.is_err());
    }
}
