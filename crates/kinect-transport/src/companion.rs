//! UDP link to the companion recorder.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use tracing::{debug, info, instrument, warn};

use crate::error::TransportError;
use crate::TransportResult;

/// Text commands understood by the companion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionCommand {
    /// Device connected.
    Init,
    /// Recording started.
    Start,
    /// Recording stopped.
    Stop,
    /// Device disconnected.
    Close,
}

impl CompanionCommand {
    /// Wire text of the command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for CompanionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unconnected UDP socket aimed at the companion.
#[derive(Debug)]
pub struct CompanionLink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl CompanionLink {
    /// Resolve `address` and bind an ephemeral local socket.
    #[instrument(name = "companion_open")]
    pub fn open(address: &str) -> TransportResult<Self> {
        let target = address
            .to_socket_addrs()
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", address, e)))?
            .next()
            .ok_or_else(|| TransportError::InvalidAddress(address.to_string()))?;

        let local: SocketAddr = if target.is_ipv4() {
            ([0u8; 4], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).map_err(TransportError::Bind)?;

        info!(%target, "Companion link ready");
        Ok(Self { socket, target })
    }

    /// Companion endpoint.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send one command datagram.
    pub fn send(&self, command: CompanionCommand) -> TransportResult<()> {
        self.socket
            .send_to(command.as_str().as_bytes(), self.target)
            .map_err(TransportError::Send)?;
        debug!(%command, target = %self.target, "Companion command sent");
        Ok(())
    }

    /// Send and log failures instead of returning them.
    pub fn notify(&self, command: CompanionCommand) {
        if let Err(e) = self.send(command) {
            warn!(%command, "Companion command not sent: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn receiver() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        socket
    }

    fn recv_text(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 64];
        let (len, _) = socket.recv_from(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..len]).into_owned()
    }

    #[test]
    fn test_commands_arrive_as_text() {
        let rx = receiver();
        let link = CompanionLink::open(&rx.local_addr().unwrap().to_string()).unwrap();

        for command in [
            CompanionCommand::Init,
            CompanionCommand::Start,
            CompanionCommand::Stop,
            CompanionCommand::Close,
        ] {
            link.send(command).unwrap();
            assert_eq!(recv_text(&rx), command.as_str());
        }
    }

    #[test]
    fn test_unresolvable_address_rejected() {
        let result = CompanionLink::open("not an address");
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }

    #[test]
    fn test_notify_without_listener_does_not_fail() {
        let rx = receiver();
        let addr = rx.local_addr().unwrap();
        drop(rx);

        let link = CompanionLink::open(&addr.to_string()).unwrap();
        link.notify(CompanionCommand::Init);
        assert_eq!(link.target(), addr);
    }
}
