use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};

/// Default target used to force route resolution. Nothing is ever sent to it.
pub const DEFAULT_ROUTE_TARGET: &str = "1.1.1.1:80";

/// Determines the address this host would use for outbound traffic
pub trait NetworkIdentitySource: Send + Sync {
    fn outbound_ip(&self) -> io::Result<IpAddr>;
}

/// Resolves the outbound address by connecting a UDP socket to a routable
/// address and reading the local endpoint the OS picked for that route.
#[derive(Debug, Clone)]
pub struct UdpRouteResolver {
    target: SocketAddr,
}

impl UdpRouteResolver {
    pub fn new(target: SocketAddr) -> Self {
        Self { target }
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Default for UdpRouteResolver {
    fn default() -> Self {
        Self::new(SocketAddr::from(([1, 1, 1, 1], 80)))
    }
}

impl NetworkIdentitySource for UdpRouteResolver {
    fn outbound_ip(&self) -> io::Result<IpAddr> {
        let bind: SocketAddr = if self.target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        // Connecting a datagram socket only selects a route, no packet leaves the host.
        // The socket is dropped (closed) on return.
        let socket = UdpSocket::bind(bind)?;
        socket.connect(self.target)?;
        Ok(socket.local_addr()?.ip())
    }
}
