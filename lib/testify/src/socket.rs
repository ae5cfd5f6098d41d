use std::net::{Ipv4Addr, SocketAddr, TcpListener};

/// An address on localhost nobody listens on, connecting to it is refused.
pub fn next_addr() -> SocketAddr {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind to an unused local port");

    listener.local_addr().expect("local address of listener")
}
