//! Loopback port allocation.

use std::net::{Ipv4Addr, TcpListener};

/// Reserve an ephemeral loopback port and release it for the child to bind.
///
/// Another process may grab the port in between; the health check then
/// fails and the load is reported as a construction failure.
pub fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}
