//! Connections zone transfers are streamed over.
//!
//! A zone transfer takes over the connection its query arrived on: once the
//! last response has been written, no further queries are accepted and the
//! connection is closed ([RFC 5936, section 4.1]). The [`ConnectionGuard`]
//! defined here makes sure this happens on every path out of a transfer
//! session, including early returns and panics.
//!
//! [RFC 5936, section 4.1]: https://www.rfc-editor.org/rfc/rfc5936#section-4.1

use std::net::SocketAddr;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

//------------ XfrConnection -------------------------------------------------

/// A connection responses to a zone transfer can be written to.
///
/// This is implemented for every type that can be written to
/// asynchronously and moved into a Tokio task, such as
/// [`tokio::net::TcpStream`] or its write half.
pub trait XfrConnection: AsyncWrite + Send + Unpin + 'static {}

impl<T: AsyncWrite + Send + Unpin + 'static> XfrConnection for T {}

//------------ ConnectionGuard -----------------------------------------------

/// Closes a connection when a transfer session ends.
///
/// The guard owns the connection for the duration of a session. While the
/// responses are streamed, the connection is lent out to the delivery task
/// via [`take`][Self::take] and handed back via [`restore`][Self::restore].
///
/// Calling [`close`][Self::close] shuts the connection down gracefully.
/// If the guard is dropped without that having happened, the connection is
/// dropped with it which closes it without flushing.
pub struct ConnectionGuard<C: XfrConnection> {
    /// The connection if it is currently held by the guard.
    conn: Option<C>,

    /// The address of the client at the other end.
    addr: SocketAddr,
}

impl<C: XfrConnection> ConnectionGuard<C> {
    /// Creates a new guard for a connection to the given client.
    pub fn new(conn: C, addr: SocketAddr) -> Self {
        Self {
            conn: Some(conn),
            addr,
        }
    }

    /// Returns a mutable reference to the connection if it is held.
    pub fn get_mut(&mut self) -> Option<&mut C> {
        self.conn.as_mut()
    }

    /// Takes the connection out of the guard.
    ///
    /// Returns `None` if the connection has already been taken.
    pub fn take(&mut self) -> Option<C> {
        self.conn.take()
    }

    /// Hands the connection back to the guard.
    pub fn restore(&mut self, conn: C) {
        self.conn = Some(conn);
    }

    /// Shuts the connection down and releases it.
    ///
    /// If the connection is not held by the guard, i.e., it was taken and
    /// never restored, it has already been released by whoever held it last
    /// and there is nothing left to do.
    pub async fn close(mut self) {
        match self.conn.take() {
            Some(mut conn) => {
                if let Err(err) = conn.shutdown().await {
                    debug!(
                        "Error shutting down connection to {}: {err}",
                        self.addr
                    );
                }
                trace!("Closed connection to {}", self.addr);
            }
            None => {
                trace!("Connection to {} already released", self.addr);
            }
        }
    }
}

//--- Drop

impl<C: XfrConnection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        if self.conn.take().is_some() {
            debug!("Dropping connection to {} without shutdown", self.addr);
        }
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn addr() -> SocketAddr {
        "192.0.2.1:53".parse().unwrap()
    }

    #[tokio::test]
    async fn close_shuts_down() {
        let (mut client, server) = tokio::io::duplex(64);
        let guard = ConnectionGuard::new(server, addr());
        guard.close().await;
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn drop_releases() {
        let (mut client, server) = tokio::io::duplex(64);
        {
            let _guard = ConnectionGuard::new(server, addr());
        }
        let mut buf = [0u8; 1];
        assert_eq!(client.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn take_and_restore() {
        let (_client, server) = tokio::io::duplex(64);
        let mut guard = ConnectionGuard::new(server, addr());
        let conn = guard.take().unwrap();
        assert!(guard.take().is_none());
        assert!(guard.get_mut().is_none());
        guard.restore(conn);
        assert!(guard.get_mut().is_some());
        guard.close().await;
    }
}
