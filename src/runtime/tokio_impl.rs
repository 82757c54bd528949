//! Tokio runtime implementation.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket as TokioUdpSocket;

use super::AsyncUdpSocket;

/// Tokio-based UDP socket.
#[derive(Debug)]
pub struct UdpSocket(TokioUdpSocket);

impl AsyncUdpSocket for UdpSocket {
    async fn bind(addr: SocketAddr) -> io::Result<Self> {
        TokioUdpSocket::bind(addr).await.map(UdpSocket)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.0.local_addr()
    }

    async fn send_to(&self, buf: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.0.send_to(buf, addr).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.0.recv_from(buf).await
    }
}

/// Handle to a spawned tokio task.
pub type JoinHandle<T> = tokio::task::JoinHandle<T>;

/// Sleep for the specified duration using tokio.
pub async fn sleep_impl(duration: Duration) {
    tokio::time::sleep(duration).await
}

/// Spawn a task using tokio.
///
/// Must be called from within a tokio runtime.
pub fn spawn<F, T>(future: F) -> JoinHandle<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(future)
}
