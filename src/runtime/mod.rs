//! Async runtime abstractions.
//!
//! The bridge session needs tokio (reqwest runs on it), so this module is a thin
//! facade over tokio that keeps the socket, sleeping and spawning calls in one
//! place. It also provides [`Timer`], the single-shot cancel-and-restart timer
//! used for discovery timeouts and per-light write timeouts.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

mod tokio_impl;

pub use tokio_impl::*;

/// A boxed future type for runtime abstraction.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for async UDP socket operations.
pub trait AsyncUdpSocket: Send + Sync + Sized {
    /// Bind to the specified address.
    fn bind(addr: SocketAddr) -> impl Future<Output = io::Result<Self>> + Send;

    /// The local address this socket is bound to.
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Send data to a specific address.
    fn send_to(
        &self,
        buf: &[u8],
        addr: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send;

    /// Receive data and the source address.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;
}

/// Sleep for the specified duration.
pub async fn sleep(duration: Duration) {
    sleep_impl(duration).await
}

/// A single-shot timer that can be restarted and stopped any number of times.
///
/// Starting the timer aborts the previously armed task, so at most one
/// callback is pending per timer. Stopping a timer that already fired or was
/// already stopped is a no-op. Dropping the timer stops it.
#[derive(Debug, Default)]
pub struct Timer {
    task: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer: after `duration`, `on_fire` is polled to completion.
    ///
    /// The callback future may restart this same timer; that aborts the task
    /// the callback runs on, so the callback must not await anything after
    /// doing so.
    pub fn start<F>(&mut self, duration: Duration, on_fire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.stop();
        self.task = Some(spawn(async move {
            sleep(duration).await;
            on_fire.await;
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the timer is armed and has not fired yet.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = Timer::new();
        let counter = Arc::clone(&fired);
        timer.start(Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_active());

        sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_restart_cancels_previous() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = Timer::new();
        for _ in 0..3 {
            let counter = Arc::clone(&fired);
            timer.start(Duration::from_millis(100), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            sleep(Duration::from_millis(50)).await;
        }

        sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_stop_is_idempotent() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut timer = Timer::new();
        let counter = Arc::clone(&fired);
        timer.start(Duration::from_millis(100), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.stop();
        timer.stop();

        sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        timer.stop();
    }
}
