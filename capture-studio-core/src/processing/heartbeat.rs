//! Throttle-resistant frame clock.
//!
//! A dedicated thread owns the schedule and posts [`Tick`]s over a bounded
//! channel; the owner renders synchronously whenever it drains one. Control
//! is message based (start / stop / set-fps), mirroring a worker protocol.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::models::error::StudioError;

/// Ticks buffered before new ones are dropped. A slow consumer skips
/// frames rather than rendering a burst of stale ones.
const TICK_BACKLOG: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatCommand {
    Start,
    Stop,
    SetFps(u32),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub sequence: u64,
    pub at: Instant,
}

pub struct Heartbeat {
    commands: Sender<HeartbeatCommand>,
    ticks: Receiver<Tick>,
    running: Arc<AtomicBool>,
    fps: Arc<AtomicU32>,
    handle: Option<thread::JoinHandle<()>>,
}

fn period(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

impl Heartbeat {
    /// Spawn the clock thread, initially stopped.
    pub fn spawn(fps: u32) -> Result<Self, StudioError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (tick_tx, tick_rx) = mpsc::sync_channel(TICK_BACKLOG);
        let fps = Arc::new(AtomicU32::new(fps.max(1)));
        let initial = fps.load(Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("heartbeat".into())
            .spawn(move || run_clock(initial, command_rx, tick_tx))
            .map_err(|e| StudioError::InvalidState(format!("failed to spawn heartbeat thread: {}", e)))?;

        Ok(Self {
            commands: command_tx,
            ticks: tick_rx,
            running: Arc::new(AtomicBool::new(false)),
            fps,
            handle: Some(handle),
        })
    }

    pub fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            debug!("Heartbeat: start at {} fps", self.fps());
            self.send(HeartbeatCommand::Start);
        }
    }

    /// Stop ticking and discard ticks not yet consumed.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            debug!("Heartbeat: stop");
            self.send(HeartbeatCommand::Stop);
        }
        while self.ticks.try_recv().is_ok() {}
    }

    pub fn set_fps(&self, fps: u32) {
        let fps = fps.max(1);
        if self.fps.swap(fps, Ordering::SeqCst) != fps {
            self.send(HeartbeatCommand::SetFps(fps));
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Next pending tick, without blocking.
    pub fn try_tick(&self) -> Option<Tick> {
        self.ticks.try_recv().ok()
    }

    pub fn wait_tick(&self, timeout: Duration) -> Option<Tick> {
        self.ticks.recv_timeout(timeout).ok()
    }

    /// Consume every pending tick, returning how many there were.
    pub fn drain(&self) -> usize {
        let mut count = 0;
        while self.ticks.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    fn send(&self, command: HeartbeatCommand) {
        if self.commands.send(command).is_err() {
            warn!("Heartbeat: clock thread is gone, dropped {:?}", command);
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        let _ = self.commands.send(HeartbeatCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_clock(fps: u32, commands: Receiver<HeartbeatCommand>, ticks: SyncSender<Tick>) {
    let mut interval = period(fps);
    let mut active = false;
    let mut next = Instant::now();
    let mut sequence = 0u64;

    loop {
        let received = if active {
            commands.recv_timeout(next.saturating_duration_since(Instant::now()))
        } else {
            commands.recv().map_err(|_| RecvTimeoutError::Disconnected)
        };

        match received {
            Ok(HeartbeatCommand::Start) => {
                active = true;
                next = Instant::now() + interval;
            }
            Ok(HeartbeatCommand::Stop) => active = false,
            Ok(HeartbeatCommand::SetFps(fps)) => {
                interval = period(fps);
                next = Instant::now() + interval;
            }
            Ok(HeartbeatCommand::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                sequence += 1;
                match ticks.try_send(Tick {
                    sequence,
                    at: Instant::now(),
                }) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
                // Schedule from the previous deadline so the rate does not drift,
                // but never try to catch up on missed ticks.
                next += interval;
                let now = Instant::now();
                if next < now {
                    next = now + interval;
                }
            }
        }
    }
    debug!("Heartbeat: clock thread exiting after {} ticks", sequence);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_until_started() {
        let heartbeat = Heartbeat::spawn(200).unwrap();
        assert!(!heartbeat.is_running());
        assert!(heartbeat.wait_tick(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn ticks_in_sequence_while_running() {
        let heartbeat = Heartbeat::spawn(200).unwrap();
        heartbeat.start();
        assert!(heartbeat.is_running());
        let first = heartbeat.wait_tick(Duration::from_secs(2)).unwrap();
        let second = heartbeat.wait_tick(Duration::from_secs(2)).unwrap();
        assert!(second.sequence > first.sequence);
        assert!(second.at >= first.at);
    }

    #[test]
    fn stop_silences_the_clock() {
        let heartbeat = Heartbeat::spawn(200).unwrap();
        heartbeat.start();
        assert!(heartbeat.wait_tick(Duration::from_secs(2)).is_some());
        heartbeat.stop();
        thread::sleep(Duration::from_millis(30));
        heartbeat.drain();
        assert!(heartbeat.wait_tick(Duration::from_millis(60)).is_none());
        assert!(!heartbeat.is_running());
    }

    #[test]
    fn set_fps_is_clamped_and_recorded() {
        let heartbeat = Heartbeat::spawn(30).unwrap();
        heartbeat.set_fps(0);
        assert_eq!(heartbeat.fps(), 1);
        heartbeat.set_fps(60);
        assert_eq!(heartbeat.fps(), 60);
        heartbeat.start();
        assert!(heartbeat.wait_tick(Duration::from_secs(2)).is_some());
    }

    #[test]
    fn unconsumed_ticks_are_bounded() {
        let heartbeat = Heartbeat::spawn(500).unwrap();
        heartbeat.start();
        thread::sleep(Duration::from_millis(50));
        assert!(heartbeat.drain() <= TICK_BACKLOG);
    }
}
