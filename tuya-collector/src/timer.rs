use std::time::{Duration, Instant};

use flume::{Receiver, Sender};

enum TimerConfig {
    SetPeriod(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum WaitResult {
    Exit,
    Continue,
}

/// Emits a tick right away and then once per period. The background thread
/// stops when the timer is dropped.
#[derive(Debug)]
pub struct Timer {
    config_tx: Sender<TimerConfig>,
    timer_rx: Receiver<()>,
}

struct TimerState {
    period: Duration,
    last_tick: Option<Instant>,
}

impl Timer {
    pub fn with_period(period: Duration) -> Self {
        let (config_tx, config_rx) = flume::unbounded();
        let (timer_tx, timer_rx) = flume::bounded(0);

        let _timer_thread = std::thread::spawn(move || {
            let mut timer = TimerState {
                period,
                last_tick: None,
            };
            while let WaitResult::Continue = timer.wait(&config_rx, &timer_tx) {}
            debug!("timer thread exiting");
        });

        Self {
            config_tx,
            timer_rx,
        }
    }

    /// The next tick is due one new period after the previous one. Never
    /// blocks, even while a tick is waiting to be received.
    pub fn set_period(&self, period: Duration) {
        let _ = self.config_tx.send(TimerConfig::SetPeriod(period));
    }

    pub fn timer_rx(&self) -> Receiver<()> {
        self.timer_rx.clone()
    }
}

impl TimerState {
    fn next_tick(&self) -> Instant {
        self.last_tick
            .map(|t| t + self.period)
            .unwrap_or_else(Instant::now)
    }

    fn wait(&mut self, config_rx: &Receiver<TimerConfig>, timer_tx: &Sender<()>) -> WaitResult {
        let wait_timeout = self.next_tick().saturating_duration_since(Instant::now());
        trace!("next poll in {:?}", wait_timeout);

        match config_rx.recv_timeout(wait_timeout) {
            Ok(TimerConfig::SetPeriod(period)) => {
                debug!("changing period to {:?}", period);
                self.period = period;
            }
            Err(flume::RecvTimeoutError::Timeout) => {
                self.last_tick = Some(Instant::now());
                if timer_tx.send(()).is_err() {
                    debug!("timer channel closed, exiting");
                    return WaitResult::Exit;
                }
            }
            Err(flume::RecvTimeoutError::Disconnected) => {
                debug!("config channel closed, exiting");
                return WaitResult::Exit;
            }
        }

        WaitResult::Continue
    }
}
