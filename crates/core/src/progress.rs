//! Progress translation for engine commands.
//!
//! The engine reports fractional progress at arbitrary granularity and not
//! always in order. Callers see integer percentages that never go backwards,
//! never repeat, and finish with exactly one `100` when the command succeeds.
//! Nothing is forwarded once the command has failed.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

use crate::engine::{EngineError, EngineEvent, EngineLease};

/// Highest percentage forwarded while a command is still running.
const RUNNING_CEILING: f64 = 0.99;

/// One progress update for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Completion percentage, `0..=100`.
    pub percent: u8,
}

/// Listener for operation progress.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Converts raw engine fractions into de-duplicated percentages.
pub struct ProgressTranslator {
    callback: Option<ProgressCallback>,
    last: Option<u8>,
}

impl ProgressTranslator {
    /// Creates a translator forwarding to `callback`.
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            callback,
            last: None,
        }
    }

    /// Last percentage forwarded, if any.
    pub fn last(&self) -> Option<u8> {
        self.last
    }

    /// Feeds one raw fraction. Returns the percentage if it was forwarded.
    pub fn observe(&mut self, raw: f64) -> Option<u8> {
        let clamped = if raw.is_nan() {
            0.0
        } else {
            raw.clamp(0.0, RUNNING_CEILING)
        };
        let percent = (clamped * 100.0).round() as u8;
        self.forward(percent)
    }

    /// Emits the terminal `100`. Call once, after the command succeeded.
    pub fn complete(&mut self) {
        self.forward(100);
    }

    fn forward(&mut self, percent: u8) -> Option<u8> {
        if self.last.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last = Some(percent);
        trace!(percent, "Progress");
        if let Some(callback) = &self.callback {
            callback(ProgressEvent { percent });
        }
        Some(percent)
    }
}

/// Bounded buffer of the most recent engine log lines.
#[derive(Debug, Clone)]
pub struct LogTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogTail {
    /// Creates a buffer keeping at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends one line, evicting the oldest when full.
    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Whether any retained line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }

    /// Retained lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

/// Runs one engine command, translating its progress stream.
///
/// Log lines are collected into `log` whether or not the command succeeds.
/// On failure no further progress is forwarded, including events buffered
/// before the failure. The terminal `100` is left to the caller, which only
/// knows the operation succeeded once the output has been checked.
pub async fn exec_with_progress(
    lease: &EngineLease,
    args: &[String],
    translator: &mut ProgressTranslator,
    log: &mut LogTail,
) -> Result<(), EngineError> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let exec = lease.exec(args, tx);
    tokio::pin!(exec);

    let result = loop {
        tokio::select! {
            biased;
            Some(event) = rx.recv() => match event {
                EngineEvent::Progress(raw) => {
                    translator.observe(raw);
                }
                EngineEvent::Log(line) => log.push(line),
            },
            result = &mut exec => break result,
        }
    };

    let succeeded = result.is_ok();
    while let Ok(event) = rx.try_recv() {
        match event {
            EngineEvent::Progress(raw) if succeeded => {
                translator.observe(raw);
            }
            EngineEvent::Progress(_) => {}
            EngineEvent::Log(line) => log.push(line),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |event: ProgressEvent| {
            sink.lock().unwrap().push(event.percent);
        });
        (callback, seen)
    }

    #[test]
    fn test_clamps_and_deduplicates() {
        let (callback, seen) = recording();
        let mut translator = ProgressTranslator::new(Some(callback));

        for raw in [0.0, 0.001, 0.1, 0.1, 0.104, 0.5, 1.0, 1.7] {
            translator.observe(raw);
        }
        translator.complete();

        assert_eq!(*seen.lock().unwrap(), vec![0, 10, 50, 99, 100]);
    }

    #[test]
    fn test_out_of_order_values_are_suppressed() {
        let (callback, seen) = recording();
        let mut translator = ProgressTranslator::new(Some(callback));

        for raw in [0.3, 0.2, -0.5, 0.31, f64::NAN, 0.29, 0.6] {
            translator.observe(raw);
        }
        translator.complete();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, vec![30, 31, 60, 100]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);
    }

    #[test]
    fn test_running_values_never_reach_100() {
        let mut translator = ProgressTranslator::new(None);
        assert_eq!(translator.observe(1.0), Some(99));
        assert_eq!(translator.observe(5.0), None);
        translator.complete();
        assert_eq!(translator.last(), Some(100));
    }

    #[test]
    fn test_complete_emits_once() {
        let (callback, seen) = recording();
        let mut translator = ProgressTranslator::new(Some(callback));
        translator.complete();
        translator.complete();
        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }

    #[test]
    fn test_log_tail_keeps_latest() {
        let mut tail = LogTail::new(2);
        tail.push("a".to_string());
        tail.push("b".to_string());
        tail.push("c".to_string());
        assert_eq!(tail.lines(), vec!["b", "c"]);
        assert!(tail.contains("c"));
        assert!(!tail.contains("a"));

        let mut disabled = LogTail::new(0);
        disabled.push("x".to_string());
        assert!(disabled.lines().is_empty());
    }
}
