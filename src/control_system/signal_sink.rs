use crate::models::{Direction, DirectionSet};
use crate::shared_data::current_timestamp;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightColor {
    Red,
    Yellow,
    Green,
}

impl LightColor {
    fn short(self) -> char {
        match self {
            LightColor::Red => 'R',
            LightColor::Yellow => 'Y',
            LightColor::Green => 'G',
        }
    }
}

/// A command for the signal heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SignalCommand {
    /// `direction` shows `color`, every other direction shows red.
    Phase {
        direction: Direction,
        color: LightColor,
    },
    /// Every direction shows `color` (all-red clearance, yellow blink).
    All { color: LightColor },
}

/// Consumer of signal commands. Calls are fire-and-forget.
pub trait SignalSink: Send {
    fn apply(&mut self, command: SignalCommand);

    fn set_phase(&mut self, direction: Direction, color: LightColor) {
        self.apply(SignalCommand::Phase { direction, color });
    }

    fn set_all(&mut self, color: LightColor) {
        self.apply(SignalCommand::All { color });
    }

    /// Called once after the final all-red. Sinks that buffer must deliver
    /// everything before returning.
    fn close(&mut self) {}
}

/// Color shown by each signal head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalBoard {
    heads: Vec<(Direction, LightColor)>,
}

impl SignalBoard {
    /// All heads start red.
    pub fn new(directions: &DirectionSet) -> Self {
        Self {
            heads: directions.iter().map(|d| (d, LightColor::Red)).collect(),
        }
    }

    pub fn apply(&mut self, command: SignalCommand) {
        for (direction, color) in self.heads.iter_mut() {
            *color = match command {
                SignalCommand::Phase {
                    direction: active,
                    color: active_color,
                } if active == *direction => active_color,
                SignalCommand::Phase { .. } => LightColor::Red,
                SignalCommand::All { color: all } => all,
            };
        }
    }

    pub fn color_of(&self, direction: Direction) -> Option<LightColor> {
        self.heads
            .iter()
            .find(|(d, _)| *d == direction)
            .map(|(_, c)| *c)
    }

    pub fn is_all(&self, color: LightColor) -> bool {
        self.heads.iter().all(|(_, c)| *c == color)
    }

    /// At most one head is non-red, unless every head shows the same color.
    pub fn is_safe(&self) -> bool {
        let non_red = self
            .heads
            .iter()
            .filter(|(_, c)| *c != LightColor::Red)
            .count();
        non_red <= 1 || self.heads.windows(2).all(|w| w[0].1 == w[1].1)
    }
}

impl fmt::Display for SignalBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heads: Vec<String> = self
            .heads
            .iter()
            .map(|(d, c)| format!("{}:{}", d, c.short()))
            .collect();
        write!(f, "{}", heads.join(" "))
    }
}

/// Logs the board after each command.
pub struct LogSignalSink {
    board: SignalBoard,
}

impl LogSignalSink {
    pub fn new(directions: &DirectionSet) -> Self {
        Self {
            board: SignalBoard::new(directions),
        }
    }
}

impl SignalSink for LogSignalSink {
    fn apply(&mut self, command: SignalCommand) {
        self.board.apply(command);
        info!("Signals [{}]", self.board);
        if !self.board.is_safe() {
            error!("Conflicting signals after {:?}: [{}]", command, self.board);
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignalCommandRecord {
    pub timestamp: u64,
    /// `*` when the command targets every direction.
    pub direction: String,
    pub color: LightColor,
}

impl From<SignalCommand> for SignalCommandRecord {
    fn from(command: SignalCommand) -> Self {
        let (direction, color) = match command {
            SignalCommand::Phase { direction, color } => (direction.to_string(), color),
            SignalCommand::All { color } => ("*".to_string(), color),
        };
        Self {
            timestamp: current_timestamp(),
            direction,
            color,
        }
    }
}

/// Appends every command as a CSV row, e.g. for a bench signal recorder.
pub struct CsvSignalSink {
    writer: csv::Writer<File>,
}

impl CsvSignalSink {
    pub fn create(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file_exists = path.exists();
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);
        Ok(Self { writer })
    }

    fn write(&mut self, record: &SignalCommandRecord) -> Result<(), Box<dyn Error>> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl SignalSink for CsvSignalSink {
    fn apply(&mut self, command: SignalCommand) {
        if let Err(e) = self.write(&SignalCommandRecord::from(command)) {
            warn!("Error recording signal command {:?}: {}", command, e);
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCommand {
    pub at: Instant,
    pub command: SignalCommand,
    pub board: SignalBoard,
}

/// Keeps a timestamped history of every command, with the board it produced.
#[derive(Clone)]
pub struct RecordingSignalSink {
    board: SignalBoard,
    history: Arc<Mutex<Vec<RecordedCommand>>>,
    closed: Arc<AtomicBool>,
}

impl RecordingSignalSink {
    pub fn new(directions: &DirectionSet) -> Self {
        Self {
            board: SignalBoard::new(directions),
            history: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn history(&self) -> Vec<RecordedCommand> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SignalSink for RecordingSignalSink {
    fn apply(&mut self, command: SignalCommand) {
        self.board.apply(command);
        let entry = RecordedCommand {
            at: Instant::now(),
            command,
            board: self.board.clone(),
        };
        match self.history.lock() {
            Ok(mut history) => history.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
