use crate::error::IntakeError;
use crate::intake::Intake;
use log::warn;
use std::io::{self, BufRead, Write};

/// Why the console loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    Quit,
    EndOfInput,
}

/// Operator loop: reads `A,car` lines until `quit` or end of input.
///
/// Bad lines are reported on `output` and dropped; `status` prints the
/// controller snapshot.
pub fn run_console<R: BufRead, W: Write>(
    intake: &Intake,
    mut input: R,
    mut output: W,
) -> io::Result<ConsoleExit> {
    let mut raw = Vec::new();
    loop {
        write!(output, "Enter input (A,car): ")?;
        output.flush()?;

        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            return Ok(ConsoleExit::EndOfInput);
        }
        let entry = match std::str::from_utf8(&raw) {
            Ok(line) => line.trim().to_lowercase(),
            Err(_) => {
                let e = IntakeError::Malformed(String::from_utf8_lossy(&raw).trim().to_string());
                warn!("Rejected input: {}", e);
                writeln!(output, "[ERROR] {}", e)?;
                continue;
            }
        };
        match entry.as_str() {
            "" => continue,
            "quit" => return Ok(ConsoleExit::Quit),
            "status" => match intake.snapshot() {
                Ok(snapshot) => writeln!(output, "{}", snapshot)?,
                Err(e) => writeln!(output, "[ERROR] {}", e)?,
            },
            _ => match intake.submit_line(&entry) {
                Ok(arrival) => writeln!(
                    output,
                    "[QUEUED] {} at {}",
                    arrival.vehicle.token().to_uppercase(),
                    arrival.direction
                )?,
                Err(e) => {
                    warn!("Rejected input {:?}: {}", entry, e);
                    writeln!(output, "[ERROR] {}", e)?;
                }
            },
        }
    }
}
