//! Text log sink (spec.md §6/§7): one formatted line per emitted
//! event plus a running tally, written to a log file that is
//! overwritten per run. With `verbose` set, every line is also echoed
//! to stdout — the teacher's own CLI only ever wrote to stdout, so
//! this keeps that path available rather than replacing it outright.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::event::OrderEvent;
use crate::kitchen::Tally;

pub struct Display {
    log: BufWriter<File>,
    verbose: bool,
}

impl Display {
    pub fn new(log_path: impl AsRef<Path>, verbose: bool) -> Result<Self> {
        let log_path = log_path.as_ref();
        let file = File::create(log_path)
            .with_context(|| format!("failed to create log file {}", log_path.display()))?;
        Ok(Self {
            log: BufWriter::new(file),
            verbose,
        })
    }

    pub fn record(&mut self, event: &OrderEvent) -> Result<()> {
        let line = format_event(event);
        writeln!(self.log, "{line}")?;
        if self.verbose {
            println!("{line}");
        }
        Ok(())
    }

    pub fn finish(&mut self, tally: Tally) -> Result<()> {
        let line = format_tally(tally);
        writeln!(self.log, "{line}")?;
        self.log.flush()?;
        if self.verbose {
            println!("{line}");
        }
        Ok(())
    }
}

fn format_event(event: &OrderEvent) -> String {
    let shelf = event.shelf_type.as_deref().unwrap_or("-");
    format!(
        "[{:.3}] {} order #{} ({}) on {}",
        event.date, event.event_type, event.order.id, event.order.name, shelf
    )
}

fn format_tally(tally: Tally) -> String {
    format!(
        "orders received: {}, picked up: {}, decayed: {}, removed: {}",
        tally.received, tally.picked_up, tally.decayed, tally.removed
    )
}
