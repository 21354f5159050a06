//! Line-oriented driver: records in, top entries out.

use crate::chained_map::TableStats;
use crate::counter::{CounterStats, TopNCounter, Watermarks};
use crate::error::Error;
use crate::hash::SuperFastHash;
use crate::record::parse_record;
use std::io::{BufRead, Write};
use tracing::{debug, trace};

/// Settings for one [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub watermarks: Watermarks,
    /// Bucket count; `None` means [`Watermarks::default_modulus`].
    pub modulus: Option<usize>,
}

/// What a finished run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: CounterStats,
    /// Table shape at end of input, before output.
    pub table: TableStats,
    pub emitted: usize,
}

/// Count every record in `input`, then write the top entries to `out`.
///
/// The first malformed line stops the run with [`Error::Record`]; nothing
/// is written to `out` in that case.
pub fn run<R, W>(mut input: R, out: &mut W, config: RunConfig) -> Result<RunSummary, Error>
where
    R: BufRead,
    W: Write,
{
    let watermarks = config.watermarks;
    let modulus = config
        .modulus
        .unwrap_or_else(|| watermarks.default_modulus());
    let mut counter: TopNCounter<Vec<u8>> =
        TopNCounter::with_hasher(watermarks, modulus, SuperFastHash)?;
    debug!(
        modulus = counter.map().modulus(),
        low = counter.watermarks().low(),
        high = counter.watermarks().high(),
        "counting"
    );

    let mut line = Vec::with_capacity(512);
    let mut line_no: u64 = 0;
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        line_no += 1;
        let record = parse_record(&line).map_err(|source| Error::Record {
            line: line_no,
            source,
        })?;
        counter.add(record.key, record.count);
    }
    trace!(lines = line_no, "end of input");

    let table = counter.analyze();
    let emitted = counter.emit(out)?;
    out.flush()?;
    Ok(RunSummary {
        stats: *counter.stats(),
        table,
        emitted,
    })
}
