use std::io::{self, BufRead};

use serde::Serialize;
use webextract_core::UsageAggregate;

use crate::parser::{LineOutcome, LineSkip, RecordExtractor};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineCounts {
    pub lines_read: u64,
    pub records_matched: u64,
    pub lines_unmatched: u64,
    pub lines_invalid: u64,
    pub lines_excluded: u64,
}

impl LineCounts {
    pub fn add(&mut self, other: LineCounts) {
        self.lines_read += other.lines_read;
        self.records_matched += other.records_matched;
        self.lines_unmatched += other.lines_unmatched;
        self.lines_invalid += other.lines_invalid;
        self.lines_excluded += other.lines_excluded;
    }

    fn record(&mut self, outcome: &LineOutcome) {
        self.lines_read += 1;
        match outcome {
            LineOutcome::Record(_) => self.records_matched += 1,
            LineOutcome::Skipped(LineSkip::Unmatched) => self.lines_unmatched += 1,
            LineOutcome::Skipped(LineSkip::NoTenant) => self.lines_excluded += 1,
            LineOutcome::Skipped(_) => self.lines_invalid += 1,
        }
    }
}

/// Folds every usable line of `reader` into `aggregate`.
pub fn aggregate_from_reader<R: BufRead>(
    mut reader: R,
    extractor: &RecordExtractor,
    interval_minutes: u32,
    aggregate: &mut UsageAggregate,
) -> io::Result<LineCounts> {
    let mut counts = LineCounts::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let outcome = extractor.classify(&line);
        counts.record(&outcome);
        if let LineOutcome::Record(record) = outcome {
            aggregate.add_record(&record, interval_minutes);
        }
    }
    Ok(counts)
}
