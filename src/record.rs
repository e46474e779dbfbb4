//! In-process record type.
//!
//! The shared region stores fixed-width `StatSlot`s; inside each process the
//! record is this owned struct. Conversion happens exactly at the region
//! boundary, where the strings get truncated and pinned.

use crate::ipc::layout::{read_inline_str, write_inline_str, StatSlot};

/// One `(file, algorithm)` outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct SortStat {
    /// Input file name (no directory component).
    pub filename: String,
    /// Number of lines the file held.
    pub nlines: i32,
    /// Algorithm name (`bubble`, `merge`, ...).
    pub algorithm: String,
    /// Comparison-loop iterations performed by the sort.
    pub niterations: i32,
    /// Element swaps performed by the sort.
    pub nswaps: i32,
    /// Elapsed sort time in milliseconds.
    pub time_ms: f32,
}

impl SortStat {
    /// Render the record as a shared-memory slot.
    pub fn to_slot(&self) -> StatSlot {
        let mut slot = StatSlot::zeroed();
        write_inline_str(&mut slot.filename, &self.filename);
        write_inline_str(&mut slot.algorithm, &self.algorithm);
        slot.nlines = self.nlines;
        slot.niterations = self.niterations;
        slot.nswaps = self.nswaps;
        slot.time_ms = self.time_ms;
        slot
    }

    /// Read a record back out of a shared-memory slot.
    pub fn from_slot(slot: &StatSlot) -> Self {
        Self {
            filename: read_inline_str(&slot.filename),
            nlines: slot.nlines,
            algorithm: read_inline_str(&slot.algorithm),
            niterations: slot.niterations,
            nswaps: slot.nswaps,
            time_ms: slot.time_ms,
        }
    }

    /// Comma-separated row, time as integer milliseconds.
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{:.0}",
            self.filename, self.nlines, self.algorithm, self.niterations, self.nswaps,
            self.time_ms
        )
    }

    /// Table row for the statistics web page.
    pub fn html_row(&self) -> String {
        format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.0}</td></tr>",
            self.filename, self.nlines, self.algorithm, self.niterations, self.nswaps,
            self.time_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SortStat {
        SortStat {
            filename: "a.txt".into(),
            nlines: 3,
            algorithm: "quick".into(),
            niterations: 7,
            nswaps: 2,
            time_ms: 12.6,
        }
    }

    #[test]
    fn slot_round_trip() {
        let stat = sample();
        assert_eq!(SortStat::from_slot(&stat.to_slot()), stat);
    }

    #[test]
    fn slot_round_trip_is_byte_identical() {
        let stat = sample();
        let first = stat.to_slot();
        let second = SortStat::from_slot(&first).to_slot();
        assert_eq!(first.filename[..], second.filename[..]);
        assert_eq!(first.algorithm[..], second.algorithm[..]);
        assert_eq!(first.nlines, second.nlines);
        assert_eq!(first.time_ms, second.time_ms);
    }

    #[test]
    fn csv_row_rounds_time() {
        let stat = sample();
        assert_eq!(stat.csv_row(), "a.txt,3,quick,7,2,13");
    }

    #[test]
    fn html_row_has_six_cells() {
        let row = sample().html_row();
        assert_eq!(row.matches("<td>").count(), 6);
        assert!(row.starts_with("<tr>") && row.ends_with("</tr>"));
    }
}
