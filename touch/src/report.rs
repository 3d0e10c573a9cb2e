//! Rate limited, human readable status lines
//!
//! A line looks like
//!
//! ```text
//! Add: 0x5A ->  |  Port 0: Touch  Val: 600.00  Thr: 620.00  Raw: 600  |  Port 1: Release ...
//! ```

use core::fmt::{self, Write};

use crate::engine::TouchEngine;
use crate::SampleSource;

pub struct StatusReporter<'a> {
    pub interval_ms: u32,
    last_ms: u32,
    labels: &'a [&'a str],
}

impl<'a> StatusReporter<'a> {
    /// `now_ms` starts the first interval; nothing is printed until it has elapsed.
    pub fn new(interval_ms: u32, now_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: now_ms,
            labels: &[],
        }
    }

    /// Name channels in active order instead of by port number
    pub fn with_labels(mut self, labels: &'a [&'a str]) -> Self {
        self.labels = labels;
        self
    }

    /// Write a status line if at least `interval_ms` passed since the previous one
    ///
    /// Returns true if a line was written
    pub fn report<S, W>(&mut self, now_ms: u32, engine: &TouchEngine<S>, out: &mut W) -> Result<bool, fmt::Error>
    where
        S: SampleSource,
        W: Write,
    {
        // Millisecond counters wrap after ~49 days
        if now_ms.wrapping_sub(self.last_ms) < self.interval_ms {
            return Ok(false);
        }
        self.last_ms = now_ms;

        write_status(engine, self.labels, out)?;
        Ok(true)
    }
}

/// Write one status line covering every active channel of `engine`
pub fn write_status<S, W>(engine: &TouchEngine<S>, labels: &[&str], out: &mut W) -> fmt::Result
where
    S: SampleSource,
    W: Write,
{
    write!(out, "Add: 0x{:X} ->", engine.device_id())?;

    for (n, (i, c)) in engine.active_channels().enumerate() {
        out.write_str("  |  ")?;
        if labels.is_empty() {
            write!(out, "Port {}", i)?;
        } else if let Some(label) = labels.get(n) {
            out.write_str(label)?;
        }

        write!(
            out,
            ": {}  Val: {:.2}  Thr: {:.2}  Raw: {}",
            if c.touched() { "Touch" } else { "Release" },
            c.value,
            c.threshold,
            c.raw
        )?;
    }

    out.write_str("\r\n")
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::FnSource;
    use std::string::String;

    fn engine(mask: u16) -> TouchEngine<FnSource<impl FnMut(u8) -> u16>> {
        TouchEngine::new(FnSource(|ch: u8| 650 + ch as u16), 0x5a, mask)
    }

    #[test]
    pub fn test_line_with_port_numbers() {
        let e = engine(0b101);
        let mut s = String::new();
        write_status(&e, &[], &mut s).unwrap();
        assert_eq!(
            s,
            "Add: 0x5A ->  |  Port 0: Release  Val: 650.00  Thr: 620.00  Raw: 650  \
             |  Port 2: Release  Val: 652.00  Thr: 622.00  Raw: 652\r\n"
        );
    }

    #[test]
    pub fn test_labels_follow_active_order() {
        let e = engine(0b1010);
        let mut s = String::new();
        write_status(&e, &["Play", "Stop"], &mut s).unwrap();
        assert!(s.contains("|  Play: Release  Val: 651.00"));
        assert!(s.contains("|  Stop: Release  Val: 653.00"));
        assert!(!s.contains("Port"));
    }

    #[test]
    pub fn test_missing_labels_are_blank() {
        let e = engine(0b111);
        let mut s = String::new();
        write_status(&e, &["A"], &mut s).unwrap();
        assert!(s.contains("|  A: Release"));
        assert_eq!(s.matches("|  : Release").count(), 2);
    }

    #[test]
    pub fn test_rate_limit() {
        let e = engine(0b1);
        let mut r = StatusReporter::new(500, 1000);
        let mut s = String::new();

        assert_eq!(r.report(1000, &e, &mut s), Ok(false));
        assert_eq!(r.report(1499, &e, &mut s), Ok(false));
        assert!(s.is_empty());

        assert_eq!(r.report(1500, &e, &mut s), Ok(true));
        assert_eq!(s.matches("\r\n").count(), 1);

        assert_eq!(r.report(1800, &e, &mut s), Ok(false));
        assert_eq!(r.report(2000, &e, &mut s), Ok(true));
        assert_eq!(s.matches("\r\n").count(), 2);
    }

    #[test]
    pub fn test_rate_limit_across_wrap() {
        let e = engine(0b1);
        let mut r = StatusReporter::new(100, u32::MAX - 49).with_labels(&["Key"]);
        let mut s = String::new();

        assert_eq!(r.report(49, &e, &mut s), Ok(false));
        assert_eq!(r.report(50, &e, &mut s), Ok(true));
        assert!(s.starts_with("Add: 0x5A ->  |  Key: Release"));
    }
}
