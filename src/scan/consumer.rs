use log::trace;

use crate::models::FoundBarcode;

/// Consumer verdict after each reported symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Keep scanning
    Continue,
    /// Halt the scan now
    Stop,
}

/// Receives symbols as soon as they are finalized
pub trait BarcodeConsumer {
    /// Called once per distinct symbol
    fn found(&mut self, barcode: &FoundBarcode) -> ScanControl;
}

impl BarcodeConsumer for Vec<FoundBarcode> {
    fn found(&mut self, barcode: &FoundBarcode) -> ScanControl {
        self.push(barcode.clone());
        ScanControl::Continue
    }
}

impl<F> BarcodeConsumer for F
where
    F: FnMut(&FoundBarcode) -> ScanControl,
{
    fn found(&mut self, barcode: &FoundBarcode) -> ScanControl {
        self(barcode)
    }
}

/// Deduplicating front of the caller's consumer, shared by every engine
/// and filter pass of one scan
pub struct ResultSink<'c> {
    consumer: &'c mut dyn BarcodeConsumer,
    reported: Vec<FoundBarcode>,
    max_count: usize,
    stopped: bool,
}

impl<'c> ResultSink<'c> {
    /// Forward at most `max_count` symbols to `consumer`
    pub fn new(consumer: &'c mut dyn BarcodeConsumer, max_count: usize) -> Self {
        Self {
            consumer,
            reported: Vec::new(),
            max_count,
            stopped: false,
        }
    }

    /// Report a finalized symbol. Duplicates of earlier reports are dropped.
    /// Returns `Stop` once the consumer asked to stop or `max_count` was hit.
    pub fn report(&mut self, barcode: FoundBarcode) -> ScanControl {
        if self.stopped {
            return ScanControl::Stop;
        }
        if self.reported.iter().any(|r| r.is_duplicate_of(&barcode)) {
            trace!("dropping duplicate {} {:?}", barcode.format.name(), barcode.value);
            return ScanControl::Continue;
        }
        let verdict = self.consumer.found(&barcode);
        self.reported.push(barcode);
        if verdict == ScanControl::Stop || self.reported.len() >= self.max_count {
            self.stopped = true;
            return ScanControl::Stop;
        }
        ScanControl::Continue
    }

    /// Symbols reported so far
    pub fn count(&self) -> usize {
        self.reported.len()
    }

    /// Room left before `max_count`
    pub fn remaining(&self) -> usize {
        self.max_count.saturating_sub(self.reported.len())
    }

    /// True once no more symbols will be accepted
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Symbols reported so far, in order
    pub fn reported(&self) -> &[FoundBarcode] {
        &self.reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BarcodeFormat, Rect};

    fn code(value: &str, left: i32) -> FoundBarcode {
        FoundBarcode::new(value.into(), vec![], Rect::new(left, 0, left + 10, 5), BarcodeFormat::Ean13)
    }

    #[test]
    fn test_sink_drops_duplicates() {
        let mut out: Vec<FoundBarcode> = Vec::new();
        let mut sink = ResultSink::new(&mut out, 10);
        sink.report(code("123", 0));
        sink.report(code("123", 5));
        sink.report(code("123", 50));
        assert_eq!(sink.count(), 2);
        drop(sink);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_closure_can_stop() {
        let mut seen = 0;
        let mut stop_after_one = |_: &FoundBarcode| {
            seen += 1;
            ScanControl::Stop
        };
        let mut sink = ResultSink::new(&mut stop_after_one, 10);
        assert_eq!(sink.report(code("1", 0)), ScanControl::Stop);
        assert!(sink.is_stopped());
        assert_eq!(sink.report(code("2", 40)), ScanControl::Stop);
        drop(sink);
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_max_count_stops() {
        let mut out: Vec<FoundBarcode> = Vec::new();
        let mut sink = ResultSink::new(&mut out, 1);
        assert_eq!(sink.report(code("1", 0)), ScanControl::Stop);
        assert_eq!(sink.remaining(), 0);
    }
}
