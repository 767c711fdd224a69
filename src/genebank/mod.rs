//! Scanning GenBank flat files for k-mers.
//!
//! Only the text between a line containing `ORIGIN` and the next line
//! containing `//` is sequence data. Inside such a block whitespace and
//! position numbers are ignored, and every overlapping window of `k`
//! consecutive `a/c/g/t` bases becomes one key.

use std::io::BufRead;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Result;
use crate::key::sequence::{base_code, mask};
use crate::key::Sequence;

const ORIGIN_MARKER: &[u8] = b"ORIGIN";
const END_MARKER: &[u8] = b"//";

/// Counters collected while scanning a bank file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Lines consumed.
    pub lines: u64,
    /// `ORIGIN` blocks entered.
    pub blocks: u64,
    /// `a/c/g/t` bases seen inside blocks.
    pub bases: u64,
    /// Other letters (such as `n`) that broke the window.
    pub breaks: u64,
    /// Keys emitted.
    pub kmers: u64,
}

/// Line-at-a-time k-mer extractor with a rolling 2-bit window.
#[derive(Debug, Clone)]
pub struct KmerExtractor {
    k: usize,
    in_sequence: bool,
    window: u64,
    filled: usize,
    stats: ScanStats,
}

impl KmerExtractor {
    /// Extractor for keys of `k` bases; `k` must be within `1..=31`.
    pub fn new(k: i64) -> Result<Self> {
        let k = Sequence::check_len(k)?;
        Ok(Self {
            k,
            in_sequence: false,
            window: 0,
            filled: 0,
            stats: ScanStats::default(),
        })
    }

    /// Key length in bases.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Counters so far.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Consumes one line, calling `emit` for every key that completes in it.
    pub fn push_line<F>(&mut self, line: &[u8], mut emit: F) -> Result<()>
    where
        F: FnMut(Sequence) -> Result<()>,
    {
        self.stats.lines += 1;
        if !self.in_sequence {
            if contains(line, ORIGIN_MARKER) {
                self.in_sequence = true;
                self.stats.blocks += 1;
                self.reset_window();
                debug!(line = self.stats.lines, "genebank.origin");
            }
            return Ok(());
        }
        if contains(line, END_MARKER) {
            self.in_sequence = false;
            self.reset_window();
            trace!(line = self.stats.lines, "genebank.block_end");
            return Ok(());
        }

        let window_mask = mask(self.k);
        for &byte in line {
            if byte.is_ascii_whitespace() || byte.is_ascii_digit() {
                continue;
            }
            match base_code(byte) {
                Some(code) => {
                    self.stats.bases += 1;
                    self.window = ((self.window << 2) | code) & window_mask;
                    self.filled = (self.filled + 1).min(self.k);
                    if self.filled == self.k {
                        self.stats.kmers += 1;
                        emit(Sequence::from_packed(self.window, self.k))?;
                    }
                }
                None => {
                    self.stats.breaks += 1;
                    self.reset_window();
                }
            }
        }
        Ok(())
    }

    /// Feeds every line of `reader` through [`push_line`](Self::push_line).
    pub fn scan<R, F>(&mut self, mut reader: R, mut emit: F) -> Result<ScanStats>
    where
        R: BufRead,
        F: FnMut(Sequence) -> Result<()>,
    {
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            self.push_line(&line, &mut emit)?;
        }
        Ok(self.stats)
    }

    fn reset_window(&mut self) {
        self.window = 0;
        self.filled = 0;
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Every k-mer of `reader`, in file order.
pub fn extract_kmers<R: BufRead>(reader: R, k: i64) -> Result<Vec<Sequence>> {
    let mut keys = Vec::new();
    KmerExtractor::new(k)?.scan(reader, |key| {
        keys.push(key);
        Ok(())
    })?;
    Ok(keys)
}

/// Non-blank, trimmed lines of a query file.
pub fn read_queries<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut queries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            queries.push(trimmed.to_string());
        }
    }
    Ok(queries)
}
