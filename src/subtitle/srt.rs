// SubRip codec
use super::TimedSpan;
use crate::error::{RedubError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

static TIMING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})",
    )
    .expect("Invalid regex")
});

/// Parse SubRip text strictly.
///
/// Every blank-line separated block must be an index line, a timing line and
/// at least one text line.
pub fn parse_srt(content: &str) -> Result<Vec<TimedSpan>> {
    let mut spans = Vec::new();

    for (block_no, block) in blocks(content).into_iter().enumerate() {
        let index_line = block[0].trim();
        let index: usize = index_line.parse().map_err(|_| {
            RedubError::Parse(format!(
                "block {}: expected index line, found {:?}",
                block_no + 1,
                index_line
            ))
        })?;

        let timing_line = block.get(1).map(|l| l.trim()).unwrap_or("");
        let (start, end) = parse_timing(timing_line).ok_or_else(|| {
            RedubError::Parse(format!(
                "entry {}: expected timing line, found {:?}",
                index, timing_line
            ))
        })?;

        if (2..block.len()).any(|i| is_entry_start(&block, i)) {
            return Err(RedubError::Parse(format!(
                "entry {}: runs into the next entry",
                index
            )));
        }

        let text = block[2.min(block.len())..]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            return Err(RedubError::Parse(format!("entry {}: missing text", index)));
        }

        spans.push(TimedSpan {
            index,
            start,
            end,
            text,
        });
    }

    Ok(spans)
}

/// Repair common damage before parsing: byte-order marks, `\r\n` or bare
/// `\r` line endings, surrounding whitespace, stray text ahead of an entry
/// and entries that lost the blank line between them.
///
/// Non-empty output always ends in a blank line.
pub fn normalize_srt(content: &str) -> String {
    let content = content
        .replace('\u{feff}', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let mut entries: Vec<String> = Vec::new();

    for block in blocks(content.trim()) {
        let starts: Vec<usize> = (0..block.len())
            .filter(|&i| is_entry_start(&block, i))
            .collect();

        for (n, &from) in starts.iter().enumerate() {
            let to = starts.get(n + 1).copied().unwrap_or(block.len());
            let lines: Vec<&str> = block[from..to].iter().map(|l| l.trim()).collect();
            if lines.len() > 2 {
                entries.push(lines.join("\n"));
            }
        }
    }

    if entries.is_empty() {
        return String::new();
    }

    let mut normalized = entries.join("\n\n");
    normalized.push_str("\n\n");
    normalized
}

/// Parse, retrying once on normalized content.
///
/// Malformed subtitle text from AI providers is expected, so an input that is
/// still unreadable after normalization yields no entries instead of an error.
pub fn parse_srt_lenient(content: &str) -> Vec<TimedSpan> {
    match parse_srt(content) {
        Ok(spans) => spans,
        Err(first) => {
            debug!("Strict subtitle parse failed ({}), retrying normalized", first);
            match parse_srt(&normalize_srt(content)) {
                Ok(spans) => {
                    if spans.is_empty() {
                        warn!("No subtitle entries found after normalization");
                    }
                    spans
                }
                Err(second) => {
                    warn!("Discarding unreadable subtitle document: {}", second);
                    Vec::new()
                }
            }
        }
    }
}

/// Serialize spans, numbering them 1..N by position.
pub fn format_srt(spans: &[TimedSpan]) -> String {
    spans
        .iter()
        .enumerate()
        .map(|(i, span)| {
            let text = span
                .text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_timestamp(span.start),
                format_timestamp(span.end),
                text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read and leniently parse a subtitle file.
pub fn read_srt(path: &Path) -> Result<Vec<TimedSpan>> {
    if !path.exists() {
        return Err(RedubError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(parse_srt_lenient(&content))
}

/// Serialize spans to a subtitle file.
pub fn write_srt(path: &Path, spans: &[TimedSpan]) -> Result<()> {
    std::fs::write(path, format_srt(spans))?;
    debug!("Wrote {} subtitle entries to {}", spans.len(), path.display());
    Ok(())
}

/// Split into blocks of lines separated by blank lines.
fn blocks(content: &str) -> Vec<Vec<&str>> {
    let mut result = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                result.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        result.push(current);
    }

    result
}

fn is_entry_start(lines: &[&str], i: usize) -> bool {
    lines[i].trim().parse::<usize>().is_ok()
        && lines
            .get(i + 1)
            .is_some_and(|next| parse_timing(next.trim()).is_some())
}

fn parse_timing(line: &str) -> Option<(Duration, Duration)> {
    let caps = TIMING_RE.captures(line)?;
    let field = |i: usize| -> Option<u64> { caps.get(i)?.as_str().parse().ok() };

    let start = to_duration(field(1)?, field(2)?, field(3)?, field(4)?);
    let end = to_duration(field(5)?, field(6)?, field(7)?, field(8)?);
    Some((start, end))
}

fn to_duration(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Duration {
    Duration::from_secs(hours * 3600 + minutes * 60 + seconds) + Duration::from_millis(millis)
}

pub(crate) fn format_timestamp(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = d.subsec_millis();
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}
