use once_cell::sync::Lazy;
use regex::Regex;

// Leading [mm:ss], [mm:ss.xx] or [mm:ss.xxx] timestamp
static TIMESTAMP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d{2}):(\d{2})(?:\.(\d{2,3}))?\]").expect("valid regex"));

static ALL_TIMESTAMPS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d{2}:\d{2}(?:\.\d{2,3})?\]").expect("valid regex"));

/// Parses a single LRC lyric line into (timestamp in milliseconds, text).
///
/// The fractional part is centiseconds when two digits, milliseconds when
/// three. The text is everything after the last `]`, so lines carrying
/// several timestamps keep only the final text. Lines without a leading
/// timestamp fail to parse.
pub fn parse_lrc_line(line: &str) -> Option<(u64, String)> {
    let caps = TIMESTAMP_RE.captures(line)?;

    let minutes: u64 = caps[1].parse().ok()?;
    let seconds: u64 = caps[2].parse().ok()?;
    let fraction_ms = match caps.get(3) {
        Some(frac) => {
            let value: u64 = frac.as_str().parse().ok()?;
            if frac.as_str().len() == 3 {
                value
            } else {
                value * 10
            }
        }
        None => 0,
    };

    let timestamp_ms = (minutes * 60 + seconds) * 1000 + fraction_ms;

    let text_start = line.rfind(']').map(|i| i + 1).unwrap_or(0);
    let text = line[text_start..].trim().to_string();

    Some((timestamp_ms, text))
}

/// Removes every LRC timestamp, leaving plain lyrics text suitable for an
/// unsynchronized lyrics tag frame.
pub fn strip_timestamps(lyric: &str) -> String {
    ALL_TIMESTAMPS_RE.replace_all(lyric, "").trim().to_string()
}

/// A single timed lyric line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub time_ms: u64,
    pub text: String,
}

/// A parsed lyrics document, ordered by timestamp
#[derive(Debug, Clone, Default)]
pub struct LyricsDoc {
    pub lines: Vec<LyricLine>,
}

impl LyricsDoc {
    /// Parses a whole LRC document, keeping timestamped lines with
    /// non-empty text.
    pub fn parse(lyric: &str) -> Self {
        let mut lines: Vec<LyricLine> = lyric
            .lines()
            .filter_map(parse_lrc_line)
            .filter(|(_, text)| !text.is_empty())
            .map(|(time_ms, text)| LyricLine { time_ms, text })
            .collect();
        lines.sort_by_key(|l| l.time_ms);
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the line active at `position_ms`: the last line whose
    /// timestamp is not past the playback position. None before the first
    /// timestamp.
    pub fn line_index_at(&self, position_ms: u64) -> Option<usize> {
        let idx = self.lines.partition_point(|l| l.time_ms <= position_ms);
        idx.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lrc_line_with_centiseconds() {
        assert_eq!(parse_lrc_line("[01:02.34]Hello"), Some((62340, "Hello".to_string())));
    }

    #[test]
    fn test_parse_lrc_line_with_milliseconds() {
        assert_eq!(parse_lrc_line("[00:12.340]Hi"), Some((12340, "Hi".to_string())));
    }

    #[test]
    fn test_parse_lrc_line_without_fraction() {
        assert_eq!(parse_lrc_line("[01:30]Line"), Some((90000, "Line".to_string())));
    }

    #[test]
    fn test_parse_lrc_line_without_timestamp_fails() {
        assert_eq!(parse_lrc_line("just some words"), None);
        assert_eq!(parse_lrc_line("[ti:Some Title]"), None);
        assert_eq!(parse_lrc_line(""), None);
    }

    #[test]
    fn test_parse_lrc_line_text_after_last_bracket() {
        // Repeated-timestamp lines keep the trailing text only
        assert_eq!(
            parse_lrc_line("[00:10.00][00:20.00]Chorus"),
            Some((10000, "Chorus".to_string()))
        );
    }

    #[test]
    fn test_parse_lrc_line_empty_text() {
        assert_eq!(parse_lrc_line("[00:05.00]"), Some((5000, String::new())));
    }

    #[test]
    fn test_strip_timestamps() {
        let lrc = "[00:01.00]one\n[00:02.00]two";
        assert_eq!(strip_timestamps(lrc), "one\ntwo");
    }

    #[test]
    fn test_doc_parse_skips_untimed_and_empty_lines() {
        let lrc = "[ti:Title]\n[00:15.00]second\n[00:12.34]first\n[00:20.00]\nplain text";
        let doc = LyricsDoc::parse(lrc);
        assert_eq!(doc.lines.len(), 2);
        assert_eq!(doc.lines[0].time_ms, 12340);
        assert_eq!(doc.lines[0].text, "first");
        assert_eq!(doc.lines[1].text, "second");
    }

    #[test]
    fn test_line_index_at() {
        let doc = LyricsDoc::parse("[00:10.00]a\n[00:20.00]b\n[00:30.00]c");
        assert_eq!(doc.line_index_at(0), None);
        assert_eq!(doc.line_index_at(10_000), Some(0));
        assert_eq!(doc.line_index_at(19_999), Some(0));
        assert_eq!(doc.line_index_at(20_000), Some(1));
        assert_eq!(doc.line_index_at(99_000), Some(2));
    }
}
