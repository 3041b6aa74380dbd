//! Line terminator detection

use crate::buffer::TextBuffer;
use crate::line_index::LineIndex;

/// Number of lines sampled when guessing a document's line ending
const DETECTION_SAMPLE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    #[default]
    LineFeed,
    CarriageReturn,
    CarriageReturnLineFeed,
}

impl LineEnding {
    /// The terminator `line` ends with, if any
    pub fn from_line(line: &str) -> Option<Self> {
        if line.ends_with("\r\n") {
            Some(Self::CarriageReturnLineFeed)
        } else if line.ends_with('\n') {
            Some(Self::LineFeed)
        } else if line.ends_with('\r') {
            Some(Self::CarriageReturn)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LineFeed => "\n",
            Self::CarriageReturn => "\r",
            Self::CarriageReturnLineFeed => "\r\n",
        }
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    /// Most common terminator among the first lines of the document
    pub fn detect<T>(index: &LineIndex<T>, buffer: &dyn TextBuffer) -> Self {
        let mut counts = [0usize; 3];
        for position in index.iter().take(DETECTION_SAMPLE) {
            let Some(line) = buffer.substring(position.range.clone()) else {
                continue;
            };
            match Self::from_line(&line) {
                Some(Self::LineFeed) => counts[0] += 1,
                Some(Self::CarriageReturn) => counts[1] += 1,
                Some(Self::CarriageReturnLineFeed) => counts[2] += 1,
                None => {}
            }
        }

        let endings = [
            Self::LineFeed,
            Self::CarriageReturn,
            Self::CarriageReturnLineFeed,
        ];
        // Ties resolve to the earlier entry, so plain LF wins an empty sample
        let mut best = 0;
        for i in 1..endings.len() {
            if counts[i] > counts[best] {
                best = i;
            }
        }
        endings[best]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextStorage;

    #[test]
    fn test_from_line() {
        assert_eq!(LineEnding::from_line("abc\n"), Some(LineEnding::LineFeed));
        assert_eq!(
            LineEnding::from_line("abc\r\n"),
            Some(LineEnding::CarriageReturnLineFeed)
        );
        assert_eq!(LineEnding::from_line("abc\r"), Some(LineEnding::CarriageReturn));
        assert_eq!(LineEnding::from_line("abc"), None);
        assert_eq!(LineEnding::from_line(""), None);
    }

    #[test]
    fn test_detect_crlf_document() {
        let storage = TextStorage::new("a\r\nb\r\nc\nd");
        let index = LineIndex::<()>::build_from_buffer(&storage, 10.0);
        assert_eq!(
            LineEnding::detect(&index, &storage),
            LineEnding::CarriageReturnLineFeed
        );
    }

    #[test]
    fn test_detect_defaults_to_line_feed() {
        let storage = TextStorage::new("no terminators");
        let index = LineIndex::<()>::build_from_buffer(&storage, 10.0);
        assert_eq!(LineEnding::detect(&index, &storage), LineEnding::LineFeed);
    }
}
