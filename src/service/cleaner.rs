//! Deterministic cleanup of extracted document text
//!
//! OCR output arrives with scanner artifacts, broken digit runs and noisy
//! whitespace. Cleaning is a pure text-to-text function: same input, same
//! output, no provider calls.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Pure text cleaner with pre-compiled artifact patterns
pub struct TextCleaner {
    horizontal_ws: Regex,
    excess_newlines: Regex,
    stray_pipes: Regex,
    underscore_runs: Regex,
    caret_tilde_runs: Regex,
    dot_leaders: Regex,
    dash_runs: Regex,
    ocr_zero: Regex,
    ocr_one: Regex,
}

impl TextCleaner {
    pub fn new() -> Self {
        Self {
            horizontal_ws: Regex::new(r"[ \t]+").unwrap(),
            excess_newlines: Regex::new(r"\n{3,}").unwrap(),
            // Table borders and form lines that OCR renders as symbol runs
            stray_pipes: Regex::new(r"[ \t]*\|[ \t]*").unwrap(),
            underscore_runs: Regex::new(r"_{2,}").unwrap(),
            caret_tilde_runs: Regex::new(r"[\^~]{2,}").unwrap(),
            dot_leaders: Regex::new(r"\.{4,}").unwrap(),
            dash_runs: Regex::new(r"-{3,}").unwrap(),
            // Letter runs misread inside digit runs (dates, IBANs, phone
            // numbers); the run must be bounded by digits on both sides
            ocr_zero: Regex::new(r"(\d)([OoQ]+)(\d)").unwrap(),
            ocr_one: Regex::new(r"(\d)([lI]+)(\d)").unwrap(),
        }
    }

    /// Clean extracted text. Paragraph structure (blank-line separation)
    /// survives; everything else is normalized.
    pub fn clean(&self, text: &str) -> String {
        // Unicode NFC first so artifact patterns see composed characters
        let text: String = text.nfc().collect();

        let text: String = text
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();

        let text = self.stray_pipes.replace_all(&text, " ");
        let text = self.underscore_runs.replace_all(&text, "");
        let text = self.caret_tilde_runs.replace_all(&text, "");
        let text = self.dot_leaders.replace_all(&text, "...");
        let text = self.dash_runs.replace_all(&text, "--");

        let text = self.fix_digit_misreads(&text);

        let text = self.horizontal_ws.replace_all(&text, " ");

        let text: String = text
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n");

        let text = self.excess_newlines.replace_all(&text, "\n\n");

        text.trim().to_string()
    }

    /// Replace letter runs misread inside digit sequences. Two passes:
    /// `replace_all` consumes the trailing digit of each match, so an
    /// alternating sequence like "1O1O1" needs a second sweep.
    fn fix_digit_misreads(&self, text: &str) -> String {
        let mut out = text.to_string();
        for _ in 0..2 {
            out = self
                .ocr_zero
                .replace_all(&out, |caps: &regex::Captures| {
                    format!("{}{}{}", &caps[1], "0".repeat(caps[2].len()), &caps[3])
                })
                .into_owned();
            out = self
                .ocr_one
                .replace_all(&out, |caps: &regex::Captures| {
                    format!("{}{}{}", &caps[1], "1".repeat(caps[2].len()), &caps[3])
                })
                .into_owned();
        }
        out
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_normalized_paragraphs_kept() {
        let cleaner = TextCleaner::new();
        let out = cleaner.clean("First   line\t here\n\n\n\n\nSecond  paragraph");
        assert_eq!(out, "First line here\n\nSecond paragraph");
    }

    #[test]
    fn test_scanner_artifacts_removed() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean("Name | Date | Amount"), "Name Date Amount");
        assert_eq!(cleaner.clean("Signature: ______"), "Signature:");
        assert_eq!(cleaner.clean("Total .......... 120"), "Total ... 120");
        assert_eq!(cleaner.clean("------------\nSection"), "--\nSection");
        assert_eq!(cleaner.clean("noise ^^^~~~ here"), "noise here");
    }

    #[test]
    fn test_ocr_digit_fixes() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean("Date: 2O24-10-15"), "Date: 2024-10-15");
        assert_eq!(cleaner.clean("Ref 4l7"), "Ref 417");
        // Adjacent and alternating misreads inside one digit sequence
        assert_eq!(cleaner.clean("Year 2OO4"), "Year 2004");
        assert_eq!(cleaner.clean("Acct 1O1O1"), "Acct 10101");
        assert_eq!(cleaner.clean("Ref 4llI7"), "Ref 41117");
        // Letters outside digit runs are left alone
        assert_eq!(cleaner.clean("Olive Oil"), "Olive Oil");
        assert_eq!(cleaner.clean("PO Box"), "PO Box");
    }

    #[test]
    fn test_control_chars_stripped() {
        let cleaner = TextCleaner::new();
        assert_eq!(cleaner.clean("a\u{0}b\u{7}c"), "abc");
    }

    #[test]
    fn test_clean_is_idempotent() {
        let cleaner = TextCleaner::new();
        let once = cleaner.clean("Claim |  form ____ 2O24 .......");
        assert_eq!(cleaner.clean(&once), once);
    }
}
