//! Text height estimation for spreadsheet rows.
//!
//! There is no layout engine to ask, so wrapping is approximated with a
//! monospace model: narrow glyphs take `NARROW_EM` of the font size, wide
//! (CJK/fullwidth) glyphs a full em. Good enough to decide whether a task
//! row needs to grow; not meant to match a renderer pixel for pixel.

use unicode_width::UnicodeWidthChar;

/// Height of a task row in the template, in points.
pub const DEFAULT_ROW_HEIGHT: f64 = 33.75;

/// Width of a one-column glyph relative to the font size.
pub const NARROW_EM: f64 = 0.55;

#[derive(Debug, Clone, Copy)]
pub struct RowHeightEstimator {
    pub font_size: f64,
    pub line_height: f64,
    pub padding: f64,
}

impl Default for RowHeightEstimator {
    fn default() -> Self {
        RowHeightEstimator {
            font_size: 11.0,
            line_height: 2.0,
            padding: 0.0,
        }
    }
}

impl RowHeightEstimator {
    /// Estimated rendered height of `text` wrapped at `width_px`.
    ///
    /// Blank text returns [`DEFAULT_ROW_HEIGHT`].
    pub fn estimate(&self, text: &str, width_px: f64) -> f64 {
        if text.trim().is_empty() {
            return DEFAULT_ROW_HEIGHT;
        }
        let usable = (width_px - self.padding * 2.0).max(self.font_size);
        let lines = wrap_em(text, usable / self.font_size).len().max(1);
        lines as f64 * self.font_size * self.line_height + self.padding * 2.0
    }

    /// Row height to apply for a task description: the estimate when it exceeds
    /// the template default, otherwise `None` (leave the row alone).
    pub fn row_height_for(&self, text: &str, width_px: f64) -> Option<f64> {
        let estimate = self.estimate(text, width_px);
        (estimate > DEFAULT_ROW_HEIGHT).then_some(estimate)
    }
}

/// Display width of a character in columns (wide glyphs count two).
pub fn char_columns(c: char) -> usize {
    c.width().unwrap_or(0)
}

/// Advance of a character in ems: [`NARROW_EM`] for narrow glyphs, one em
/// for wide ones.
pub fn char_em(c: char) -> f64 {
    match char_columns(c) {
        0 => 0.0,
        1 => NARROW_EM,
        _ => 1.0,
    }
}

/// Advance of a string in ems.
pub fn text_em(text: &str) -> f64 {
    text.chars().map(char_em).sum()
}

/// Wraps text into lines no wider than `max_em`.
///
/// Explicit newlines always break. Words are kept together when they fit on
/// a line by themselves and broken at any character otherwise.
pub fn wrap_em(text: &str, max_em: f64) -> Vec<String> {
    let max_em = max_em.max(1.0);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }
        let mut line = String::new();
        let mut width = 0.0;
        for word in split_keep_spaces(paragraph) {
            let word_width = text_em(word);
            if width + word_width <= max_em {
                line.push_str(word);
                width += word_width;
                continue;
            }
            if word.trim().is_empty() {
                // Break at the space instead of carrying it to the next line.
                lines.push(std::mem::take(&mut line));
                width = 0.0;
                continue;
            }
            if word_width <= max_em && width > 0.0 {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
                width = word_width;
                continue;
            }
            for c in word.chars() {
                let w = char_em(c);
                if width + w > max_em && width > 0.0 {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
                line.push(c);
                width += w;
            }
        }
        lines.push(line);
    }
    lines
}

/// Splits into alternating runs of non-space and space characters.
fn split_keep_spaces(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in text.char_indices() {
        let space = c == ' ';
        match in_space {
            Some(prev) if prev != space => {
                parts.push(&text[start..i]);
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_uses_default_height() {
        let est = RowHeightEstimator::default();
        assert_eq!(est.estimate("", 300.0), DEFAULT_ROW_HEIGHT);
        assert_eq!(est.estimate("  \n ", 300.0), DEFAULT_ROW_HEIGHT);
        assert_eq!(est.row_height_for("", 300.0), None);
    }

    #[test]
    fn single_short_line_keeps_template_height() {
        let est = RowHeightEstimator::default();
        assert_eq!(est.estimate("Review", 300.0), 22.0);
        assert_eq!(est.row_height_for("Review", 300.0), None);
    }

    #[test]
    fn long_text_grows() {
        let est = RowHeightEstimator::default();
        let text = "API 설계 및 구현, 코드 리뷰 및 품질 검토, 테스트 케이스 작성 및 실행";
        let height = est.estimate(text, 300.0);
        assert!(height > DEFAULT_ROW_HEIGHT, "height {height}");
        assert_eq!(est.row_height_for(text, 300.0), Some(height));
    }

    #[test]
    fn newlines_always_break() {
        let est = RowHeightEstimator::default();
        assert_eq!(est.estimate("a\nb\nc", 300.0), 66.0);
    }

    #[test]
    fn wide_glyphs_are_one_em() {
        assert_eq!(char_em('가'), 1.0);
        assert_eq!(char_em('a'), NARROW_EM);
        let est = RowHeightEstimator::default();
        // 300 px at 11 px is 27.27 em: 27 Hangul syllables still fit one line.
        assert_eq!(est.estimate(&"가".repeat(27), 300.0), 22.0);
        assert_eq!(est.estimate(&"가".repeat(28), 300.0), 44.0);
    }

    #[test]
    fn wrap_respects_wide_glyphs() {
        let lines = wrap_em("가나다라마", 2.0);
        assert_eq!(lines, vec!["가나", "다라", "마"]);
    }

    #[test]
    fn wrap_keeps_words_together() {
        let lines = wrap_em("alpha beta gamma", 6.0);
        assert_eq!(lines, vec!["alpha beta", "gamma"]);
        for line in &lines {
            assert!(text_em(line) <= 6.0);
        }
    }
}
