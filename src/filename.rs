//! Output filename templates.
//!
//! A template is an ordered list of blocks. Separators are ordinary text
//! blocks, so blocks are concatenated as-is. The stored JSON shape
//! (`blocks` / `type` / `content` / `dateFormat`) is the one the filename
//! customizer has always written, so existing preferences keep loading.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::error::{DailyworkError, Result};
use crate::models::WorkRecord;

/// Substituted for an empty author name.
pub const MISSING_AUTHOR: &str = "[이름없음]";

const DEFAULT_SEPARATOR: &str = " 일일업무일지_";

/// One piece of a filename template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    /// Literal text, copied verbatim.
    Text { content: String },
    /// The record's author.
    #[serde(rename = "name")]
    Author,
    /// The record's date, rendered in the template's [`DateStyle`].
    Date,
}

impl Block {
    pub fn text(content: impl Into<String>) -> Self {
        Block::Text {
            content: content.into(),
        }
    }

    /// Short label for listings.
    pub fn label(&self) -> String {
        match self {
            Block::Text { content } => format!("text \"{}\"", content),
            Block::Author => "author".to_string(),
            Block::Date => "date".to_string(),
        }
    }
}

/// How the date block is rendered.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateStyle {
    /// `YYYYMMDD`
    #[default]
    #[serde(rename = "yyyymmdd")]
    Compact,
    /// `YYMMDD`
    #[serde(rename = "yymmdd")]
    CompactShortYear,
    /// `YYYY-MM-DD`
    #[serde(rename = "yyyy-mm-dd")]
    Hyphenated,
    /// `YYYY년 M월 D일`
    #[serde(rename = "dateString")]
    Localized,
}

impl DateStyle {
    pub fn render(self, date: NaiveDate) -> String {
        match self {
            DateStyle::Compact => date.format("%Y%m%d").to_string(),
            DateStyle::CompactShortYear => date.format("%y%m%d").to_string(),
            DateStyle::Hyphenated => dates::to_iso(date),
            DateStyle::Localized => {
                format!("{}년 {}월 {}일", date.year(), date.month(), date.day())
            }
        }
    }

    /// Parses the names accepted on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "yyyymmdd" | "compact" => Some(DateStyle::Compact),
            "yymmdd" | "short" => Some(DateStyle::CompactShortYear),
            "yyyy-mm-dd" | "iso" | "hyphenated" => Some(DateStyle::Hyphenated),
            "datestring" | "korean" | "localized" => Some(DateStyle::Localized),
            _ => None,
        }
    }
}

/// Ordered blocks plus the date style, persisted as a user preference.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(rename = "dateFormat", default)]
    pub date_style: DateStyle,
}

impl Default for FilenameTemplate {
    /// `{date} 일일업무일지_{author}` with compact dates.
    fn default() -> Self {
        FilenameTemplate {
            blocks: vec![Block::Date, Block::text(DEFAULT_SEPARATOR), Block::Author],
            date_style: DateStyle::Compact,
        }
    }
}

impl FilenameTemplate {
    /// Builds a filename (without extension) for the given date text and author.
    pub fn build(&self, date: &str, author: &str) -> String {
        self.build_for(dates::normalize(date), author)
    }

    /// Builds a filename (without extension) for an already parsed date.
    pub fn build_for(&self, date: NaiveDate, author: &str) -> String {
        let author = if author.is_empty() { MISSING_AUTHOR } else { author };
        if self.blocks.is_empty() {
            return format!(
                "{}{}{}",
                DateStyle::Compact.render(date),
                DEFAULT_SEPARATOR,
                author
            );
        }
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Text { content } => content.clone(),
                Block::Author => author.to_string(),
                Block::Date => self.date_style.render(date),
            })
            .collect()
    }

    /// Full file name for a record, extension included.
    pub fn preview(&self, record: &WorkRecord, extension: &str) -> String {
        format!("{}.{}", self.build_for(record.date, &record.author), extension)
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Removes the block at a 0-based index.
    pub fn remove(&mut self, index: usize) -> Result<Block> {
        if index >= self.blocks.len() {
            return Err(DailyworkError::BlockNotFound(index + 1));
        }
        Ok(self.blocks.remove(index))
    }

    /// Replaces the content of the text block at a 0-based index.
    ///
    /// Author and date blocks have no editable content; they are left untouched
    /// and reported as not found.
    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> Result<()> {
        match self.blocks.get_mut(index) {
            Some(Block::Text { content }) => {
                *content = text.into();
                Ok(())
            }
            _ => Err(DailyworkError::BlockNotFound(index + 1)),
        }
    }

    /// Moves the block at `from` so it ends up at index `to` (0-based).
    pub fn move_block(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.blocks.len();
        if from >= len {
            return Err(DailyworkError::BlockNotFound(from + 1));
        }
        if to >= len {
            return Err(DailyworkError::BlockNotFound(to + 1));
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        Ok(())
    }

    pub fn set_date_style(&mut self, style: DateStyle) {
        self.date_style = style;
    }

    /// Restores the built-in template.
    pub fn reset(&mut self) {
        *self = FilenameTemplate::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn default_template_shape() {
        let t = FilenameTemplate::default();
        assert_eq!(t.build_for(date(), "Kim"), "20240305 일일업무일지_Kim");
    }

    #[test]
    fn empty_template_falls_back() {
        let t = FilenameTemplate {
            blocks: vec![],
            date_style: DateStyle::Localized,
        };
        assert_eq!(t.build_for(date(), "Kim"), "20240305 일일업무일지_Kim");
        assert_eq!(t.build_for(date(), ""), "20240305 일일업무일지_[이름없음]");
    }

    #[test]
    fn date_styles() {
        assert_eq!(DateStyle::Compact.render(date()), "20240305");
        assert_eq!(DateStyle::CompactShortYear.render(date()), "240305");
        assert_eq!(DateStyle::Hyphenated.render(date()), "2024-03-05");
        assert_eq!(DateStyle::Localized.render(date()), "2024년 3월 5일");
    }

    #[test]
    fn build_normalizes_date_text() {
        let t = FilenameTemplate {
            blocks: vec![Block::Author, Block::text("_"), Block::Date],
            date_style: DateStyle::Hyphenated,
        };
        assert_eq!(t.build("2024. 3. 5.", "Lee"), "Lee_2024-03-05");
    }

    #[test]
    fn preview_appends_extension() {
        let mut record = WorkRecord::new(date());
        record.author = "Kim".to_string();
        assert_eq!(
            FilenameTemplate::default().preview(&record, "pdf"),
            "20240305 일일업무일지_Kim.pdf"
        );
    }

    #[test]
    fn move_block_reorders() {
        let mut t = FilenameTemplate::default();
        t.move_block(2, 0).unwrap();
        assert_eq!(t.blocks[0], Block::Author);
        assert_eq!(t.blocks[1], Block::Date);
        assert!(t.move_block(0, 3).is_err());
    }

    #[test]
    fn set_text_only_touches_text_blocks() {
        let mut t = FilenameTemplate::default();
        t.set_text(1, "-").unwrap();
        assert_eq!(t.build_for(date(), "Kim"), "20240305-Kim");
        assert!(t.set_text(0, "x").is_err());
    }

    #[test]
    fn reads_stored_customizer_json() {
        let json = r#"{"blocks":[{"id":"1","type":"date","content":"날짜"},{"id":"2","type":"text","content":"_log_"},{"id":"3","type":"name","content":"작성자"}],"dateFormat":"yymmdd"}"#;
        let t: FilenameTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(t.build_for(date(), "Park"), "240305_log_Park");
    }
}
