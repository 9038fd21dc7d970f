//! Spreadsheet export and import against the fixed work log template.

pub mod export;
pub mod import;
pub mod layout;
pub mod patch;
pub mod template;

pub use export::export;
pub use import::{import, CellValue};
pub use template::{default_template, load_template};
