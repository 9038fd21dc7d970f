//! Rewrites cell values inside an existing xlsx package.
//!
//! Only the target worksheet part is re-serialized, and within it only the
//! patched `<c>` elements and the `<row>` elements whose height changes.
//! Every other part is raw-copied, so styles, merges, print settings and
//! anything else the template carries survive untouched.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use std::mem;

use log::debug;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::layout::CellRef;
use crate::error::{DailyworkError, Result};

/// Cell values and row heights to apply to one worksheet.
///
/// An empty value clears the cell but keeps its style.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetPatch {
    cells: BTreeMap<CellRef, String>,
    row_heights: BTreeMap<u32, f64>,
}

impl SheetPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, cell: CellRef, value: impl Into<String>) {
        self.cells.insert(cell, value.into());
    }

    pub fn clear(&mut self, cell: CellRef) {
        self.set(cell, "");
    }

    /// Requests a minimum height for a row. Taller rows stay as they are.
    pub fn set_row_height(&mut self, row: u32, height: f64) {
        self.row_heights.insert(row, height);
    }

    pub fn value(&self, cell: CellRef) -> Option<&str> {
        self.cells.get(&cell).map(String::as_str)
    }

    pub fn row_height(&self, row: u32) -> Option<f64> {
        self.row_heights.get(&row).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.row_heights.is_empty()
    }

    fn pending_rows(&self) -> BTreeMap<u32, PendingRow> {
        let mut rows: BTreeMap<u32, PendingRow> = BTreeMap::new();
        for (cell, value) in &self.cells {
            rows.entry(cell.row)
                .or_default()
                .cells
                .insert(cell.col, value.clone());
        }
        for (&row, &height) in &self.row_heights {
            rows.entry(row).or_default().height = Some(height);
        }
        rows
    }
}

#[derive(Debug, Default)]
struct PendingRow {
    cells: BTreeMap<u16, String>,
    height: Option<f64>,
}

/// Applies `patch` to the worksheet named `sheet_name` and returns the new package.
pub fn apply(template: &[u8], sheet_name: &str, patch: &SheetPatch) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(template))?;
    let part = worksheet_part(&mut archive, sheet_name)?;
    debug!("Patching {} ({})", part, sheet_name);

    let original = read_part(&mut archive, &part)?;
    let patched = patch_sheet_xml(&original, patch)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::with_capacity(template.len())));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        if file.name() == part {
            let name = file.name().to_string();
            drop(file);
            zip.start_file(name, options)?;
            zip.write_all(&patched)?;
        } else {
            zip.raw_copy_file(file)?;
        }
    }

    Ok(zip.finish()?.into_inner())
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(DailyworkError::InvalidWorkbook(format!("missing part {}", name)));
        }
        Err(err) => return Err(err.into()),
    };
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Resolves a sheet name to its part path through the workbook relationships.
fn worksheet_part<R: Read + Seek>(archive: &mut ZipArchive<R>, sheet_name: &str) -> Result<String> {
    let workbook = read_part(archive, "xl/workbook.xml")?;
    let rel_id = sheet_relationship_id(&workbook, sheet_name)?
        .ok_or_else(|| DailyworkError::WorksheetNotFound(sheet_name.to_string()))?;

    let rels = read_part(archive, "xl/_rels/workbook.xml.rels")?;
    let target = relationship_target(&rels, &rel_id)?.ok_or_else(|| {
        DailyworkError::InvalidWorkbook(format!("no relationship {} for sheet", rel_id))
    })?;

    Ok(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    })
}

fn sheet_relationship_id(workbook_xml: &[u8], sheet_name: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(workbook_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => return Ok(None),
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"sheet" => {
                let mut matched = false;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == b"name" {
                        matched = attr.unescape_value()? == sheet_name;
                    } else if attr.key.local_name().as_ref() == b"id" {
                        rel_id = Some(attr.unescape_value()?.into_owned());
                    }
                }
                if matched {
                    return Ok(rel_id);
                }
            }
            _ => {}
        }
        buf.clear();
    }
}

fn relationship_target(rels_xml: &[u8], rel_id: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(rels_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Eof => return Ok(None),
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if attr_value(e, b"Id")?.as_deref() == Some(rel_id) {
                    return attr_value(e, b"Target");
                }
            }
            _ => {}
        }
        buf.clear();
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn row_number(e: &BytesStart<'_>) -> Result<Option<u32>> {
    Ok(attr_value(e, b"r")?.and_then(|r| r.parse().ok()))
}

/// Streams the worksheet XML, replacing patched cells and inserting missing
/// cells and rows in document order.
fn patch_sheet_xml(xml: &[u8], patch: &SheetPatch) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 1024));

    let mut pending = patch.pending_rows();
    // Cells still to write in the row currently open, keyed by column.
    let mut row_cells: BTreeMap<u16, String> = BTreeMap::new();
    let mut current_row: Option<u32> = None;
    let mut skip_depth = 0usize;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
            continue;
        }

        match event {
            Event::Eof => break,
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                writer.write_event(Event::Start(e.clone()))?;
                write_new_rows(&mut writer, mem::take(&mut pending))?;
                writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                write_new_rows(&mut writer, mem::take(&mut pending))?;
                writer.write_event(Event::End(e.clone()))?;
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"row" => {
                let row = row_number(e)?;
                let target = take_row(&mut pending, row, &mut writer)?;
                let (start, cells) = open_row(e, target)?;
                writer.write_event(Event::Start(start))?;
                row_cells = cells;
                current_row = row;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                let row = row_number(e)?;
                let target = take_row(&mut pending, row, &mut writer)?;
                let (start, cells) = open_row(e, target)?;
                match (row, cells.is_empty()) {
                    (Some(row), false) => {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        writer.write_event(Event::Start(start))?;
                        write_cells(&mut writer, row, cells)?;
                        writer.write_event(Event::End(BytesEnd::new(name)))?;
                    }
                    _ => writer.write_event(Event::Empty(start))?,
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"row" => {
                if let Some(row) = current_row.take() {
                    write_cells(&mut writer, row, mem::take(&mut row_cells))?;
                }
                writer.write_event(Event::End(e.clone()))?;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"c" && !row_cells.is_empty() =>
            {
                let is_start = matches!(event, Event::Start(_));
                match attr_value(e, b"r")?.and_then(|r| CellRef::parse(&r)) {
                    Some(cell) => {
                        let rest = row_cells.split_off(&cell.col);
                        let before = mem::replace(&mut row_cells, rest);
                        write_cells(&mut writer, cell.row, before)?;

                        match row_cells.remove(&cell.col) {
                            Some(value) => {
                                let style = attr_value(e, b"s")?;
                                write_cell(&mut writer, cell, style.as_deref(), &value)?;
                                if is_start {
                                    skip_depth = 1;
                                }
                            }
                            None => writer.write_event(event.clone())?,
                        }
                    }
                    None => writer.write_event(event.clone())?,
                }
            }
            _ => writer.write_event(event.clone())?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

/// Writes every pending row numbered below `row`, then takes `row` itself.
fn take_row<W: Write>(
    pending: &mut BTreeMap<u32, PendingRow>,
    row: Option<u32>,
    writer: &mut Writer<W>,
) -> Result<Option<PendingRow>> {
    let Some(row) = row else {
        return Ok(None);
    };
    let rest = pending.split_off(&row);
    let earlier = mem::replace(pending, rest);
    write_new_rows(writer, earlier)?;
    Ok(pending.remove(&row))
}

/// Returns the (possibly rewritten) row start tag and the cells to place in it.
fn open_row(
    e: &BytesStart<'_>,
    target: Option<PendingRow>,
) -> Result<(BytesStart<'static>, BTreeMap<u16, String>)> {
    let Some(target) = target else {
        return Ok((e.clone().into_owned(), BTreeMap::new()));
    };

    let existing = attr_value(e, b"ht")?.and_then(|v| v.parse::<f64>().ok());
    let height = target
        .height
        .map(|h| existing.map_or(h, |old: f64| old.max(h)));

    let mut start = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"spans" || (height.is_some() && (key == b"ht" || key == b"customHeight")) {
            continue;
        }
        start.push_attribute(attr);
    }
    if let Some(height) = height {
        start.push_attribute(("ht", height.to_string().as_str()));
        start.push_attribute(("customHeight", "1"));
    }
    Ok((start, target.cells))
}

fn write_new_rows<W: Write>(writer: &mut Writer<W>, rows: BTreeMap<u32, PendingRow>) -> Result<()> {
    for (row, pending) in rows {
        let mut start = BytesStart::new("row");
        start.push_attribute(("r", row.to_string().as_str()));
        if let Some(height) = pending.height {
            start.push_attribute(("ht", height.to_string().as_str()));
            start.push_attribute(("customHeight", "1"));
        }
        if pending.cells.is_empty() {
            writer.write_event(Event::Empty(start))?;
        } else {
            writer.write_event(Event::Start(start))?;
            write_cells(writer, row, pending.cells)?;
            writer.write_event(Event::End(BytesEnd::new("row")))?;
        }
    }
    Ok(())
}

fn write_cells<W: Write>(writer: &mut Writer<W>, row: u32, cells: BTreeMap<u16, String>) -> Result<()> {
    for (col, value) in cells {
        write_cell(writer, CellRef::new(row, col), None, &value)?;
    }
    Ok(())
}

/// Writes one cell as an inline string, or as an empty styled cell.
fn write_cell<W: Write>(
    writer: &mut Writer<W>,
    cell: CellRef,
    style: Option<&str>,
    value: &str,
) -> Result<()> {
    let reference = cell.to_string();
    let mut c = BytesStart::new("c");
    c.push_attribute(("r", reference.as_str()));
    if let Some(style) = style {
        c.push_attribute(("s", style));
    }
    if value.is_empty() {
        writer.write_event(Event::Empty(c))?;
        return Ok(());
    }

    c.push_attribute(("t", "inlineStr"));
    writer.write_event(Event::Start(c))?;
    writer.write_event(Event::Start(BytesStart::new("is")))?;
    let mut t = BytesStart::new("t");
    t.push_attribute(("xml:space", "preserve"));
    writer.write_event(Event::Start(t))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new("t")))?;
    writer.write_event(Event::End(BytesEnd::new("is")))?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="2" spans="1:3" ht="40" customHeight="1"><c r="A2" s="3" t="s"><v>0</v></c><c r="C2" s="4"/></row><row r="5" spans="1:3"><c r="B5" s="7"/></row></sheetData><mergeCells count="1"><mergeCell ref="A1:C1"/></mergeCells></worksheet>"#;

    fn patched(patch: &SheetPatch) -> String {
        String::from_utf8(patch_sheet_xml(SHEET.as_bytes(), patch).unwrap()).unwrap()
    }

    #[test]
    fn replaces_value_and_keeps_style() {
        let mut patch = SheetPatch::new();
        patch.set(CellRef::new(2, 0), "Hello & bye");
        let xml = patched(&patch);
        assert!(xml.contains(
            r#"<c r="A2" s="3" t="inlineStr"><is><t xml:space="preserve">Hello &amp; bye</t></is></c>"#
        ));
        assert!(!xml.contains("<v>0</v>"));
        assert!(xml.contains(r#"<c r="C2" s="4"/>"#));
        assert!(xml.contains(r#"<mergeCell ref="A1:C1"/>"#));
    }

    #[test]
    fn clearing_keeps_an_empty_styled_cell() {
        let mut patch = SheetPatch::new();
        patch.clear(CellRef::new(2, 0));
        let xml = patched(&patch);
        assert!(xml.contains(r#"<c r="A2" s="3"/>"#));
    }

    #[test]
    fn inserts_missing_cells_and_rows_in_order() {
        let mut patch = SheetPatch::new();
        patch.set(CellRef::new(2, 1), "mid");
        patch.set(CellRef::new(5, 3), "tail");
        patch.set(CellRef::new(3, 0), "new row");
        patch.set(CellRef::new(9, 0), "last");
        let xml = patched(&patch);

        let a2 = xml.find(r#"r="A2""#).unwrap();
        let b2 = xml.find(r#"r="B2""#).unwrap();
        let c2 = xml.find(r#"r="C2""#).unwrap();
        assert!(a2 < b2 && b2 < c2);

        let row3 = xml.find(r#"<row r="3">"#).unwrap();
        let row5 = xml.find(r#"<row r="5""#).unwrap();
        let row9 = xml.find(r#"<row r="9">"#).unwrap();
        assert!(row3 < row5 && row5 < row9);

        let b5 = xml.find(r#"r="B5""#).unwrap();
        let d5 = xml.find(r#"r="D5""#).unwrap();
        assert!(b5 < d5);
        assert!(row9 < xml.find("</sheetData>").unwrap());
    }

    #[test]
    fn row_heights_only_grow() {
        let mut patch = SheetPatch::new();
        patch.set_row_height(2, 30.0);
        patch.set_row_height(5, 66.0);
        let xml = patched(&patch);
        assert!(xml.contains(r#"<row r="2" ht="40" customHeight="1">"#));
        assert!(xml.contains(r#"<row r="5" ht="66" customHeight="1">"#));
    }

    #[test]
    fn fills_an_empty_sheet_data() {
        let sheet = r#"<worksheet><sheetData/></worksheet>"#;
        let mut patch = SheetPatch::new();
        patch.set(CellRef::new(1, 0), "x");
        let xml = String::from_utf8(patch_sheet_xml(sheet.as_bytes(), &patch).unwrap()).unwrap();
        assert_eq!(
            xml,
            r#"<worksheet><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t xml:space="preserve">x</t></is></c></row></sheetData></worksheet>"#
        );
    }

    #[test]
    fn unknown_sheet_is_reported() {
        let template = crate::xlsx::template::default_template().unwrap();
        let err = apply(&template, "Sheet9", &SheetPatch::new()).unwrap_err();
        assert!(matches!(err, DailyworkError::WorksheetNotFound(name) if name == "Sheet9"));
    }
}
