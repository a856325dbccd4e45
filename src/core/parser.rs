use crate::domain::model::ImportRecord;
use crate::utils::error::{AppError, Result, FIRST_NAME_COLUMN, NOTES_COLUMN, PHONE_COLUMN};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;

const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
/// 判斷是否為二進位檔時只看開頭這麼多位元組
const SNIFF_WINDOW: usize = 8192;

/// 欄位標題比對方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMatching {
    /// 大小寫需完全一致（標題前後空白一律忽略）
    #[default]
    Exact,
    /// 忽略大小寫、空白與底線，`first_name` 與 `First Name` 都對應到 `FirstName`
    Relaxed,
}

impl HeaderMatching {
    fn matches(self, header: &str, expected: &str) -> bool {
        let header = header.trim();
        match self {
            HeaderMatching::Exact => header == expected,
            HeaderMatching::Relaxed => normalize_header(header) == normalize_header(expected),
        }
    }
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Workbook,
}

impl SourceFormat {
    /// 依副檔名判斷格式；沒有副檔名時才看檔頭
    pub fn detect(file_name: &str, data: &[u8]) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some(ext) if DELIMITED_EXTENSIONS.contains(&ext) => Ok(SourceFormat::Delimited),
            Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext) => Ok(SourceFormat::Workbook),
            Some(_) => Err(AppError::UnsupportedFormat {
                file_name: file_name.to_string(),
            }),
            None => Self::sniff(data).ok_or_else(|| AppError::UnsupportedFormat {
                file_name: file_name.to_string(),
            }),
        }
    }

    fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(ZIP_MAGIC) || data.starts_with(OLE_MAGIC) {
            Some(SourceFormat::Workbook)
        } else if !data.is_empty() && !data.iter().take(SNIFF_WINDOW).any(|b| *b == 0) {
            // 非 UTF-8 的文字檔（例如 cp1252 匯出）也當成分隔文字
            Some(SourceFormat::Delimited)
        } else {
            None
        }
    }
}

/// 解析結果：有效資料列，以及被略過的列數
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecords {
    pub records: Vec<ImportRecord>,
    pub skipped_rows: usize,
}

/// 標題列 + 資料列，兩種來源格式都先轉成這個形狀
#[derive(Debug, Clone, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

pub fn parse_records(file_name: &str, data: &[u8], matching: HeaderMatching) -> Result<ParsedRecords> {
    let format = SourceFormat::detect(file_name, data)?;
    tracing::debug!("Parsing '{}' as {:?} ({} bytes)", file_name, format, data.len());

    let table = match format {
        SourceFormat::Delimited => read_delimited(data)?,
        SourceFormat::Workbook => read_workbook(data)?,
    };

    let parsed = extract_records(&table, matching);
    tracing::debug!(
        "Parsed {} valid rows, skipped {} rows",
        parsed.records.len(),
        parsed.skipped_rows
    );

    if parsed.records.is_empty() {
        return Err(AppError::NoValidRecords {
            skipped_rows: parsed.skipped_rows,
        });
    }

    Ok(parsed)
}

fn read_delimited(data: &[u8]) -> Result<RawTable> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(data))
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers = reader.byte_headers()?.iter().map(decode_field).collect();
    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        rows.push(record.iter().map(decode_field).collect());
    }

    Ok(RawTable { headers, rows })
}

/// 無效的 UTF-8 位元組只影響該儲存格，以替代字元呈現
fn decode_field(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

/// 以第一行中出現最多次的分隔符為準，預設逗號
fn sniff_delimiter(data: &[u8]) -> u8 {
    let first_line = data.split(|b| *b == b'\n').next().unwrap_or_default();
    [b',', b';', b'\t']
        .into_iter()
        .map(|delimiter| {
            let count = first_line.iter().filter(|b| **b == delimiter).count();
            (delimiter, count)
        })
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(delimiter, _)| delimiter)
        .unwrap_or(b',')
}

fn read_workbook(data: &[u8]) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))?;

    // 只讀第一個工作表
    let sheet_name = match workbook.sheet_names().first() {
        Some(name) => name.clone(),
        None => return Ok(RawTable::default()),
    };
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_text).collect(),
        None => return Ok(RawTable::default()),
    };
    let rows = rows
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(RawTable { headers, rows })
}

/// 儲存格轉文字；整數值的浮點數不帶小數點（電話號碼常被存成數字）
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn find_column(headers: &[String], expected: &str, matching: HeaderMatching) -> Option<usize> {
    headers
        .iter()
        .position(|header| matching.matches(header, expected))
}

fn non_empty(row: &[String], index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| row.get(i))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn extract_records(table: &RawTable, matching: HeaderMatching) -> ParsedRecords {
    let first_name_col = find_column(&table.headers, FIRST_NAME_COLUMN, matching);
    let phone_col = find_column(&table.headers, PHONE_COLUMN, matching);
    let notes_col = find_column(&table.headers, NOTES_COLUMN, matching);

    if first_name_col.is_none() || phone_col.is_none() {
        tracing::warn!(
            "Header row is missing {} or {}: {:?}",
            FIRST_NAME_COLUMN,
            PHONE_COLUMN,
            table.headers
        );
    }

    let mut records = Vec::new();
    let mut skipped_rows = 0;

    for row in &table.rows {
        // 整列空白不算資料列
        if row.iter().all(|value| value.trim().is_empty()) {
            continue;
        }

        match (non_empty(row, first_name_col), non_empty(row, phone_col)) {
            (Some(first_name), Some(phone)) => records.push(ImportRecord {
                first_name,
                phone,
                notes: non_empty(row, notes_col),
            }),
            _ => skipped_rows += 1,
        }
    }

    ParsedRecords {
        records,
        skipped_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    fn parse_csv(content: &str) -> Result<ParsedRecords> {
        parse_records("contacts.csv", content.as_bytes(), HeaderMatching::Exact)
    }

    const SHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

    fn text_cell(reference: &str, value: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, reference, value)
    }

    fn number_cell(reference: &str, value: f64) -> String {
        format!(r#"<c r="{}"><v>{:.1}</v></c>"#, reference, value)
    }

    fn worksheet(rows: &[Vec<String>]) -> String {
        let rows: String = rows
            .iter()
            .enumerate()
            .map(|(i, cells)| format!(r#"<row r="{}">{}</row>"#, i + 1, cells.concat()))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{}"><sheetData>{}</sheetData></worksheet>"#,
            SHEET_NS, rows
        )
    }

    /// 兩個工作表的最小 xlsx：第一張是聯絡人，第二張是不相干的資料
    fn contacts_workbook() -> Vec<u8> {
        let contacts = worksheet(&[
            vec![
                text_cell("A1", "FirstName"),
                text_cell("B1", "Phone"),
                text_cell("C1", "Notes"),
            ],
            vec![text_cell("A2", "Ana"), number_cell("B2", 5551234.0)],
            vec![text_cell("A3", "Bo"), text_cell("C3", "no phone")],
            vec![
                text_cell("A4", "Cy"),
                number_cell("B4", 15550001234.0),
                text_cell("C4", "vip"),
            ],
        ]);
        let other = worksheet(&[
            vec![text_cell("A1", "FirstName"), text_cell("B1", "Phone")],
            vec![text_cell("A2", "Other"), number_cell("B2", 1.0)],
        ]);

        let parts = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#
                    .to_string(),
            ),
            (
                "_rels/.rels",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{}"><Relationship Id="rId1" Type="{}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
                    PKG_REL_NS, REL_NS
                ),
            ),
            (
                "xl/workbook.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{}" xmlns:r="{}"><sheets><sheet name="Contacts" sheetId="1" r:id="rId1"/><sheet name="Other" sheetId="2" r:id="rId2"/></sheets></workbook>"#,
                    SHEET_NS, REL_NS
                ),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{0}"><Relationship Id="rId1" Type="{1}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{1}/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#,
                    PKG_REL_NS, REL_NS
                ),
            ),
            ("xl/worksheets/sheet1.xml", contacts),
            ("xl/worksheets/sheet2.xml", other),
        ];

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file::<_, ()>(name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_parse_valid_csv() {
        let parsed = parse_csv("FirstName,Phone,Notes\nAna,5551234,call after 5\nBo,5559876,\n").unwrap();

        assert_eq!(parsed.skipped_rows, 0);
        assert_eq!(
            parsed.records,
            vec![
                ImportRecord {
                    first_name: "Ana".to_string(),
                    phone: "5551234".to_string(),
                    notes: Some("call after 5".to_string()),
                },
                ImportRecord {
                    first_name: "Bo".to_string(),
                    phone: "5559876".to_string(),
                    notes: None,
                },
            ]
        );
    }

    #[test]
    fn test_row_missing_phone_is_excluded() {
        let parsed = parse_csv("FirstName,Phone,Notes\nAna,5551234,a\nBo,,b\nCy,5550000,c\n").unwrap();

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped_rows, 1);
        assert_eq!(parsed.records[0].first_name, "Ana");
        assert_eq!(parsed.records[1].first_name, "Cy");
    }

    #[test]
    fn test_row_missing_first_name_is_excluded() {
        let parsed = parse_csv("FirstName,Phone\n   ,5551234\nBo,5559876\n").unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].first_name, "Bo");
    }

    #[test]
    fn test_accepts_rows_without_other_columns() {
        let parsed = parse_csv("FirstName,Phone\nAna,5551234\n").unwrap();

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].notes, None);
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let parsed = parse_csv("Phone,FirstName,Notes\n5551234,Ana\n").unwrap();

        assert_eq!(parsed.records[0].first_name, "Ana");
        assert_eq!(parsed.records[0].phone, "5551234");
        assert_eq!(parsed.records[0].notes, None);
    }

    #[test]
    fn test_no_valid_records_error() {
        let err = parse_csv("FirstName,Phone\n,5551234\nBo,\n").unwrap_err();

        match err {
            AppError::NoValidRecords { skipped_rows } => assert_eq!(skipped_rows, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_column_yields_no_valid_records() {
        let err = parse_csv("Name,Phone\nAna,5551234\n").unwrap_err();
        assert!(matches!(err, AppError::NoValidRecords { .. }));
        assert!(err.to_string().contains("FirstName"));
    }

    #[test]
    fn test_exact_matching_is_case_sensitive() {
        let err = parse_csv("firstname,phone\nAna,5551234\n").unwrap_err();
        assert!(matches!(err, AppError::NoValidRecords { .. }));
    }

    #[test]
    fn test_exact_matching_trims_header_whitespace() {
        let parsed = parse_csv(" FirstName , Phone \nAna,5551234\n").unwrap();
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn test_relaxed_matching() {
        let parsed = parse_records(
            "contacts.csv",
            b"first_name,PHONE,notes\nAna,5551234,vip\n",
            HeaderMatching::Relaxed,
        )
        .unwrap();

        assert_eq!(parsed.records[0].first_name, "Ana");
        assert_eq!(parsed.records[0].notes.as_deref(), Some("vip"));
    }

    #[test]
    fn test_semicolon_delimiter_and_bom() {
        let parsed = parse_csv("\u{feff}FirstName;Phone;Notes\nAna;5551234;x\n").unwrap();

        assert_eq!(parsed.records[0].first_name, "Ana");
        assert_eq!(parsed.records[0].notes.as_deref(), Some("x"));
    }

    #[test]
    fn test_blank_lines_are_not_counted_as_skipped() {
        let parsed = parse_csv("FirstName,Phone\nAna,1\n,\nBo,2\n").unwrap();

        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped_rows, 0);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            SourceFormat::detect("a.CSV", b"").unwrap(),
            SourceFormat::Delimited
        );
        assert_eq!(
            SourceFormat::detect("a.xlsx", b"").unwrap(),
            SourceFormat::Workbook
        );
        assert_eq!(
            SourceFormat::detect("upload", b"PK\x03\x04rest").unwrap(),
            SourceFormat::Workbook
        );
        assert_eq!(
            SourceFormat::detect("upload", b"FirstName,Phone").unwrap(),
            SourceFormat::Delimited
        );
        assert!(matches!(
            SourceFormat::detect("a.pdf", b"%PDF"),
            Err(AppError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_corrupt_workbook_is_an_error() {
        let result = parse_records("broken.xlsx", b"PK\x03\x04not a zip", HeaderMatching::Exact);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_utf8_bytes_only_affect_their_own_cell() {
        let data = b"FirstName,Phone,Notes\nAna,5551234,caf\xe9\nBo,5550000,ok\n";
        let parsed = parse_records("contacts.csv", data, HeaderMatching::Exact).unwrap();

        assert_eq!(parsed.skipped_rows, 0);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].phone, "5551234");
        assert_eq!(parsed.records[0].notes.as_deref(), Some("caf\u{fffd}"));
        assert_eq!(parsed.records[1].first_name, "Bo");
        assert_eq!(parsed.records[1].notes.as_deref(), Some("ok"));
    }

    #[test]
    fn test_non_utf8_text_without_extension_is_delimited() {
        let data = b"FirstName;Phone\nJos\xe9;5551234\n";
        assert_eq!(
            SourceFormat::detect("upload", data).unwrap(),
            SourceFormat::Delimited
        );

        let parsed = parse_records("upload", data, HeaderMatching::Exact).unwrap();
        assert_eq!(parsed.records[0].phone, "5551234");

        assert!(matches!(
            SourceFormat::detect("upload", b"\x00\x01\x02binary"),
            Err(AppError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_workbook_reads_first_sheet_only() {
        let parsed =
            parse_records("contacts.xlsx", &contacts_workbook(), HeaderMatching::Exact).unwrap();

        assert_eq!(
            parsed.records,
            vec![
                ImportRecord {
                    first_name: "Ana".to_string(),
                    phone: "5551234".to_string(),
                    notes: None,
                },
                ImportRecord {
                    first_name: "Cy".to_string(),
                    phone: "15550001234".to_string(),
                    notes: Some("vip".to_string()),
                },
            ]
        );
        // Bo 沒有電話
        assert_eq!(parsed.skipped_rows, 1);
    }

    #[test]
    fn test_workbook_without_extension_is_detected_by_magic() {
        let data = contacts_workbook();
        assert_eq!(
            SourceFormat::detect("upload", &data).unwrap(),
            SourceFormat::Workbook
        );

        let parsed = parse_records("upload", &data, HeaderMatching::Exact).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].phone, "15550001234");
    }

    #[test]
    fn test_cell_text_coerces_numbers() {
        assert_eq!(cell_text(&Data::Float(5551234.0)), "5551234");
        assert_eq!(cell_text(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("Ana".to_string())), "Ana");
    }
}
