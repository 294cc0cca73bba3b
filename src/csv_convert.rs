// CSV and loose text to JSON conversion, with delimiter auto-detection

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::error::ToolError;

/// Delimiters considered by detection, in tie-break order
pub const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Parser settings; `delimiter: None` means auto-detect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    pub header: bool,
    pub delimiter: Option<char>,
    pub skip_empty_lines: bool,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            header: true,
            delimiter: None,
            skip_empty_lines: true,
        }
    }
}

/// Pick the candidate that occurs most often in the first line; `,` when none occur
pub fn detect_delimiter(text: &str) -> char {
    let first_line = text.split('\n').next().unwrap_or("");

    let mut detected = ',';
    let mut max_count = 0;
    for delimiter in CANDIDATE_DELIMITERS {
        let count = first_line.matches(delimiter).count();
        if count > max_count {
            max_count = count;
            detected = delimiter;
        }
    }
    detected
}

fn json_number(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    // Integral values print without a fraction, like JSON.stringify does
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Value::Number)
}

/// Numeric value of a cell, if the trimmed text is a finite number
pub fn parse_number(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // Rust accepts "inf"/"nan" spellings that are not numbers for our purposes
    if trimmed.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) {
        return None;
    }
    trimmed.parse::<f64>().ok().and_then(json_number)
}

/// Cell typing: numbers, booleans, null, otherwise the trimmed string
pub fn coerce_value(raw: &str) -> Value {
    if let Some(number) = parse_number(raw) {
        return number;
    }
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" | "" => Value::Null,
        _ => Value::String(trimmed.to_string()),
    }
}

fn coerce_numeric(raw: &str) -> Value {
    parse_number(raw).unwrap_or_else(|| Value::String(raw.trim().to_string()))
}

/// A parsed record and the 1-based line it started on
#[derive(Debug, Clone, PartialEq, Eq)]
struct Record {
    fields: Vec<String>,
    line: usize,
}

/// Raw text of one record, before field decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordSpan<'a> {
    raw: &'a str,
    line: usize,
    quote_error: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// A quote inside a quoted field: either the closing quote or the first half of `""`
    QuoteInQuoted,
}

/// Cut text into records at line breaks outside quotes.
///
/// The csv reader accepts stray text after a closing quote and runs an open
/// quote to the end of input, so both are flagged here per record.
fn split_records(text: &str, delimiter: char) -> Vec<RecordSpan<'_>> {
    let mut spans = Vec::new();
    let mut state = QuoteState::FieldStart;
    let mut quote_error = None;
    let mut start = 0;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = text.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let is_break = matches!(ch, '\r' | '\n');
        state = match state {
            QuoteState::Quoted => {
                if ch == '"' {
                    QuoteState::QuoteInQuoted
                } else {
                    if ch == '\n' {
                        line += 1;
                    }
                    QuoteState::Quoted
                }
            }
            QuoteState::QuoteInQuoted if ch == '"' => QuoteState::Quoted,
            QuoteState::QuoteInQuoted if ch != delimiter && !is_break => {
                quote_error = quote_error.or(Some("Trailing quote on quoted field is malformed"));
                QuoteState::Unquoted
            }
            QuoteState::FieldStart if ch == '"' => QuoteState::Quoted,
            _ if ch == delimiter => QuoteState::FieldStart,
            _ if is_break => {
                let mut end = offset + 1;
                if ch == '\r' {
                    if let Some(&(next, '\n')) = chars.peek() {
                        chars.next();
                        end = next + 1;
                    }
                }
                spans.push(RecordSpan {
                    raw: &text[start..offset],
                    line: record_line,
                    quote_error: quote_error.take(),
                });
                start = end;
                line += 1;
                record_line = line;
                QuoteState::FieldStart
            }
            _ => QuoteState::Unquoted,
        };
    }

    if state == QuoteState::Quoted {
        quote_error = Some("Quoted field unterminated");
    }
    if start < text.len() {
        spans.push(RecordSpan {
            raw: &text[start..],
            line: record_line,
            quote_error,
        });
    }
    spans
}

/// Decode the fields of one record with the csv reader
fn read_fields(raw: &str, delimiter: u8) -> Result<Vec<String>, ToolError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::None)
        .delimiter(delimiter)
        .from_reader(raw.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Ok(record.iter().map(str::to_string).collect()),
        Ok(false) => Ok(vec![String::new()]),
        Err(e) => Err(ToolError::Csv(vec![e.to_string()])),
    }
}

/// Parse CSV text into a JSON array of objects (with header) or arrays (without)
pub fn parse_csv_text(text: &str, settings: &CsvSettings) -> Result<Value, ToolError> {
    let delimiter = settings.delimiter.unwrap_or(',');
    let delimiter_byte = u8::try_from(delimiter)
        .ok()
        .filter(|&b| b.is_ascii() && !matches!(b, b'"' | b'\r' | b'\n'))
        .ok_or_else(|| ToolError::Csv(vec![format!("Unsupported delimiter: {delimiter:?}")]))?;

    let mut errors = Vec::new();
    let mut records = Vec::new();
    for span in split_records(text, delimiter) {
        if let Some(message) = span.quote_error {
            errors.push(format!("{message} (line {})", span.line));
            continue;
        }
        if span.raw.is_empty() {
            if !settings.skip_empty_lines {
                records.push(Record {
                    fields: vec![String::new()],
                    line: span.line,
                });
            }
            continue;
        }
        records.push(Record {
            fields: read_fields(span.raw, delimiter_byte)?,
            line: span.line,
        });
    }

    let mut rows = Vec::with_capacity(records.len());

    if !settings.header {
        for record in &records {
            rows.push(Value::Array(record.fields.iter().map(|f| coerce_value(f)).collect()));
        }
    } else if let Some((header_record, data)) = records.split_first() {
        let headers: Vec<String> = header_record.fields.iter().map(|h| h.trim().to_string()).collect();

        for (row_index, record) in data.iter().enumerate() {
            let expected = headers.len();
            let parsed = record.fields.len();
            if parsed != expected {
                let kind = if parsed < expected { "Too few fields" } else { "Too many fields" };
                errors.push(format!(
                    "{kind}: expected {expected} fields but parsed {parsed} (row {}, line {})",
                    row_index + 1,
                    record.line
                ));
                continue;
            }

            let mut object = Map::with_capacity(expected);
            for (name, value) in headers.iter().zip(&record.fields) {
                object.insert(name.clone(), coerce_value(value));
            }
            rows.push(Value::Object(object));
        }
    }

    if !errors.is_empty() {
        return Err(ToolError::Csv(errors));
    }

    debug!("Parsed {} CSV rows with delimiter {:?}", rows.len(), delimiter);
    Ok(Value::Array(rows))
}

/// Loose conversion: JSON if it parses, otherwise one value per non-blank line
pub fn parse_text_to_json(text: &str) -> Value {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return value;
    }

    let lines: Vec<&str> = text.split('\n').filter(|l| !l.trim().is_empty()).collect();
    match lines.as_slice() {
        [] => Value::Null,
        [line] => match CANDIDATE_DELIMITERS.into_iter().find(|d| line.contains(*d)) {
            Some(delimiter) => Value::Array(line.split(delimiter).map(coerce_numeric).collect()),
            None => Value::Array(vec![Value::String(line.trim().to_string())]),
        },
        many => Value::Array(many.iter().map(|l| coerce_numeric(l)).collect()),
    }
}

/// Convert pasted text: CSV when it contains the delimiter, loose lines otherwise
pub fn convert_text(text: &str, settings: &CsvSettings) -> Result<Value, ToolError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    let delimiter = settings.delimiter.unwrap_or_else(|| detect_delimiter(text));
    if text.contains(delimiter) {
        info!("Converting text as CSV with delimiter {:?}", delimiter);
        let csv_settings = CsvSettings {
            delimiter: Some(delimiter),
            ..settings.clone()
        };
        parse_csv_text(text, &csv_settings)
    } else {
        info!("No delimiter found, converting text line by line");
        Ok(parse_text_to_json(text))
    }
}

/// Number of rows in a conversion result, as shown in the success notice
pub fn row_count(value: &Value) -> usize {
    match value {
        Value::Array(rows) => rows.len(),
        Value::Null => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1;2;3;4;5"), ',');
        assert_eq!(detect_delimiter("a;b;c"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b,c|d"), '|');
        assert_eq!(detect_delimiter("no delimiters"), ',');
        // ties keep the earlier candidate
        assert_eq!(detect_delimiter("a;b,c"), ',');
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("42"), json!(42));
        assert_eq!(coerce_value(" 3.5 "), json!(3.5));
        assert_eq!(coerce_value("1e3"), json!(1000));
        assert_eq!(coerce_value("TRUE"), json!(true));
        assert_eq!(coerce_value(" false"), json!(false));
        assert_eq!(coerce_value("null"), Value::Null);
        assert_eq!(coerce_value(""), Value::Null);
        assert_eq!(coerce_value("  Alice "), json!("Alice"));
        assert_eq!(coerce_value("inf"), json!("inf"));
        assert_eq!(coerce_value("NaN"), json!("NaN"));
    }

    #[test]
    fn test_parse_with_header() {
        let text = "name, age ,active\nAlice,30,true\nBob,25.5,false\n";
        let value = parse_csv_text(text, &CsvSettings::default()).unwrap();
        assert_eq!(
            value,
            json!([
                {"name": "Alice", "age": 30, "active": true},
                {"name": "Bob", "age": 25.5, "active": false}
            ])
        );
    }

    #[test]
    fn test_header_order_preserved() {
        let value = parse_csv_text("z,a\n1,2", &CsvSettings::default()).unwrap();
        let keys: Vec<_> = value[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_parse_without_header() {
        let settings = CsvSettings {
            header: false,
            ..CsvSettings::default()
        };
        let value = parse_csv_text("a,1\nb,2", &settings).unwrap();
        assert_eq!(value, json!([["a", 1], ["b", 2]]));
    }

    #[test]
    fn test_quoted_fields() {
        let text = "title,quote\n\"Hello, world\",\"She said \"\"hi\"\"\"\n\"multi\nline\",x";
        let value = parse_csv_text(text, &CsvSettings::default()).unwrap();
        assert_eq!(value[0]["title"], json!("Hello, world"));
        assert_eq!(value[0]["quote"], json!("She said \"hi\""));
        assert_eq!(value[1]["title"], json!("multi\nline"));
    }

    #[test]
    fn test_crlf_and_empty_lines() {
        let text = "a,b\r\n1,2\r\n\r\n3,4\r\n";
        let value = parse_csv_text(text, &CsvSettings::default()).unwrap();
        assert_eq!(value, json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}]));

        let keep_empty = CsvSettings {
            skip_empty_lines: false,
            ..CsvSettings::default()
        };
        let err = parse_csv_text(text, &keep_empty).unwrap_err();
        assert!(err.to_string().contains("Too few fields"));
    }

    #[test]
    fn test_field_count_errors_are_collected() {
        let text = "a,b,c\n1,2\n1,2,3\n1,2,3,4";
        let err = parse_csv_text(text, &CsvSettings::default()).unwrap_err();
        let ToolError::Csv(messages) = err else {
            panic!("expected CSV error");
        };
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("Too few fields: expected 3 fields but parsed 2 (row 1"));
        assert!(messages[1].starts_with("Too many fields: expected 3 fields but parsed 4 (row 3"));
    }

    #[test]
    fn test_unterminated_quote() {
        let err = parse_csv_text("a,b\n\"open,2", &CsvSettings::default()).unwrap_err();
        assert!(err.to_string().contains("Quoted field unterminated (line 2)"));
    }

    #[test]
    fn test_text_after_closing_quote_is_malformed() {
        let err = parse_csv_text("a,b\n\"x\"y,2", &CsvSettings::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parsing errors: Trailing quote on quoted field is malformed (line 2)"
        );

        // an escaped quote or a delimiter right after the closing quote is fine
        let value = parse_csv_text("a,b\n\"x\"\"y\",\"z\"\n", &CsvSettings::default()).unwrap();
        assert_eq!(value, json!([{"a": "x\"y", "b": "z"}]));
    }

    #[test]
    fn test_quote_errors_collect_with_field_errors() {
        let text = "a,b\n\"ok\",1\n\"bad\" ,2\n3";
        let err = parse_csv_text(text, &CsvSettings::default()).unwrap_err();
        let ToolError::Csv(messages) = err else {
            panic!("expected CSV error");
        };
        assert_eq!(
            messages,
            vec![
                "Trailing quote on quoted field is malformed (line 3)".to_string(),
                "Too few fields: expected 2 fields but parsed 1 (row 2, line 4)".to_string(),
            ]
        );
    }

    #[test]
    fn test_unsupported_delimiter() {
        let settings = CsvSettings {
            delimiter: Some('§'),
            ..CsvSettings::default()
        };
        assert!(parse_csv_text("a§b\n1§2", &settings).is_err());
    }

    #[test]
    fn test_custom_delimiter() {
        let settings = CsvSettings {
            delimiter: Some(';'),
            ..CsvSettings::default()
        };
        let value = parse_csv_text("x;y\n1,5;2", &settings).unwrap();
        assert_eq!(value, json!([{"x": "1,5", "y": 2}]));
    }

    #[test]
    fn test_parse_text_to_json() {
        assert_eq!(parse_text_to_json("{\"a\": [1, 2]}"), json!({"a": [1, 2]}));
        assert_eq!(parse_text_to_json("   \n  "), Value::Null);
        assert_eq!(parse_text_to_json("1; two ;3"), json!([1, "two", 3]));
        assert_eq!(parse_text_to_json("just words"), json!(["just words"]));
        assert_eq!(parse_text_to_json("apple\n 2 \n\nbanana"), json!(["apple", 2, "banana"]));
    }

    #[test]
    fn test_convert_text_routes_by_delimiter() {
        let settings = CsvSettings::default();
        let csv = convert_text("a|b\n1|2", &settings).unwrap();
        assert_eq!(csv, json!([{"a": 1, "b": 2}]));

        let lines = convert_text("alpha\nbeta", &settings).unwrap();
        assert_eq!(lines, json!(["alpha", "beta"]));

        assert_eq!(convert_text("  ", &settings).unwrap(), Value::Null);
        assert_eq!(row_count(&csv), 1);
    }
}
