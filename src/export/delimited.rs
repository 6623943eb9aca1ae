//! Delimited-text rendering of a sample table
//!
//! Header is the column list; one line per row; a sensor with no sample at a
//! row's timestamp leaves its cell empty. Lines end with CRLF.

use crate::types::SampleTable;
use std::fmt::Write;

const LINE_END: &str = "\r\n";

/// Render `table` with `delimiter` between cells.
pub fn to_delimited(table: &SampleTable, delimiter: char) -> String {
    let mut out = String::with_capacity(64 * (table.rows.len() + 1));
    let sep = delimiter.to_string();

    let header: Vec<String> = table
        .columns
        .iter()
        .map(|c| escape_field(c, delimiter))
        .collect();
    out.push_str(&header.join(&sep));
    out.push_str(LINE_END);

    let sensors = table.sensor_ids();
    for row in &table.rows {
        // Writing into a String cannot fail
        let _ = write!(out, "{}{sep}{}{sep}{}", row.timestamp, row.lat, row.lon);
        for id in sensors {
            out.push(delimiter);
            if let Some(v) = row.values.get(id) {
                let _ = write!(out, "{v}");
            }
        }
        out.push_str(LINE_END);
    }

    out
}

/// Quote a field when it contains the delimiter, a quote or a line break.
pub fn escape_field(field: &str, delimiter: char) -> String {
    let needs_quotes = field
        .chars()
        .any(|c| c == delimiter || c == '"' || c == '\r' || c == '\n');
    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleRow;

    fn table() -> SampleTable {
        let mut table = SampleTable::default();
        table.columns.push("A".to_string());
        table.columns.push("B".to_string());

        let mut first = SampleRow::new(5000, -23.5, -46.25);
        first.values.insert("A".to_string(), 10.0);
        first.values.insert("B".to_string(), 0.125);
        let mut second = SampleRow::new(5500, -23.5, -46.25);
        second.values.insert("A".to_string(), 20.0);

        table.rows = vec![first, second];
        table
    }

    #[test]
    fn test_render_with_sparse_cells() {
        let text = to_delimited(&table(), ',');
        let lines: Vec<&str> = text.split("\r\n").collect();

        assert_eq!(lines[0], "timestamp,lat,lon,A,B");
        assert_eq!(lines[1], "5000,-23.5,-46.25,10,0.125");
        assert_eq!(lines[2], "5500,-23.5,-46.25,20,");
        assert_eq!(lines[3], "");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_render_empty_table_is_header_only() {
        let text = to_delimited(&SampleTable::default(), ';');
        assert_eq!(text, "timestamp;lat;lon\r\n");
    }

    #[test]
    fn test_header_quotes_awkward_sensor_ids() {
        let mut t = SampleTable::default();
        t.columns.push("temp,probe".to_string());
        t.columns.push("say \"hi\"".to_string());
        let text = to_delimited(&t, ',');
        assert_eq!(text, "timestamp,lat,lon,\"temp,probe\",\"say \"\"hi\"\"\"\r\n");
    }

    #[test]
    fn test_escape_field_passthrough() {
        assert_eq!(escape_field("plain", ','), "plain");
        assert_eq!(escape_field("a;b", ','), "a;b");
        assert_eq!(escape_field("a;b", ';'), "\"a;b\"");
    }
}
