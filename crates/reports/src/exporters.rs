//! Report exporters - CSV, JSON, Markdown
//!
//! Exporters only see the [`ReportData`] view of a report, so every report
//! type in this crate renders in every format.

/// Trait for exporting reports to different formats
pub trait ReportExporter {
    /// Export to the target format
    fn export(&self, report: &dyn ReportData) -> String;

    /// Get the file extension for this format
    fn extension(&self) -> &'static str;

    /// Get the MIME type for this format
    fn mime_type(&self) -> &'static str;
}

/// Trait for data that can be exported
pub trait ReportData {
    /// Get the report title
    fn title(&self) -> &str;

    /// Get column headers
    fn headers(&self) -> Vec<String>;

    /// Get data rows
    fn rows(&self) -> Vec<Vec<String>>;

    /// Get summary statistics as key-value pairs
    fn summary(&self) -> Vec<(String, String)>;
}

/// Exporter for a format name as given on the command line
pub fn exporter_for(format: &str) -> Option<Box<dyn ReportExporter>> {
    match format.to_ascii_lowercase().as_str() {
        "csv" => Some(Box::new(CsvExporter::new())),
        "json" => Some(Box::new(JsonExporter::new())),
        "md" | "markdown" => Some(Box::new(MarkdownExporter::new())),
        _ => None,
    }
}

// ============================================================================
// CSV Exporter
// ============================================================================

/// CSV format exporter
pub struct CsvExporter {
    delimiter: char,
    include_header: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `;` is what spreadsheet tools expect in pt-BR locales
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    fn escape_field(&self, field: &str) -> String {
        if field.contains(self.delimiter)
            || field.contains('"')
            || field.contains('\n')
            || field.contains('\r')
        {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn write_line(&self, output: &mut String, fields: &[String]) {
        let escaped: Vec<String> = fields.iter().map(|f| self.escape_field(f)).collect();
        output.push_str(&escaped.join(&self.delimiter.to_string()));
        output.push('\n');
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();

        if self.include_header {
            self.write_line(&mut output, &report.headers());
        }
        for row in report.rows() {
            self.write_line(&mut output, &row);
        }

        output
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}

// ============================================================================
// JSON Exporter
// ============================================================================

/// JSON format exporter
pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let headers = report.headers();

        let data: Vec<serde_json::Value> = report
            .rows()
            .into_iter()
            .map(|row| {
                let mut obj = serde_json::Map::new();
                for (i, header) in headers.iter().enumerate() {
                    let value = row.get(i).cloned().unwrap_or_default();
                    obj.insert(header.clone(), serde_json::Value::String(value));
                }
                serde_json::Value::Object(obj)
            })
            .collect();

        let summary: serde_json::Map<String, serde_json::Value> = report
            .summary()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        let output = serde_json::json!({
            "title": report.title(),
            "summary": summary,
            "data": data,
        });

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        };
        rendered.unwrap_or_default()
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

// ============================================================================
// Markdown Exporter
// ============================================================================

/// Markdown format exporter
pub struct MarkdownExporter {
    include_summary: bool,
    include_toc: bool,
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_toc: false,
        }
    }
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_summary(mut self) -> Self {
        self.include_summary = false;
        self
    }

    pub fn with_toc(mut self) -> Self {
        self.include_toc = true;
        self
    }
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

fn table_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
    format!("| {} |\n", cells.join(" | "))
}

impl ReportExporter for MarkdownExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = format!("# {}\n\n", report.title());

        if self.include_toc {
            output.push_str("## Table of Contents\n\n");
            if self.include_summary {
                output.push_str("- [Summary](#summary)\n");
            }
            output.push_str("- [Data](#data)\n\n");
        }

        if self.include_summary {
            output.push_str("## Summary\n\n");
            for (key, value) in report.summary() {
                output.push_str(&format!("- **{}**: {}\n", key, value));
            }
            output.push('\n');
        }

        output.push_str("## Data\n\n");

        let headers = report.headers();
        if !headers.is_empty() {
            output.push_str(&table_row(&headers));
            output.push_str(&table_row(&vec!["---".to_string(); headers.len()]));
            let rows = report.rows();
            if rows.is_empty() {
                output.push_str("\n_No data._\n");
            }
            for row in rows {
                output.push_str(&table_row(&row));
            }
        }

        output
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn mime_type(&self) -> &'static str {
        "text/markdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        rows: Vec<Vec<String>>,
    }

    impl ReportData for Sample {
        fn title(&self) -> &str {
            "Depósitos"
        }

        fn headers(&self) -> Vec<String> {
            vec!["ID".into(), "Amount".into(), "Description".into()]
        }

        fn rows(&self) -> Vec<Vec<String>> {
            self.rows.clone()
        }

        fn summary(&self) -> Vec<(String, String)> {
            vec![("Total".into(), "R$ 150,00".into())]
        }
    }

    fn sample() -> Sample {
        Sample {
            rows: vec![
                vec!["tx-1".into(), "100.00".into(), "Depósito via pix".into()],
                vec!["tx-2".into(), "50.00".into(), "Depósito via crypto".into()],
            ],
        }
    }

    #[test]
    fn test_csv_exporter() {
        let exporter = CsvExporter::new();
        let output = exporter.export(&sample());

        assert!(output.starts_with("ID,Amount,Description\n"));
        assert!(output.contains("tx-1,100.00,Depósito via pix"));
        assert_eq!(output.lines().count(), 3);
        assert_eq!(exporter.extension(), "csv");
    }

    #[test]
    fn test_csv_escaping_and_delimiter() {
        let report = Sample {
            rows: vec![vec!["tx-1".into(), "10.00".into(), "Bônus: \"VIP\"; R$ 10,00".into()]],
        };

        let output = CsvExporter::new().export(&report);
        assert!(output.contains("\"Bônus: \"\"VIP\"\"; R$ 10,00\""));

        let output = CsvExporter::new().with_delimiter(';').without_header().export(&report);
        assert!(output.starts_with("tx-1;10.00;\"Bônus"));
    }

    #[test]
    fn test_json_exporter() {
        let output = JsonExporter::new().export(&sample());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["title"], "Depósitos");
        assert_eq!(value["summary"]["Total"], "R$ 150,00");
        assert_eq!(value["data"][1]["ID"], "tx-2");
        assert_eq!(value["data"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_json_compact() {
        let output = JsonExporter::new().compact().export(&sample());
        assert!(!output.contains('\n'));
    }

    #[test]
    fn test_markdown_exporter() {
        let exporter = MarkdownExporter::new().with_toc();
        let output = exporter.export(&sample());

        assert!(output.contains("# Depósitos"));
        assert!(output.contains("- [Summary](#summary)"));
        assert!(output.contains("- **Total**: R$ 150,00"));
        assert!(output.contains("| ID | Amount | Description |"));
        assert!(output.contains("| --- | --- | --- |"));
        assert!(output.contains("| tx-2 | 50.00 | Depósito via crypto |"));
        assert_eq!(exporter.mime_type(), "text/markdown");
    }

    #[test]
    fn test_markdown_escapes_pipes_and_marks_empty() {
        let report = Sample {
            rows: vec![vec!["a|b".into(), "1".into(), "x".into()]],
        };
        let output = MarkdownExporter::new().without_summary().export(&report);
        assert!(output.contains("| a\\|b | 1 | x |"));
        assert!(!output.contains("## Summary"));

        let empty = Sample { rows: Vec::new() };
        assert!(MarkdownExporter::new().export(&empty).contains("_No data._"));
    }

    #[test]
    fn test_exporter_for() {
        assert_eq!(exporter_for("CSV").map(|e| e.extension()), Some("csv"));
        assert_eq!(exporter_for("markdown").map(|e| e.extension()), Some("md"));
        assert!(exporter_for("xml").is_none());
    }
}
