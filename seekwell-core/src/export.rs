//! CSV rendering and export of search results.
//!
//! Three report shapes, two delimiters: the file-search report is
//! semicolon-separated (spreadsheet imports on the plant floor expect it
//! that way), the two database reports are comma-separated. All values use
//! doubled-quote escaping and files are written UTF-8 with one header row.
//! A declined save prompt or a failed write is reported on the progress
//! channel and never fails the run.

use crate::models::{ColumnNameResult, FileMatch, KeywordDataResult};
use crate::progress::{ProgressSink, ResultSink};

/// Escapes a value for a double-quoted CSV field (`"` becomes `""`).
pub fn escape_csv_value(value: &str) -> String {
    value.replace('"', "\"\"")
}

/// Renders the file-search report: `"File";"Line";"Keyword";"Text"`.
pub fn render_file_results(results: &[FileMatch]) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push("\"File\";\"Line\";\"Keyword\";\"Text\"".to_string());
    for result in results {
        lines.push(format!(
            "\"{}\";{};\"{}\";\"{}\"",
            escape_csv_value(&result.path),
            result.line,
            escape_csv_value(&result.keyword),
            escape_csv_value(&result.text)
        ));
    }
    join_lines(lines)
}

/// Renders the keyword-data report:
/// `Keyword,Database,Schema,Table,RowIdentifier,MatchedColumnsWithValuePreview`.
pub fn render_keyword_results(results: &[KeywordDataResult]) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push(
        "\"Keyword\",\"Database\",\"Schema\",\"Table\",\"RowIdentifier\",\
         \"MatchedColumnsWithValuePreview\""
            .to_string(),
    );
    for result in results {
        lines.push(format!(
            "\"{}\",\"{}\",\"{}\",\"{}\",\"{}\",\"{}\"",
            escape_csv_value(&result.keyword),
            escape_csv_value(&result.database),
            escape_csv_value(&result.schema),
            escape_csv_value(&result.table),
            escape_csv_value(&result.row_identifier),
            escape_csv_value(&result.matched_preview)
        ));
    }
    join_lines(lines)
}

/// Renders the column-name report:
/// `SearchedColumnName,FoundColumnName,DatabaseName,SchemaName,TableName,ColumnDataType`.
pub fn render_column_results(results: &[ColumnNameResult]) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);
    lines.push(
        "\"SearchedColumnName\",\"FoundColumnName\",\"DatabaseName\",\"SchemaName\",\
         \"TableName\",\"ColumnDataType\""
            .to_string(),
    );
    for result in results {
        lines.push(format!(
            "\"{}\",\"{}\",\"{}\",\"{}\",\"{}\",\"{}\"",
            escape_csv_value(&result.searched),
            escape_csv_value(&result.found),
            escape_csv_value(&result.database),
            escape_csv_value(&result.schema),
            escape_csv_value(&result.table),
            escape_csv_value(&result.data_type)
        ));
    }
    join_lines(lines)
}

fn join_lines(lines: Vec<String>) -> String {
    let mut content = lines.join("\n");
    content.push('\n');
    content
}

/// Builds the default export filename: prefix, target address with dots
/// replaced by underscores, and a `%Y%m%d%H%M%S` timestamp.
pub fn default_file_name(prefix: &str, address: Option<&str>) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    match address {
        Some(address) => {
            let address = address.replace('.', "_");
            format!("{prefix}_{address}_{timestamp}.csv")
        }
        None => format!("{prefix}_{timestamp}.csv"),
    }
}

/// Prompts the sink for a destination and writes `content` there.
///
/// `None` from the sink means the user cancelled the prompt — reported as
/// informational. Write failures are warnings; neither outcome is an error.
pub fn save_report(
    content: &str,
    default_name: &str,
    sink: &dyn ResultSink,
    progress: &dyn ProgressSink,
) {
    let Some(path) = sink.save_path(default_name) else {
        progress.report("[i] File save cancelled by user.");
        return;
    };
    match std::fs::write(&path, content) {
        Ok(()) => progress.report(&format!("[*] Results saved to: {}", path.display())),
        Err(error) => progress.report(&format!("[!] Failed to write CSV file: {error}")),
    }
}
