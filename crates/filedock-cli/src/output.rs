use filedock_core::domain::FileDescriptor;
use serde::Serialize;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable output formatter with checkmarks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

// ============================================================================
// File sizes and listing statistics
// ============================================================================

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Formats a byte count with 1024-based units and at most two decimals,
/// e.g. `1536` -> `"1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// Summary shown under `filedock list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub average_size: f64,
    /// Number of distinct extensions
    pub file_types: usize,
    /// Most frequent extension, upper-cased; `N/A` for an empty listing
    pub most_common_type: String,
    pub most_common_count: usize,
}

impl FileStatistics {
    pub fn from_files(files: &[FileDescriptor]) -> Self {
        let total_size: u64 = files.iter().map(|f| f.size).sum();
        let average_size = if files.is_empty() {
            0.0
        } else {
            total_size as f64 / files.len() as f64
        };

        // Insertion order decides ties, first seen wins.
        let mut counts: Vec<(String, usize)> = Vec::new();
        for file in files {
            let ext = extension_key(file.name.as_str());
            match counts.iter_mut().find(|(e, _)| *e == ext) {
                Some((_, count)) => *count += 1,
                None => counts.push((ext, 1)),
            }
        }

        let mut most_common: Option<(&str, usize)> = None;
        for (ext, count) in &counts {
            if most_common.map_or(true, |(_, best)| *count > best) {
                most_common = Some((ext.as_str(), *count));
            }
        }

        let (most_common_type, most_common_count) = match most_common {
            Some((ext, count)) if !ext.is_empty() => (ext.to_uppercase(), count),
            Some((_, count)) => ("N/A".to_string(), count),
            None => ("N/A".to_string(), 0),
        };

        Self {
            total_files: files.len(),
            total_size,
            average_size,
            file_types: counts.len(),
            most_common_type,
            most_common_count,
        }
    }
}

/// Text after the last `.`, or the whole name when there is none, lower-cased.
fn extension_key(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}
