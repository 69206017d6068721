use std::path::Path;

/// Folder-safe form of a document type: lowercase words joined by `_`.
///
/// Only alphanumerics, `_` and `-` survive, so the result can never name a
/// parent directory or contain a separator.
pub fn sanitize_document_type(document_type: &str) -> String {
    document_type
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Serial number reduced to its alphanumeric characters.
pub fn sanitize_serial(serial_number: &str) -> String {
    serial_number.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// `<type>_<serial>[.<ext>]`, extension copied from the source file.
pub fn sorted_file_name(sanitized_type: &str, sanitized_serial: &str, source: &Path) -> String {
    let stem = format!("{sanitized_type}_{sanitized_serial}");
    match source.extension() {
        Some(ext) => format!("{stem}.{}", ext.to_string_lossy()),
        None => stem,
    }
}

/// `name` with `_<n>` inserted before the extension (`a.jpg` -> `a_2.jpg`).
pub fn suffixed_file_name(name: &str, n: usize) -> String {
    let path = Path::new(name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}_{n}.{}",
            stem.to_string_lossy(),
            ext.to_string_lossy()
        ),
        _ => format!("{name}_{n}"),
    }
}
