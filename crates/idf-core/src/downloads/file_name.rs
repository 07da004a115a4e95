const FILENAME_IDENTIFIER: &str = "filename=";
const FALLBACK_FILE_NAME: &str = "download";

/// Extracts the `filename=` parameter of a `Content-Disposition` header.
///
/// Quotes and any following parameters are dropped and only the final path
/// component is kept, so the name can never point outside the download directory.
pub fn file_name_from_disposition(disposition: &str) -> Option<String> {
    let index = disposition.find(FILENAME_IDENTIFIER)?;
    let value = &disposition[index + FILENAME_IDENTIFIER.len()..];

    let value = match value.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().unwrap_or_default(),
        None => value.split(';').next().unwrap_or_default(),
    };

    last_segment(value.trim())
}

/// Last path segment of `url`, ignoring the query string and fragment.
pub fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    last_segment(path).unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

fn last_segment(value: &str) -> Option<String> {
    value
        .rsplit(['/', '\\'])
        .next()
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(ToString::to_string)
}
