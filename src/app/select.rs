use crate::openapi::{ApiDocument, Operation};

/// Server URL for the run: the `--server` override, else the document's
/// first declared server.
pub(crate) fn base_url(document: &ApiDocument, override_url: Option<&str>) -> String {
    if let Some(url) = override_url.map(str::trim).filter(|url| !url.is_empty()) {
        return url.to_owned();
    }
    document
        .server_urls()
        .into_iter()
        .next()
        .unwrap_or_else(|| "http://localhost".to_owned())
}

/// Keeps operations whose path or operation id contains `filter` and that
/// carry at least one of `tags`. An empty filter or tag list keeps everything.
pub(crate) fn select_operations(
    operations: Vec<Operation>,
    filter: Option<&str>,
    tags: &[String],
) -> Vec<Operation> {
    let filter = filter.filter(|text| !text.is_empty());
    operations
        .into_iter()
        .filter(|operation| {
            filter.is_none_or(|text| {
                operation.path.contains(text) || operation.operation_id.contains(text)
            })
        })
        .filter(|operation| {
            tags.is_empty() || operation.tags.iter().any(|tag| tags.contains(tag))
        })
        .collect()
}
