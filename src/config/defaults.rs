//! Default values for configuration

/// Upper bound on postings removed per store batch call
pub const MAX_DELETE_BATCH: usize = 25;

/// Default number of postings deleted per batch
pub fn default_delete_batch_size() -> usize {
    MAX_DELETE_BATCH
}

/// Default number of posting writes in flight during one ingestion
pub fn default_write_concurrency() -> usize {
    8
}

/// Default minimum keyword length kept by the extractor
pub fn default_min_keyword_len() -> usize {
    2
}

/// Default page size used when draining store listings
pub fn default_page_size() -> usize {
    100
}

/// Default number of posting-list fetches in flight during one query
pub fn default_fetch_concurrency() -> usize {
    4
}

/// Default provenance container (empty = parent directory of the uploaded file)
pub fn default_container() -> String {
    String::new()
}
