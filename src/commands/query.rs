//! Search command implementation

use crate::config::Config;
use crate::error::Result;
use crate::search::{SearchEngine, SearchRequest, SearchResponse};
use crate::store::{MetadataStore, PostingStore};
use tracing::info;

/// Execute a search
pub async fn cmd_search<S>(
    config: &Config,
    store: &S,
    request: &SearchRequest,
) -> Result<SearchResponse>
where
    S: MetadataStore + PostingStore,
{
    info!(
        "Searching: {}",
        request.phrase.as_deref().unwrap_or("<all documents>")
    );
    SearchEngine::from_config(config, store).search(request).await
}

/// Print search results to console
pub fn print_search_results(response: &SearchResponse) {
    if response.hits.is_empty() {
        println!("\nNo documents found.");
        if !response.keywords.is_empty() {
            println!("Keywords searched: {}", response.keywords.join(", "));
        }
        return;
    }

    let first = response.offset + 1;
    let last = response.offset + response.hits.len();
    println!(
        "\n🔍 Showing {}-{} of {} documents\n",
        first, last, response.total
    );

    for (i, hit) in response.hits.iter().enumerate() {
        println!("{}. {}", response.offset + i + 1, hit.title);
        println!("   {}", hit.link);

        let facets: Vec<String> = [
            hit.subject.as_deref().map(|s| format!("subject: {}", s)),
            hit.format.as_deref().map(|f| format!("format: {}", f)),
            hit.source.as_deref().map(|s| format!("source: {}", s)),
            hit.year.map(|y| format!("year: {}", y)),
            hit.location.as_deref().map(|l| format!("location: {}", l)),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !facets.is_empty() {
            println!("   {}", facets.join(" | "));
        }

        if !hit.matched_keywords.is_empty() {
            println!("   Matched: {}", hit.matched_keywords.join(", "));
        }

        if let Some(summary) = &hit.summary {
            let preview: String = summary.chars().take(200).collect();
            let ellipsis = if summary.chars().count() > 200 { "..." } else { "" };
            println!("   {}{}", preview.replace('\n', " "), ellipsis);
        }
        println!();
    }
}
