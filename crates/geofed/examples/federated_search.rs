//! Federated search over the sample datasets
//!
//! This example demonstrates the coordinator workflow:
//! - Spawning a coordinator over a source registry and an in-memory fetcher
//! - Type-ahead suggestions after the debounce
//! - A full search, an exact (quoted) search and a search restricted by the URL hash

use std::sync::Arc;

use geofed::{CoordinatorConfigBuilder, CoordinatorDeps, SearchCoordinator, SearchEvent};
use geofed_sources::test_data;
use tokio::sync::broadcast;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    geofed::init_logging(tracing::Level::INFO)?;

    let deps = CoordinatorDeps::new(
        test_data::sample_registry(),
        Arc::new(test_data::sample_fetcher()),
    );
    let config = CoordinatorConfigBuilder::responsive().build();
    let coordinator = SearchCoordinator::spawn(deps, config)?;
    let mut events = coordinator.subscribe();

    // Typing: suggestions arrive once the user pauses
    println!("Typing 'main':");
    coordinator.set_phrase("main")?;
    wait_for_suggestions(&mut events).await?;

    // Full search
    println!("\nSearching for 'ma':");
    coordinator.submit_search("ma", None)?;
    wait_for_results(&mut events).await?;

    // Quoted phrases only match whole values
    println!("\nSearching for '\"Main Street\"':");
    coordinator.submit_search("\"Main Street\"", None)?;
    wait_for_results(&mut events).await?;

    // State restored from a shared link
    println!("\nApplying '#q=central&s=parks':");
    coordinator.apply_hash("#q=central&s=parks")?;
    wait_for_results(&mut events).await?;

    Ok(())
}

async fn wait_for_suggestions(
    events: &mut broadcast::Receiver<SearchEvent>,
) -> Result<(), broadcast::error::RecvError> {
    loop {
        if let SearchEvent::AutocompleteUpdated(entries) = events.recv().await? {
            for entry in &entries {
                println!("  [{}] {}", entry.dataset, entry.display());
            }
            return Ok(());
        }
    }
}

async fn wait_for_results(
    events: &mut broadcast::Receiver<SearchEvent>,
) -> Result<(), broadcast::error::RecvError> {
    loop {
        if let SearchEvent::ResultsUpdated {
            results,
            highlight_features,
            error_message,
        } = events.recv().await?
        {
            for collection in &results.feature_collections {
                println!("  {} ({}):", collection.source.caption, collection.origin);
                for feature in &collection.features {
                    let title = feature
                        .labels
                        .as_ref()
                        .map_or("", |labels| labels.feature_title.as_str());
                    println!("    - {title}");
                }
            }
            println!("  {} feature(s) on the map", highlight_features.len());
            if let Some(message) = error_message {
                println!("  {message}");
            }
            return Ok(());
        }
    }
}
