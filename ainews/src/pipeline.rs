use std::sync::Arc;
use tracing::{error, info, warn};

use crate::collectors::Collector;
use crate::enrichment::Enricher;
use crate::item::NewsItem;
use crate::ranking::rank;

/// collect → enrich → rank, run once.
pub struct Pipeline {
    collectors: Vec<Arc<dyn Collector>>,
    /// `None` skips the LLM stage (dry run)
    enricher: Option<Enricher>,
}

impl Pipeline {
    pub fn new(enricher: Enricher) -> Self {
        Self {
            collectors: Vec::new(),
            enricher: Some(enricher),
        }
    }

    pub fn without_enrichment() -> Self {
        Self {
            collectors: Vec::new(),
            enricher: None,
        }
    }

    pub fn with_collector<C: Collector + 'static>(mut self, collector: C) -> Self {
        self.collectors.push(Arc::new(collector));
        self
    }

    pub fn collector_count(&self) -> usize {
        self.collectors.len()
    }

    /// Run every collector in its own task and concatenate the results in
    /// registration order. A failing or panicking collector adds nothing.
    pub async fn collect(&self) -> Vec<NewsItem> {
        let handles: Vec<_> = self
            .collectors
            .iter()
            .map(|collector| {
                let name = collector.name().to_string();
                let collector = collector.clone();
                let handle = tokio::spawn(async move {
                    let limit = collector.limit();
                    collector.collect(limit).await
                });
                (name, handle)
            })
            .collect();

        let mut items = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(batch)) => {
                    info!("pipeline: {} contributed {} items", name, batch.len());
                    items.extend(batch);
                }
                Ok(Err(e)) => error!("pipeline: collector {} failed: {:#}", name, e),
                Err(e) => error!("pipeline: collector {} aborted: {}", name, e),
            }
        }
        items
    }

    /// Full run. An empty result means no source produced anything.
    pub async fn run(&self) -> Vec<NewsItem> {
        let items = self.collect().await;
        if items.is_empty() {
            warn!("pipeline: no items collected from any source");
            return items;
        }
        info!("pipeline: {} raw items collected", items.len());

        let items = match &self.enricher {
            Some(enricher) => enricher.enrich_batch(items).await,
            None => items,
        };
        rank(items)
    }
}
