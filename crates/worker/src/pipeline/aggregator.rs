//! Signal aggregation: engagement events to a score tally

use doodling_domain::{EngagementKind, Scope, ScoreTally, TimeWindow};
use doodling_infrastructure::EngagementRepository;
use std::sync::Arc;
use tracing::debug;

use crate::error::JobResult;

/// Builds a fresh tally for one scope and window on every call
pub struct SignalAggregator {
    events: Arc<dyn EngagementRepository>,
    view_fetch_limit: usize,
}

impl SignalAggregator {
    pub fn new(events: Arc<dyn EngagementRepository>, view_fetch_limit: usize) -> Self {
        Self {
            events,
            view_fetch_limit,
        }
    }

    /// Score every item viewed inside `window` within `scope`.
    ///
    /// Each view adds one point. Comments and likes add one point each but
    /// only for items that already have a view in the window; they are
    /// counted over all time.
    pub async fn aggregate(&self, scope: Scope, window: TimeWindow) -> JobResult<ScoreTally> {
        let views = self
            .events
            .recent_views(scope, window, self.view_fetch_limit)
            .await?;

        let mut tally = ScoreTally::new();
        for view in views.iter().filter(|v| scope.matches(v)) {
            tally.record(view.content_id);
        }

        if tally.is_empty() {
            debug!(scope = %scope, "No views in window");
            return Ok(tally);
        }

        let candidates = tally.content_ids();
        for kind in EngagementKind::amplifiers() {
            let counts = self.events.count_for_content(kind, &candidates).await?;
            for (content_id, signals) in counts {
                tally.amplify(content_id, signals);
            }
        }

        debug!(
            scope = %scope,
            views = views.len(),
            items = tally.len(),
            total = tally.total(),
            "Signals aggregated"
        );
        Ok(tally)
    }
}
