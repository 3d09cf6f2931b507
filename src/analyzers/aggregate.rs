use crate::analyzers::types::{
    OpportunityParams, PageAggregate, QueryAggregate, QueryParams, Summary, Table,
};
use crate::analyzers::utility::{mean, ratio};
use std::collections::HashMap;
use tracing::debug;

/// Computes site-level totals over every row of `table`.
///
/// An empty table yields an all-zero [`Summary`]. CTR and position are
/// weighted by impressions and fall back to 0.0 when there are none.
pub fn summarize(table: &Table) -> Summary {
    if table.is_empty() {
        return Summary::default();
    }

    let mut total_clicks = 0.0;
    let mut total_impressions = 0.0;
    let mut position_weight = 0.0;

    for row in table {
        total_clicks += row.clicks;
        total_impressions += row.impressions;
        position_weight += row.position * row.impressions;
    }

    Summary {
        rows: table.len(),
        total_clicks,
        total_impressions,
        weighted_ctr: ratio(total_clicks, total_impressions),
        weighted_position: ratio(position_weight, total_impressions),
    }
}

/// Ranks queries by summed clicks.
///
/// Rows below `min_impressions` are dropped before grouping. Groups are
/// ordered by clicks descending, then impressions descending, then query
/// text ascending, and truncated to `limit`.
pub fn top_queries(table: &Table, params: &QueryParams) -> Vec<QueryAggregate> {
    if params.limit == 0 {
        return Vec::new();
    }

    let mut groups: HashMap<&str, (f64, f64)> = HashMap::new();

    for row in table {
        if row.impressions < params.min_impressions {
            continue;
        }
        let entry = groups.entry(row.query.as_str()).or_default();
        entry.0 += row.clicks;
        entry.1 += row.impressions;
    }

    let mut ranked: Vec<QueryAggregate> = groups
        .into_iter()
        .map(|(query, (clicks, impressions))| QueryAggregate {
            query: query.to_string(),
            clicks,
            impressions,
            ctr: ratio(clicks, impressions),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.clicks
            .total_cmp(&a.clicks)
            .then_with(|| b.impressions.total_cmp(&a.impressions))
            .then_with(|| a.query.cmp(&b.query))
    });
    ranked.truncate(params.limit);

    debug!(returned = ranked.len(), "Ranked queries");
    ranked
}

#[derive(Default)]
struct PageTotals {
    clicks: f64,
    impressions: f64,
    positions: Vec<f64>,
}

/// Finds pages with substantial impressions but a middling average rank.
///
/// Every row contributes to its page's totals and mean position; the
/// impression and position thresholds apply to the grouped values. Results
/// are ordered by impressions descending, then average position ascending,
/// then page ascending, and truncated to `limit`.
pub fn page_opportunities(table: &Table, params: &OpportunityParams) -> Vec<PageAggregate> {
    if params.limit == 0 {
        return Vec::new();
    }

    let mut groups: HashMap<&str, PageTotals> = HashMap::new();

    for row in table {
        let entry = groups.entry(row.page.as_str()).or_default();
        entry.clicks += row.clicks;
        entry.impressions += row.impressions;
        entry.positions.push(row.position);
    }

    let mut ranked: Vec<PageAggregate> = groups
        .into_iter()
        .map(|(page, totals)| PageAggregate {
            page: page.to_string(),
            clicks: totals.clicks,
            impressions: totals.impressions,
            avg_position: mean(&totals.positions),
            ctr: ratio(totals.clicks, totals.impressions),
        })
        .filter(|p| {
            p.impressions >= params.min_impressions
                && p.avg_position >= params.min_position
                && p.avg_position <= params.max_position
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.impressions
            .total_cmp(&a.impressions)
            .then_with(|| a.avg_position.total_cmp(&b.avg_position))
            .then_with(|| a.page.cmp(&b.page))
    });
    ranked.truncate(params.limit);

    debug!(returned = ranked.len(), "Ranked page opportunities");
    ranked
}
