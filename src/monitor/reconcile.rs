use indexmap::IndexMap;
use std::collections::HashMap;

use super::types::{LocalIntent, MergeRequest, MrId, MrRow};

/// Local intent keyed by merge request iid.
pub type IntentMap = HashMap<MrId, LocalIntent>;

/// Carries local intent over to a freshly fetched set of merge requests.
///
/// Every fresh iid keeps its previous intent, or starts from the default when
/// it was not seen before. Intent for iids missing from `fresh` is dropped.
pub fn reconcile_intents<I>(previous: &IntentMap, fresh: I) -> IntentMap
where
    I: IntoIterator<Item = MrId>,
{
    fresh
        .into_iter()
        .map(|iid| (iid, previous.get(&iid).copied().unwrap_or_default()))
        .collect()
}

/// Joins server data with local intent, keeping server order.
pub fn merge_rows(merge_requests: &IndexMap<MrId, MergeRequest>, intents: &IntentMap) -> Vec<MrRow> {
    merge_requests
        .values()
        .map(|merge_request| MrRow {
            merge_request: merge_request.clone(),
            intent: intents.get(&merge_request.iid).copied().unwrap_or_default(),
        })
        .collect()
}
