use regis_types::{LabelSelector, Resource};

/// Keep the resources whose labels satisfy `selector`, preserving order.
pub fn filter_by_selector<K, L>(items: Vec<K>, selector: &L) -> Vec<K>
where
    K: Resource,
    L: LabelSelector + ?Sized,
{
    items
        .into_iter()
        .filter(|item| selector.matches(item.labels()))
        .collect()
}
