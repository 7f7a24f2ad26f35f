//! Property tests for backwards cursor paging.

#![allow(clippy::unwrap_used, clippy::panic)]

use proptest::prelude::*;
use rtcchat_core::{NewMessage, PageRequest, Store};
use std::collections::BTreeSet;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Following `end_cursor` until `has_previous_page` is false visits every
    /// message exactly once, newest page first.
    #[test]
    fn paging_visits_every_message_once(
        times in prop::collection::btree_set(1_600_000_000_000i64..1_700_000_000_000i64, 0..60),
        page_size in 1i64..15,
    ) {
        let store = Store::open_in_memory().unwrap();
        let a = store.create_user("a", "h", None).unwrap();
        let b = store.create_user("b", "h", None).unwrap();
        let connection = store.create_connection(a.id, b.id).unwrap();

        // Insert out of time order; ids and times are unrelated.
        for time in times.iter().rev() {
            store.create_message(NewMessage {
                text: Some(time.to_string()),
                img: None,
                time: *time,
                connection_id: connection.id,
                sender: a.id,
                receiver: Some(b.id),
            }).unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let request = PageRequest::from_args(Some(page_size), cursor.as_deref()).unwrap();
            let page = store.message_page(connection.id, request, 1_700_000_000_000).unwrap();
            prop_assert_eq!(page.total_count, times.len());
            prop_assert!(page.edges.len() <= page_size as usize);

            let page_times: Vec<i64> = page.messages().map(|m| m.time).collect();
            prop_assert!(page_times.windows(2).all(|w| w[0] < w[1]));
            if let Some(&newest_here) = page_times.last() {
                if let Some(&oldest_before) = seen.first() {
                    prop_assert!(newest_here < oldest_before);
                }
            }
            for (i, t) in page_times.iter().enumerate() {
                seen.insert(i, *t);
            }

            if !page.page_info.has_previous_page {
                break;
            }
            cursor = page.page_info.end_cursor.clone();
        }

        let expected: Vec<i64> = times.iter().copied().collect();
        prop_assert_eq!(seen.clone(), expected);
        prop_assert_eq!(seen.iter().collect::<BTreeSet<_>>().len(), times.len());
    }
}
