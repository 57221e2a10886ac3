//! Stream helpers.

use futures_util::future;
use futures_util::{Stream, StreamExt};

/// Drop items equal to the one emitted just before them.
pub fn distinct_until_changed<S, T>(stream: S) -> impl Stream<Item = T>
where
    S: Stream<Item = T>,
    T: Clone + PartialEq,
{
    let mut last: Option<T> = None;
    stream.filter_map(move |item| {
        let changed = last.as_ref() != Some(&item);
        if changed {
            last = Some(item.clone());
        }
        future::ready(changed.then_some(item))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn consecutive_duplicates_are_dropped() {
        let items = stream::iter(vec![1, 1, 2, 2, 2, 1, 3, 3]);
        let distinct: Vec<i32> = distinct_until_changed(items).collect().await;
        assert_eq!(distinct, vec![1, 2, 1, 3]);
    }

    #[tokio::test]
    async fn empty_stream_stays_empty() {
        let items = stream::iter(Vec::<u8>::new());
        let distinct: Vec<u8> = distinct_until_changed(items).collect().await;
        assert!(distinct.is_empty());
    }
}
