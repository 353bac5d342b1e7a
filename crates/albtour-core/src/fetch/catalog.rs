//! Ready-made fetchers for every screen, bound to one client and one cache.

use crate::api::ApiClient;
use crate::cache::CacheStore;
use crate::models::{
    Beach, BeachesQuery, Category, DetailedBeach, Event, EventsQuery, ExchangeRates,
    FilteredEventsQuery, IdQuery, Municipality,
};

use super::{producer, DailyEventsFetcher, EventPager, Fetcher};

/// Builds fetchers that share a client and the process-wide cache.
///
/// Cheap to clone; both halves are reference-counted handles.
#[derive(Clone)]
pub struct Catalog {
    api: ApiClient,
    store: CacheStore,
}

impl Catalog {
    pub fn new(api: ApiClient, store: CacheStore) -> Self {
        Self { api, store }
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    // ===== Events =====

    pub fn events(&self, query: EventsQuery) -> EventPager {
        let api = self.api.clone();
        EventPager::new(
            self.store.clone(),
            query,
            producer(move |q: EventsQuery| {
                let api = api.clone();
                async move { api.fetch_events(&q).await }
            }),
        )
    }

    pub fn events_by_category(&self, category_id: i64) -> EventPager {
        self.events(EventsQuery::by_category(category_id))
    }

    pub fn events_by_municipality(&self, municipality_id: i64) -> EventPager {
        self.events(EventsQuery::by_municipality(municipality_id))
    }

    pub fn filtered_events(&self, query: FilteredEventsQuery) -> Fetcher<FilteredEventsQuery, Vec<Event>> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            query,
            producer(move |q: FilteredEventsQuery| {
                let api = api.clone();
                async move { api.fetch_filtered_events(&q).await }
            }),
        )
        .cached("filtered-events")
    }

    pub fn event(&self, id: i64) -> Fetcher<IdQuery, Event> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            IdQuery { id },
            producer(move |q: IdQuery| {
                let api = api.clone();
                async move { api.fetch_event(q.id).await }
            }),
        )
        .cached("event")
    }

    /// Every event, walked once per day and ranked by municipality
    pub fn daily_events(&self) -> DailyEventsFetcher {
        let api = self.api.clone();
        DailyEventsFetcher::new(
            self.store.clone(),
            producer(move |page: u32| {
                let api = api.clone();
                async move { api.fetch_events(&EventsQuery::default().with_page(page)).await }
            }),
        )
    }

    // ===== Reference data =====

    pub fn categories(&self) -> Fetcher<(), Vec<Category>> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            (),
            producer(move |_: ()| {
                let api = api.clone();
                async move { api.fetch_categories().await }
            }),
        )
        .cached("categories")
    }

    pub fn category(&self, id: i64) -> Fetcher<IdQuery, Category> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            IdQuery { id },
            producer(move |q: IdQuery| {
                let api = api.clone();
                async move { api.fetch_category(q.id).await }
            }),
        )
    }

    pub fn municipalities(&self) -> Fetcher<(), Vec<Municipality>> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            (),
            producer(move |_: ()| {
                let api = api.clone();
                async move { api.fetch_municipalities().await }
            }),
        )
        .cached("municipalities")
    }

    pub fn municipality(&self, id: i64) -> Fetcher<IdQuery, Municipality> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            IdQuery { id },
            producer(move |q: IdQuery| {
                let api = api.clone();
                async move { api.fetch_municipality(q.id).await }
            }),
        )
    }

    // ===== Beaches =====

    pub fn beaches(&self, query: BeachesQuery) -> Fetcher<BeachesQuery, Vec<Beach>> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            query,
            producer(move |q: BeachesQuery| {
                let api = api.clone();
                async move { api.fetch_beaches(&q).await }
            }),
        )
        .cached("beaches")
    }

    pub fn beach(&self, id: i64) -> Fetcher<IdQuery, DetailedBeach> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            IdQuery { id },
            producer(move |q: IdQuery| {
                let api = api.clone();
                async move { api.fetch_beach(q.id).await }
            }),
        )
    }

    // ===== Exchange rates =====

    pub fn exchange_rates(&self) -> Fetcher<(), ExchangeRates> {
        let api = self.api.clone();
        Fetcher::new(
            self.store.clone(),
            (),
            producer(move |_: ()| {
                let api = api.clone();
                async move { api.fetch_exchange_rates().await }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn catalog() -> Catalog {
        let api = ApiClient::new(&Config::default()).expect("client builds");
        Catalog::new(api, CacheStore::new())
    }

    #[test]
    fn test_cache_keys_per_fetcher() {
        let catalog = catalog();
        assert_eq!(catalog.categories().cache_key().as_deref(), Some("categories"));
        assert_eq!(
            catalog.municipalities().cache_key().as_deref(),
            Some("municipalities")
        );
        assert_eq!(
            catalog.event(12).cache_key().as_deref(),
            Some(r#"event:{"id":12}"#)
        );
        assert_eq!(
            catalog.beaches(BeachesQuery::by_municipality(3)).cache_key().as_deref(),
            Some(r#"beaches:{"municipality_id":3}"#)
        );
        assert_eq!(
            catalog.filtered_events(FilteredEventsQuery::default()).cache_key().as_deref(),
            Some("filtered-events:{}")
        );
    }

    #[test]
    fn test_detail_fetchers_are_uncached() {
        let catalog = catalog();
        assert!(catalog.category(1).cache_key().is_none());
        assert!(catalog.municipality(1).cache_key().is_none());
        assert!(catalog.beach(1).cache_key().is_none());
        assert!(catalog.exchange_rates().cache_key().is_none());
    }

    #[test]
    fn test_pager_params_drop_page() {
        let catalog = catalog();
        let pager = catalog.events(EventsQuery::by_category(5).with_page(3));
        assert_eq!(pager.params(), EventsQuery::by_category(5));
    }
}
