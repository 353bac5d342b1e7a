use crate::models::{Event, EventsResponse};

/// Observable state of one fetcher: `{ data, loading, error }`.
///
/// `data` and `error` may both be set (stale data plus an error banner);
/// only an error with no data at all is a blocking error.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for FetchState<T> {
    /// A fetcher starts out loading, with nothing to show yet.
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
        }
    }
}

impl<T> FetchState<T> {
    pub fn ready(data: T) -> Self {
        Self {
            data: Some(data),
            loading: false,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: None,
            loading: false,
            error: Some(message.into()),
        }
    }

    pub fn is_blocking_error(&self) -> bool {
        self.error.is_some() && self.data.is_none()
    }
}

/// State of the paginated event fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedFetchState<T> {
    /// Every item loaded so far, in page order
    pub data: Option<Vec<T>>,
    pub loading: bool,
    pub error: Option<String>,
    pub has_next_page: bool,
    pub current_page: u32,
    pub total_pages: u32,
}

impl<T> Default for PaginatedFetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: true,
            error: None,
            has_next_page: false,
            current_page: 1,
            total_pages: 1,
        }
    }
}

impl<T> PaginatedFetchState<T> {
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_blocking_error(&self) -> bool {
        self.error.is_some() && self.data.is_none()
    }
}

impl PaginatedFetchState<Event> {
    /// Replace everything with the first page of a fresh walk.
    pub(crate) fn from_response(response: EventsResponse) -> Self {
        let has_next_page = response.has_next_page();
        Self {
            data: Some(response.events),
            loading: false,
            error: None,
            has_next_page,
            current_page: response.current_page,
            total_pages: response.total_pages,
        }
    }

    /// Append a further page onto the accumulated list.
    pub(crate) fn append(&mut self, response: EventsResponse) {
        self.has_next_page = response.has_next_page();
        self.current_page = response.current_page;
        self.total_pages = response.total_pages;
        self.data.get_or_insert_with(Vec::new).extend(response.events);
        self.loading = false;
        self.error = None;
    }
}
