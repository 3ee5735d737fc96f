use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::api::types::{Post, SearchResponse};
use crate::api::{ApiClientError, LucerneClient};
use crate::channel::{FetchRequest, Retrieval};

/// Percent-encoding set for URL query values (encode everything except unreserved chars).
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

fn encode_query(s: &str) -> String {
    utf8_percent_encode(s, QUERY_ENCODE_SET).to_string()
}

/// Path and query string for a request, relative to the backend root.
pub fn request_path(req: &FetchRequest) -> String {
    let mut params = Vec::new();
    let path = match &req.retrieval {
        Retrieval::HomeTimeline => "/timeline".to_string(),
        Retrieval::Reply { tweet_id } | Retrieval::Conversation { tweet_id } => {
            format!("/conversation/{}", encode_query(tweet_id))
        }
        Retrieval::Search { query } => {
            params.push(format!("query={}", encode_query(query)));
            "/search".to_string()
        }
    };
    if let Some(max) = &req.max {
        params.push(format!("max={}", encode_query(max)));
    }

    if params.is_empty() {
        path
    } else {
        format!("{path}?{}", params.join("&"))
    }
}

impl LucerneClient {
    /// Run a resolved request and apply its client-side filter. Posts come
    /// back in backend order.
    pub async fn fetch_posts(&self, req: &FetchRequest) -> Result<Vec<Post>, ApiClientError> {
        let path = request_path(req);
        let posts = match &req.retrieval {
            Retrieval::Search { .. } => self.get::<SearchResponse>(&path).await?.statuses,
            _ => self.get::<Vec<Post>>(&path).await?,
        };
        let filtered = req.retrieval.filter(posts);
        tracing::debug!(
            mode = %req.retrieval.label(),
            count = filtered.len(),
            "posts fetched"
        );
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;

    #[test]
    fn home_path() {
        let req = Channel::new("home", "home_timeline").request();
        assert_eq!(request_path(&req), "/timeline");
        let older = Channel::new("home", "home_timeline").request_older("123");
        assert_eq!(request_path(&older), "/timeline?max=123");
    }

    #[test]
    fn reply_and_conversation_share_endpoint() {
        assert_eq!(
            request_path(&Channel::adhoc("re:42").request()),
            "/conversation/42"
        );
        assert_eq!(
            request_path(&Channel::adhoc("conv:42").request_older("40")),
            "/conversation/42?max=40"
        );
    }

    #[test]
    fn search_query_is_encoded() {
        let req = Channel::adhoc("has:thesephist.com #rust").request_older("7");
        assert_eq!(
            request_path(&req),
            "/search?query=has%3Athesephist.com%20%23rust&max=7"
        );
    }
}
