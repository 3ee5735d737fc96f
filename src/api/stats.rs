use crate::api::types::{DataResponse, MetricTweet, SelfSummary, User};
use crate::api::{ApiClientError, LucerneClient};

impl LucerneClient {
    /// Engagement-metrics feed for the account's recent tweets.
    pub async fn get_trends(&self) -> Result<Vec<MetricTweet>, ApiClientError> {
        let resp: DataResponse<Vec<MetricTweet>> = self.get("/trends").await?;
        Ok(resp.data)
    }

    pub async fn get_followers(&self) -> Result<Vec<User>, ApiClientError> {
        let resp: DataResponse<Vec<User>> = self.get("/followers").await?;
        Ok(resp.data)
    }

    /// Own account summary.
    pub async fn get_self(&self) -> Result<SelfSummary, ApiClientError> {
        let resp: DataResponse<SelfSummary> = self.get("/self").await?;
        Ok(resp.data)
    }
}
