use crate::api::{ApiClientError, LucerneClient};
use crate::channel::Channel;

impl LucerneClient {
    /// Load saved channels.
    pub async fn get_channels(&self) -> Result<Vec<Channel>, ApiClientError> {
        self.get("/channels").await
    }

    /// Overwrite the saved channel list.
    pub async fn put_channels(&self, channels: &[Channel]) -> Result<(), ApiClientError> {
        self.put("/channels", channels).await
    }
}
