// src/client.rs
use crate::error::ApiError;
use crate::models::{
    Account, AccountCreate, AccountUpdate, BalanceUpdate, MarketData, MarketDataRequest,
    PriceMap, RankedAccount, StockUpdate, Token,
};
use log::info;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// HTTP client for the broker's REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        ApiClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn execute(builder: RequestBuilder) -> Result<(), ApiError> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_body(status, &body))
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Token, ApiError> {
        let builder = self
            .request(Method::POST, "/auth/login/", None)
            .form(&[("username", username), ("password", password)]);
        let token: Token = Self::send(builder).await?;
        info!("Logged in as {}", username);
        Ok(token)
    }

    pub async fn read_ranked_accounts(&self) -> Result<Vec<RankedAccount>, ApiError> {
        Self::send(self.request(Method::GET, "/account/ranking", None)).await
    }

    pub async fn read_accounts(&self, token: &str) -> Result<Vec<Account>, ApiError> {
        Self::send(self.request(Method::GET, "/account/", Some(token))).await
    }

    /// Registration is open, so the token is optional.
    pub async fn create_account(
        &self,
        token: Option<&str>,
        account: &AccountCreate,
    ) -> Result<Account, ApiError> {
        let builder = self.request(Method::POST, "/account/", token).json(account);
        Self::send(builder).await
    }

    pub async fn update_account(
        &self,
        token: &str,
        account_id: i64,
        update: &AccountUpdate,
    ) -> Result<Account, ApiError> {
        let path = format!("/account/{}", account_id);
        let builder = self.request(Method::PATCH, &path, Some(token)).json(update);
        Self::send(builder).await
    }

    pub async fn delete_account(&self, token: &str, account_id: i64) -> Result<(), ApiError> {
        let path = format!("/account/{}", account_id);
        Self::execute(self.request(Method::DELETE, &path, Some(token))).await
    }

    pub async fn update_balance(
        &self,
        token: &str,
        account_id: i64,
        update: &BalanceUpdate,
    ) -> Result<(), ApiError> {
        let path = format!("/balance/{}", account_id);
        let builder = self.request(Method::PUT, &path, Some(token)).json(update);
        Self::execute(builder).await
    }

    /// Sets a holding's quantity. A quantity of 0 removes the holding.
    pub async fn update_stock(
        &self,
        token: &str,
        account_id: i64,
        symbol: &str,
        update: &StockUpdate,
    ) -> Result<(), ApiError> {
        let path = format!("/stock/{}/{}", account_id, urlencoding::encode(symbol));
        let builder = self.request(Method::PUT, &path, Some(token)).json(update);
        Self::execute(builder).await
    }

    pub async fn read_market_data(
        &self,
        token: Option<&str>,
        symbols: &[String],
    ) -> Result<PriceMap, ApiError> {
        if symbols.is_empty() {
            return Ok(PriceMap::new());
        }
        let builder = self
            .request(Method::POST, "/market_data/", token)
            .json(&MarketDataRequest { symbols });
        let data: MarketData = Self::send(builder).await?;
        Ok(data.market_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let client = ApiClient::new(Client::new(), "http://localhost:8000/api/v1/");
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
    }

    #[tokio::test]
    async fn no_symbols_means_no_request() {
        let client = ApiClient::new(Client::new(), "http://127.0.0.1:1");
        let prices = client.read_market_data(None, &[]).await.unwrap();
        assert!(prices.is_empty());
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error_without_status() {
        let client = ApiClient::new(Client::new(), "http://127.0.0.1:1");
        let error = client.read_ranked_accounts().await.unwrap_err();
        assert!(error.status.is_none());
    }
}
