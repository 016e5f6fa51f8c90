// src/models.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Current unit price per ticker symbol.
pub type PriceMap = HashMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    User,
    Admin,
    Service,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Admin => "admin",
            Scope::Service => "service",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Scope::User),
            "admin" => Ok(Scope::Admin),
            "service" => Ok(Scope::Service),
            other => Err(format!("unknown scope: {}", other)),
        }
    }
}

/// A single stock position held by an account. Called `Stock` by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(default)]
    pub balance: Option<f64>,
    pub scope: Scope,
    pub enabled: bool,
    #[serde(default)]
    pub stocks: Option<Vec<Holding>>,
}

/// Public view of an account as returned by the ranking endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedAccount {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(default)]
    pub balance: Option<f64>,
    #[serde(default)]
    pub stocks: Option<Vec<Holding>>,
}

impl RankedAccount {
    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .take(1)
            .chain(self.last_name.chars().take(1))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreate {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceUpdate {
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub quantity: f64,
}

/// A new holding, submitted as a symbol path segment plus a quantity body.
#[derive(Debug, Clone, PartialEq)]
pub struct StockCreate {
    pub symbol: String,
    pub quantity: f64,
}

#[derive(Debug, Serialize)]
pub struct MarketDataRequest<'a> {
    pub symbols: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketData {
    pub market_data: PriceMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_reads_camel_case_and_missing_optionals() {
        let account: Account = serde_json::from_value(json!({
            "id": 4,
            "firstName": "Alice",
            "lastName": "Martin",
            "username": "alice",
            "scope": "admin",
            "enabled": true
        }))
        .unwrap();
        assert_eq!(account.scope, Scope::Admin);
        assert_eq!(account.balance, None);
        assert_eq!(account.stocks, None);
    }

    #[test]
    fn account_update_omits_unset_fields() {
        let update = AccountUpdate {
            scope: Some(Scope::User),
            enabled: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"scope": "user", "enabled": false})
        );
    }

    #[test]
    fn market_data_reads_price_map() {
        let data: MarketData =
            serde_json::from_value(json!({"marketData": {"ABC": 5.0, "XYZ": 1.5}})).unwrap();
        assert_eq!(data.market_data.get("XYZ"), Some(&1.5));
    }

    #[test]
    fn scope_parses_known_names_only() {
        assert_eq!("user".parse::<Scope>(), Ok(Scope::User));
        assert!("root".parse::<Scope>().is_err());
    }

    #[test]
    fn initials_take_first_letters() {
        let account = RankedAccount {
            first_name: "Émile".to_string(),
            last_name: "Zola".to_string(),
            username: "ez".to_string(),
            balance: None,
            stocks: None,
        };
        assert_eq!(account.initials(), "ÉZ");
    }
}
