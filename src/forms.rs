// src/forms.rs
//! Turns submitted HTML form fields into typed API bodies.
use crate::format::patch_empty_string;
use crate::models::{AccountCreate, AccountUpdate, BalanceUpdate, Scope, StockCreate, StockUpdate};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Field name to error message.
pub type FieldErrors = BTreeMap<&'static str, &'static str>;

pub type FormFields = HashMap<String, String>;

struct Fields(Map<String, Value>);

impl Fields {
    fn patched(form: FormFields) -> Self {
        let raw: Map<String, Value> = form
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Fields(patch_empty_string(raw))
    }

    fn text(&self, name: &str) -> Option<String> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn number(&self, name: &str) -> Option<Result<f64, ()>> {
        self.text(name).map(|raw| {
            raw.trim()
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or(())
        })
    }
}

pub fn balance_update(form: FormFields) -> Result<BalanceUpdate, FieldErrors> {
    let fields = Fields::patched(form);
    let mut errors = FieldErrors::new();
    let balance = match fields.number("balance") {
        None => {
            errors.insert("balance", "Le solde est requis.");
            None
        }
        Some(Err(())) => {
            errors.insert("balance", "Le solde doit être un nombre.");
            None
        }
        Some(Ok(balance)) if balance < 0.0 => {
            errors.insert("balance", "Le solde doit être supérieur ou égal à 0.");
            None
        }
        Some(Ok(balance)) => Some(balance),
    };
    match balance {
        Some(balance) if errors.is_empty() => Ok(BalanceUpdate { balance }),
        _ => Err(errors),
    }
}

pub fn add_stock(form: FormFields) -> Result<StockCreate, FieldErrors> {
    let fields = Fields::patched(form);
    let mut errors = FieldErrors::new();
    let symbol = fields
        .text("symbol")
        .map(|symbol| symbol.trim().to_uppercase())
        .filter(|symbol| !symbol.is_empty());
    if symbol.is_none() {
        errors.insert("symbol", "Le nom est requis.");
    }
    let quantity = match fields.number("quantity") {
        Some(Ok(quantity)) if quantity > 0.0 => Some(quantity),
        _ => {
            errors.insert("quantity", "La quantité doit être supérieur à 0.");
            None
        }
    };
    match (symbol, quantity) {
        (Some(symbol), Some(quantity)) => Ok(StockCreate { symbol, quantity }),
        _ => Err(errors),
    }
}

pub fn stock_update(form: FormFields) -> Result<StockUpdate, FieldErrors> {
    let fields = Fields::patched(form);
    let mut errors = FieldErrors::new();
    match fields.number("quantity") {
        None => {
            errors.insert("quantity", "La quantité est requise.");
        }
        Some(Ok(quantity)) if quantity >= 0.0 => return Ok(StockUpdate { quantity }),
        Some(_) => {
            errors.insert("quantity", "La quantité doit être supérieure ou égale à 0.");
        }
    }
    Err(errors)
}

pub fn account_update(form: FormFields) -> Result<AccountUpdate, FieldErrors> {
    let fields = Fields::patched(form);
    let mut errors = FieldErrors::new();

    let scope = match fields.text("scope") {
        Some(raw) => match raw.parse::<Scope>() {
            Ok(scope) => Some(scope),
            Err(_) => {
                errors.insert("scope", "Rôle inconnu.");
                None
            }
        },
        None => None,
    };
    let enabled = match fields.text("enabled").as_deref() {
        Some("true") | Some("on") => Some(true),
        Some("false") | Some("off") => Some(false),
        Some(_) => {
            errors.insert("enabled", "Valeur invalide.");
            None
        }
        None => None,
    };
    let username = fields.text("username");
    if let Some(name) = &username {
        if !(3..=32).contains(&name.chars().count()) {
            errors.insert("username", "Le nom d'utilisateur doit contenir entre 3 et 32 caractères.");
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(AccountUpdate {
        username,
        first_name: fields.text("firstName"),
        last_name: fields.text("lastName"),
        password: fields.text("password"),
        scope,
        enabled,
    })
}

pub fn account_create(form: FormFields) -> Result<AccountCreate, FieldErrors> {
    let fields = Fields::patched(form);
    let mut errors = FieldErrors::new();

    let username = fields.text("username").unwrap_or_default();
    if !(3..=32).contains(&username.chars().count()) {
        errors.insert("username", "Le nom d'utilisateur doit contenir entre 3 et 32 caractères.");
    }
    let first_name = fields.text("firstName");
    if first_name.is_none() {
        errors.insert("firstName", "Le prénom est requis.");
    }
    let last_name = fields.text("lastName");
    if last_name.is_none() {
        errors.insert("lastName", "Le nom est requis.");
    }
    let password = fields.text("password");
    if password.is_none() {
        errors.insert("password", "Le mot de passe est requis.");
    }

    match (first_name, last_name, password) {
        (Some(first_name), Some(last_name), Some(password)) if errors.is_empty() => {
            Ok(AccountCreate {
                username,
                first_name,
                last_name,
                password,
            })
        }
        _ => Err(errors),
    }
}

/// Joins field errors into one line for a banner.
pub fn describe(errors: &FieldErrors) -> String {
    errors.values().copied().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(entries: &[(&str, &str)]) -> FormFields {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn balance_is_required_and_non_negative() {
        assert_eq!(
            balance_update(form(&[("balance", "")])).unwrap_err()["balance"],
            "Le solde est requis."
        );
        assert_eq!(
            balance_update(form(&[("balance", "-1")])).unwrap_err()["balance"],
            "Le solde doit être supérieur ou égal à 0."
        );
        assert_eq!(
            balance_update(form(&[("balance", "12,5")])).unwrap(),
            BalanceUpdate { balance: 12.5 }
        );
        assert_eq!(
            balance_update(form(&[("balance", "0")])).unwrap(),
            BalanceUpdate { balance: 0.0 }
        );
    }

    #[test]
    fn new_stock_needs_symbol_and_positive_quantity() {
        let errors = add_stock(form(&[("symbol", ""), ("quantity", "0")])).unwrap_err();
        assert_eq!(errors["symbol"], "Le nom est requis.");
        assert_eq!(errors["quantity"], "La quantité doit être supérieur à 0.");

        let stock = add_stock(form(&[("symbol", " aapl "), ("quantity", "3")])).unwrap();
        assert_eq!(stock.symbol, "AAPL");
        assert_eq!(stock.quantity, 3.0);
    }

    #[test]
    fn stock_update_accepts_zero() {
        assert_eq!(
            stock_update(form(&[("quantity", "0")])).unwrap(),
            StockUpdate { quantity: 0.0 }
        );
        assert!(stock_update(form(&[("quantity", "-2")])).is_err());
        assert!(stock_update(form(&[("quantity", "abc")])).is_err());
        assert!(stock_update(form(&[])).is_err());
    }

    #[test]
    fn account_update_drops_empty_fields() {
        let update = account_update(form(&[
            ("scope", "admin"),
            ("enabled", "false"),
            ("username", ""),
            ("password", ""),
        ]))
        .unwrap();
        assert_eq!(
            update,
            AccountUpdate {
                scope: Some(Scope::Admin),
                enabled: Some(false),
                ..Default::default()
            }
        );
    }

    #[test]
    fn account_update_rejects_unknown_scope() {
        let errors = account_update(form(&[("scope", "root")])).unwrap_err();
        assert!(errors.contains_key("scope"));
    }

    #[test]
    fn account_create_checks_every_field() {
        let errors = account_create(form(&[("username", "al"), ("firstName", "")])).unwrap_err();
        assert_eq!(errors.len(), 4);

        let created = account_create(form(&[
            ("username", "alice"),
            ("firstName", "Alice"),
            ("lastName", "Martin"),
            ("password", "correct horse battery staple"),
        ]))
        .unwrap();
        assert_eq!(created.username, "alice");
    }

    #[test]
    fn describe_joins_in_field_order() {
        let errors = add_stock(form(&[])).unwrap_err();
        assert_eq!(
            describe(&errors),
            "La quantité doit être supérieur à 0. Le nom est requis."
        );
    }
}
