// src/valuation.rs
use crate::models::{Account, Holding, PriceMap, RankedAccount};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Anything carrying a cash balance and a list of holdings.
pub trait Valued {
    fn balance(&self) -> Option<f64>;
    fn holdings(&self) -> &[Holding];
}

impl Valued for Account {
    fn balance(&self) -> Option<f64> {
        self.balance
    }

    fn holdings(&self) -> &[Holding] {
        self.stocks.as_deref().unwrap_or_default()
    }
}

impl Valued for RankedAccount {
    fn balance(&self) -> Option<f64> {
        self.balance
    }

    fn holdings(&self) -> &[Holding] {
        self.stocks.as_deref().unwrap_or_default()
    }
}

/// Net worth: cash balance plus every holding valued at its current price.
///
/// A missing balance counts as 0 and a symbol absent from `prices` contributes
/// nothing. Quantities are taken as given. Products and the sum are computed in
/// `Decimal` so the result does not depend on holding order.
pub fn compute_total<A: Valued>(account: &A, prices: &PriceMap) -> f64 {
    let stocks = account
        .holdings()
        .iter()
        .map(|holding| {
            let price = prices.get(&holding.symbol).copied();
            to_decimal(Some(holding.quantity)).saturating_mul(to_decimal(price))
        })
        .fold(Decimal::ZERO, Decimal::saturating_add);
    to_decimal(account.balance())
        .saturating_add(stocks)
        .to_f64()
        .unwrap_or(0.0)
}

/// Missing and non-finite values count as zero.
fn to_decimal(value: Option<f64>) -> Decimal {
    value.and_then(Decimal::from_f64).unwrap_or(Decimal::ZERO)
}

/// Distinct symbols held across all accounts.
pub fn collect_symbols<'a, A, I>(accounts: I) -> BTreeSet<String>
where
    A: Valued + 'a,
    I: IntoIterator<Item = &'a A>,
{
    accounts
        .into_iter()
        .flat_map(|account| account.holdings().iter().map(|h| h.symbol.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking<A> {
    pub rank: usize,
    pub total: f64,
    pub account: A,
}

/// Orders accounts by net worth, richest first. Equal totals keep input order.
pub fn rank_accounts<A: Valued>(accounts: Vec<A>, prices: &PriceMap) -> Vec<Ranking<A>> {
    let mut totals: Vec<(f64, A)> = accounts
        .into_iter()
        .map(|account| (compute_total(&account, prices), account))
        .collect();
    totals.sort_by(|a, b| b.0.total_cmp(&a.0));
    totals
        .into_iter()
        .enumerate()
        .map(|(index, (total, account))| Ranking {
            rank: index + 1,
            total,
            account,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(balance: Option<f64>, stocks: &[(&str, f64)]) -> RankedAccount {
        RankedAccount {
            first_name: "Alice".to_string(),
            last_name: "Martin".to_string(),
            username: format!("user{}", stocks.len()),
            balance,
            stocks: Some(
                stocks
                    .iter()
                    .map(|(symbol, quantity)| Holding {
                        symbol: symbol.to_string(),
                        quantity: *quantity,
                    })
                    .collect(),
            ),
        }
    }

    fn prices(entries: &[(&str, f64)]) -> PriceMap {
        entries.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn balance_plus_valued_holdings() {
        let acc = account(Some(100.0), &[("ABC", 10.0)]);
        assert_eq!(compute_total(&acc, &prices(&[("ABC", 5.0)])), 150.0);
    }

    #[test]
    fn empty_holdings_is_balance() {
        let acc = account(Some(42.5), &[]);
        assert_eq!(compute_total(&acc, &prices(&[("ABC", 5.0)])), 42.5);
    }

    #[test]
    fn missing_balance_and_stocks_are_zero() {
        let mut acc = account(None, &[]);
        acc.stocks = None;
        assert_eq!(compute_total(&acc, &PriceMap::new()), 0.0);
    }

    #[test]
    fn unpriced_symbol_contributes_nothing() {
        let acc = account(Some(10.0), &[("ABC", 2.0), ("ZZZ", 1000.0)]);
        assert_eq!(compute_total(&acc, &prices(&[("ABC", 3.0)])), 16.0);
    }

    #[test]
    fn order_of_holdings_does_not_matter() {
        let p = prices(&[("A", 0.1), ("B", 0.2), ("C", 0.3)]);
        let forward = account(None, &[("A", 1.0), ("B", 1.0), ("C", 1.0)]);
        let backward = account(None, &[("C", 1.0), ("B", 1.0), ("A", 1.0)]);
        assert_eq!(compute_total(&forward, &p), 0.6);
        assert_eq!(compute_total(&backward, &p), 0.6);
    }

    #[test]
    fn non_finite_values_count_as_zero() {
        let acc = account(Some(f64::NAN), &[("ABC", 2.0), ("XYZ", f64::INFINITY)]);
        let p = prices(&[("ABC", 1.5), ("XYZ", 3.0)]);
        assert_eq!(compute_total(&acc, &p), 3.0);
    }

    #[test]
    fn fractional_quantities_are_used_as_given() {
        let acc = account(Some(0.0), &[("ABC", 0.5)]);
        assert_eq!(compute_total(&acc, &prices(&[("ABC", 9.0)])), 4.5);
    }

    #[test]
    fn symbols_are_deduplicated() {
        let accounts = vec![
            account(None, &[("ABC", 1.0), ("XYZ", 1.0)]),
            account(None, &[("ABC", 3.0)]),
        ];
        let symbols: Vec<String> = collect_symbols(&accounts).into_iter().collect();
        assert_eq!(symbols, vec!["ABC".to_string(), "XYZ".to_string()]);
    }

    #[test]
    fn ranking_is_descending_and_one_based() {
        let p = prices(&[("ABC", 10.0)]);
        let mut poor = account(Some(5.0), &[]);
        poor.username = "poor".to_string();
        let mut rich = account(Some(0.0), &[("ABC", 3.0)]);
        rich.username = "rich".to_string();
        let mut tie = account(Some(5.0), &[]);
        tie.username = "tie".to_string();

        let ranked = rank_accounts(vec![poor, rich, tie], &p);
        let order: Vec<(usize, &str)> = ranked
            .iter()
            .map(|r| (r.rank, r.account.username.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "rich"), (2, "poor"), (3, "tie")]);
        assert_eq!(ranked[0].total, 30.0);
    }
}
