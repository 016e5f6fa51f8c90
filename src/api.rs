// src/api.rs
use crate::auth::{parse_jwt, roles, Session, TOKEN_COOKIE};
use crate::client::ApiClient;
use crate::config::Config;
use crate::error::{ApiError, CustomError};
use crate::forms::{self, FormFields};
use crate::links::{is_allowed, NAV_LINKS, TAB_LINKS};
use crate::models::{PriceMap, StockUpdate};
use crate::pages::{self, is_local, with_query};
use crate::valuation::{collect_symbols, rank_accounts, Valued};
use crate::views::{self, Flash, PageContext};
use chrono::Utc;
use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::filters::BoxedFilter;
use warp::hyper::Body;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

const FORM_LIMIT: u64 = 16 * 1024;

pub struct AppState {
    pub config: Config,
    pub client: ApiClient,
}

impl AppState {
    pub fn new(config: Config, http: reqwest::Client) -> Self {
        let client = ApiClient::new(http, config.api_url());
        AppState { config, client }
    }
}

#[derive(Default, Deserialize)]
struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
    error: Option<String>,
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let index = warp::path::end()
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and(with_flash())
        .and_then(index_handler);

    let own_account = warp::path!("account")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and(with_flash())
        .and_then(own_account_handler);

    let users = warp::path!("account" / "users")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and(with_flash())
        .and_then(users_handler);

    let login_form = warp::path!("login")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(optional_query::<LoginQuery>())
        .and_then(login_form_handler);

    let login = warp::path!("login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_form())
        .and_then(login_handler);

    let logout = warp::path!("logout")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(logout_handler);

    let register_form = warp::path!("register")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_flash())
        .and_then(register_form_handler);

    let register = warp::path!("register")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_form())
        .and_then(register_handler);

    let create_account = warp::path!("account" / "users")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and(with_form())
        .and_then(create_account_handler);

    let update_account = warp::path!("account" / "users" / i64)
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and(with_form())
        .and_then(update_account_handler);

    let delete_account = warp::path!("account" / "users" / i64 / "delete")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and_then(delete_account_handler);

    let update_balance = warp::path!("account" / "users" / i64 / "balance")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and(with_form())
        .and_then(update_balance_handler);

    let add_stock = warp::path!("account" / "users" / i64 / "stocks")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and(with_form())
        .and_then(add_stock_handler);

    let update_stock = warp::path!("account" / "users" / i64 / "stocks" / String)
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state.clone()))
        .and(with_form())
        .and_then(update_stock_handler);

    let delete_stock = warp::path!("account" / "users" / i64 / "stocks" / String / "delete")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_session(state))
        .and_then(delete_stock_handler);

    index
        .or(own_account)
        .or(users)
        .or(login_form)
        .or(login)
        .or(logout)
        .or(register_form)
        .or(register)
        .or(create_account)
        .or(update_account)
        .or(delete_account)
        .or(update_balance)
        .or(add_stock)
        .or(update_stock)
        .or(delete_stock)
        .recover(handle_rejection)
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// The caller's session, if the token cookie holds a usable one.
fn with_session(state: Arc<AppState>) -> BoxedFilter<(Option<Session>,)> {
    warp::cookie::optional(TOKEN_COOKIE)
        .map(move |token: Option<String>| {
            token.and_then(|token| {
                Session::from_token(&token, state.config.jwt_secret.as_deref(), Utc::now())
            })
        })
        .boxed()
}

/// Query parameters, or their defaults when the query string is missing or unreadable.
fn optional_query<T>() -> BoxedFilter<(T,)>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    warp::query::<T>()
        .or(warp::any().map(T::default))
        .unify()
        .boxed()
}

fn with_flash() -> BoxedFilter<(Flash,)> {
    optional_query::<Flash>()
}

fn with_form() -> impl Filter<Extract = (FormFields,), Error = Rejection> + Clone {
    warp::body::content_length_limit(FORM_LIMIT).and(warp::body::form::<FormFields>())
}

fn html(body: String) -> Response {
    warp::reply::html(body).into_response()
}

/// A 303 to `location`. Targets that are not valid header values reject.
fn redirect(location: &str) -> Result<Response, Rejection> {
    warp::http::Response::builder()
        .status(StatusCode::SEE_OTHER)
        .header("location", location)
        .body(Body::empty())
        .map_err(|e| {
            warp::reject::custom(CustomError::new(format!(
                "Cannot redirect to {:?}: {}",
                location, e
            )))
        })
}

/// Lets the caller through to `path`, or returns where to send them instead.
fn guard(session: Option<Session>, path: &str) -> Result<Session, String> {
    let links = [NAV_LINKS, TAB_LINKS];
    let allowed = links
        .iter()
        .all(|links| is_allowed(links, path, roles(session.as_ref())));
    match session {
        None => {
            debug!("Anonymous access to {}, redirecting to sign in", path);
            Err(with_query(pages::SIGNIN, "callbackUrl", path))
        }
        Some(_) if !allowed => {
            debug!("Insufficient scope for {}, redirecting home", path);
            Err(pages::INDEX.to_string())
        }
        Some(session) => Ok(session),
    }
}

/// Redirects back to the users page with a success or failure banner.
fn outcome(
    result: Result<(), ApiError>,
    success: &str,
    failure: &str,
) -> Result<Response, Rejection> {
    match result {
        Ok(()) => {
            info!("{}", success);
            redirect(&with_query(pages::account::USERS, "notice", success))
        }
        Err(e) => {
            error!("{}: {}", failure, e);
            redirect(&with_query(
                pages::account::USERS,
                "error",
                &format!("{} {}", failure, e.detail),
            ))
        }
    }
}

fn invalid(errors: &forms::FieldErrors, failure: &str) -> Result<Response, Rejection> {
    redirect(&with_query(
        pages::account::USERS,
        "error",
        &format!("{} {}", failure, forms::describe(errors)),
    ))
}

/// Prices for every symbol the accounts hold. Failures give an empty map.
async fn fetch_prices<'a, A: Valued + 'a>(
    state: &AppState,
    session: Option<&Session>,
    accounts: &'a [A],
) -> PriceMap {
    let symbols: Vec<String> = collect_symbols(accounts).into_iter().collect();
    let token = session.map(|session| session.token.as_str());
    match state.client.read_market_data(token, &symbols).await {
        Ok(prices) => prices,
        Err(e) => {
            error!("Failed to read market data: {}", e);
            PriceMap::new()
        }
    }
}

async fn index_handler(
    state: Arc<AppState>,
    session: Option<Session>,
    flash: Flash,
) -> Result<Response, Rejection> {
    let accounts = match state.client.read_ranked_accounts().await {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Failed to read ranked accounts: {}", e);
            Vec::new()
        }
    };
    let prices = fetch_prices(&state, session.as_ref(), &accounts).await;
    let rankings = rank_accounts(accounts, &prices);
    let ctx = PageContext {
        session: session.as_ref(),
        path: pages::INDEX,
        flash: &flash,
    };
    Ok(html(views::ranking_page(&ctx, &rankings, &prices)))
}

async fn own_account_handler(
    state: Arc<AppState>,
    session: Option<Session>,
    flash: Flash,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::INDEX) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let accounts = match state.client.read_ranked_accounts().await {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Failed to read ranked accounts: {}", e);
            Vec::new()
        }
    };
    let prices = fetch_prices(&state, Some(&session), &accounts).await;
    let rankings = rank_accounts(accounts, &prices);
    let own = rankings
        .iter()
        .find(|ranking| ranking.account.username == session.username);
    let ctx = PageContext {
        session: Some(&session),
        path: pages::account::INDEX,
        flash: &flash,
    };
    Ok(html(views::own_account_page(&ctx, own, &prices)))
}

async fn users_handler(
    state: Arc<AppState>,
    session: Option<Session>,
    flash: Flash,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::USERS) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let accounts = match state.client.read_accounts(&session.token).await {
        Ok(accounts) => accounts,
        Err(e) => {
            error!("Failed to read accounts: {}", e);
            Vec::new()
        }
    };
    let ctx = PageContext {
        session: Some(&session),
        path: pages::account::USERS,
        flash: &flash,
    };
    Ok(html(views::users_page(&ctx, &accounts)))
}

async fn login_form_handler(
    session: Option<Session>,
    query: LoginQuery,
) -> Result<Response, Rejection> {
    let callback_url = query
        .callback_url
        .filter(|target| is_local(target))
        .unwrap_or_else(|| pages::INDEX.to_string());
    let flash = Flash {
        notice: None,
        error: query.error,
    };
    let ctx = PageContext {
        session: session.as_ref(),
        path: pages::SIGNIN,
        flash: &flash,
    };
    Ok(html(views::login_page(&ctx, &callback_url)))
}

fn session_cookie(token: &str, secure: bool) -> String {
    let max_age = parse_jwt(token)
        .map(|claims| format!("; Max-Age={}", (claims.exp - Utc::now().timestamp()).max(0)))
        .unwrap_or_default();
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax{}{}",
        TOKEN_COOKIE,
        token,
        max_age,
        if secure { "; Secure" } else { "" }
    )
}

async fn login_handler(state: Arc<AppState>, form: FormFields) -> Result<Response, Rejection> {
    let callback_url = form
        .get("callbackUrl")
        .filter(|target| is_local(target))
        .cloned()
        .unwrap_or_else(|| pages::INDEX.to_string());
    let username = form.get("username").map(String::as_str).unwrap_or_default();
    let password = form.get("password").map(String::as_str).unwrap_or_default();

    let failure = |detail: &str| {
        let target = format!(
            "{}&error={}",
            with_query(pages::SIGNIN, "callbackUrl", &callback_url),
            urlencoding::encode(&format!("Connexion impossible. {}", detail))
        );
        redirect(&target)
    };

    let token = match state.client.login(username, password).await {
        Ok(token) => token,
        Err(e) => {
            error!("Login failed for {}: {}", username, e);
            return failure(&e.detail);
        }
    };
    let secret = state.config.jwt_secret.as_deref();
    if Session::from_token(&token.access_token, secret, Utc::now()).is_none() {
        error!("Backend issued an unusable token for {}", username);
        return failure("Jeton de session invalide.");
    }

    let cookie = session_cookie(&token.access_token, state.config.secure_cookies);
    let response = redirect(&callback_url)?;
    Ok(warp::reply::with_header(response, "set-cookie", cookie).into_response())
}

async fn logout_handler(state: Arc<AppState>) -> Result<Response, Rejection> {
    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{}",
        TOKEN_COOKIE,
        if state.config.secure_cookies { "; Secure" } else { "" }
    );
    let response = redirect(pages::INDEX)?;
    Ok(warp::reply::with_header(response, "set-cookie", cookie).into_response())
}

async fn register_form_handler(
    session: Option<Session>,
    flash: Flash,
) -> Result<Response, Rejection> {
    let ctx = PageContext {
        session: session.as_ref(),
        path: pages::SIGNUP,
        flash: &flash,
    };
    Ok(html(views::register_page(&ctx)))
}

async fn register_handler(state: Arc<AppState>, form: FormFields) -> Result<Response, Rejection> {
    let failure = "Erreur lors de l'inscription.";
    let account = match forms::account_create(form) {
        Ok(account) => account,
        Err(errors) => {
            let message = format!("{} {}", failure, forms::describe(&errors));
            return redirect(&with_query(pages::SIGNUP, "error", &message));
        }
    };
    match state.client.create_account(None, &account).await {
        Ok(created) => {
            info!("Registered account {}", created.username);
            redirect(&with_query(pages::SIGNIN, "callbackUrl", pages::INDEX))
        }
        Err(e) => {
            error!("{}: {}", failure, e);
            let message = format!("{} {}", failure, e.detail);
            redirect(&with_query(pages::SIGNUP, "error", &message))
        }
    }
}

async fn create_account_handler(
    state: Arc<AppState>,
    session: Option<Session>,
    form: FormFields,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::USERS) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let failure = "Erreur lors de l'ajout du compte.";
    let account = match forms::account_create(form) {
        Ok(account) => account,
        Err(errors) => return invalid(&errors, failure),
    };
    let result = state
        .client
        .create_account(Some(&session.token), &account)
        .await
        .map(|_| ());
    outcome(result, "Compte ajouté avec succès !", failure)
}

async fn update_account_handler(
    account_id: i64,
    state: Arc<AppState>,
    session: Option<Session>,
    form: FormFields,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::USERS) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let failure = "Erreur lors de la modification du compte.";
    let update = match forms::account_update(form) {
        Ok(update) => update,
        Err(errors) => return invalid(&errors, failure),
    };
    let result = state
        .client
        .update_account(&session.token, account_id, &update)
        .await
        .map(|_| ());
    outcome(result, "Compte modifié avec succès !", failure)
}

async fn delete_account_handler(
    account_id: i64,
    state: Arc<AppState>,
    session: Option<Session>,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::USERS) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let result = state.client.delete_account(&session.token, account_id).await;
    outcome(
        result,
        "Compte supprimé avec succès !",
        "Erreur lors de la suppression du compte.",
    )
}

async fn update_balance_handler(
    account_id: i64,
    state: Arc<AppState>,
    session: Option<Session>,
    form: FormFields,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::USERS) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let failure = "Erreur lors de la modification du solde.";
    let update = match forms::balance_update(form) {
        Ok(update) => update,
        Err(errors) => return invalid(&errors, failure),
    };
    let result = state
        .client
        .update_balance(&session.token, account_id, &update)
        .await;
    outcome(
        result,
        "Modification du solde effectué avec succès",
        failure,
    )
}

async fn add_stock_handler(
    account_id: i64,
    state: Arc<AppState>,
    session: Option<Session>,
    form: FormFields,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::USERS) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let failure = "Erreur lors de l'ajout de l'action.";
    let stock = match forms::add_stock(form) {
        Ok(stock) => stock,
        Err(errors) => return invalid(&errors, failure),
    };
    let update = StockUpdate {
        quantity: stock.quantity,
    };
    let result = state
        .client
        .update_stock(&session.token, account_id, &stock.symbol, &update)
        .await;
    outcome(result, "Action ajoutée avec succès", failure)
}

async fn update_stock_handler(
    account_id: i64,
    symbol: String,
    state: Arc<AppState>,
    session: Option<Session>,
    form: FormFields,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::USERS) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let failure = "Erreur lors de la modification de l'action.";
    let update = match forms::stock_update(form) {
        Ok(update) => update,
        Err(errors) => return invalid(&errors, failure),
    };
    let symbol = decode_symbol(&symbol)?;
    let result = state
        .client
        .update_stock(&session.token, account_id, &symbol, &update)
        .await;
    outcome(result, "Action modifiée avec succès", failure)
}

async fn delete_stock_handler(
    account_id: i64,
    symbol: String,
    state: Arc<AppState>,
    session: Option<Session>,
) -> Result<Response, Rejection> {
    let session = match guard(session, pages::account::USERS) {
        Ok(session) => session,
        Err(target) => return redirect(&target),
    };
    let symbol = decode_symbol(&symbol)?;
    let result = state
        .client
        .update_stock(&session.token, account_id, &symbol, &StockUpdate { quantity: 0.0 })
        .await;
    outcome(
        result,
        "Action supprimé avec succès",
        "Erreur lors de la suppression de l'action.",
    )
}

/// Symbols arrive percent-encoded in the path. Undecodable ones name no holding.
fn decode_symbol(segment: &str) -> Result<String, Rejection> {
    match urlencoding::decode(segment) {
        Ok(symbol) => Ok(symbol.into_owned()),
        Err(e) => {
            debug!("Undecodable stock symbol {:?}: {}", segment, e);
            Err(warp::reject::not_found())
        }
    }
}

/// Renders rejections as HTML error pages.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Page introuvable.".to_string())
    } else if let Some(e) = err.find::<CustomError>() {
        error!("Request failed: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.message.clone())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Méthode non autorisée.".to_string(),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Formulaire trop volumineux.".to_string(),
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::BAD_REQUEST, "Requête invalide.".to_string())
    };

    let flash = Flash::default();
    let ctx = PageContext {
        session: None,
        path: "",
        flash: &flash,
    };
    Ok(warp::reply::with_status(
        warp::reply::html(views::error_page(&ctx, status.as_u16(), &message)),
        status,
    ))
}
