// src/views.rs
//! Server-side HTML rendering.
use crate::auth::{roles, Session};
use crate::format::{format_price, SignDisplay};
use crate::links::{filter_links, find_active_link, Icon, NavLink, NAV_LINKS, TAB_LINKS};
use crate::models::{Account, Holding, PriceMap, RankedAccount, Scope};
use crate::pages;
use crate::valuation::Ranking;
use serde::Deserialize;

/// One-shot messages carried in the query string after a redirect.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Flash {
    pub notice: Option<String>,
    pub error: Option<String>,
}

pub struct PageContext<'a> {
    pub session: Option<&'a Session>,
    pub path: &'a str,
    pub flash: &'a Flash,
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn price(amount: Option<f64>) -> String {
    escape(&format_price(amount, SignDisplay::Auto))
}

fn icon(icon: Icon) -> &'static str {
    match icon {
        Icon::Person => r#"<span class="icon" aria-hidden="true">&#128100;</span>"#,
        Icon::ListBullet => r#"<span class="icon" aria-hidden="true">&#9776;</span>"#,
    }
}

fn navbar(ctx: &PageContext<'_>) -> String {
    let active = find_active_link(NAV_LINKS, ctx.path);
    let mut html = String::from(r#"<header class="navbar"><nav>"#);
    for link in filter_links(NAV_LINKS, roles(ctx.session)) {
        let class = if active == Some(link) { "active" } else { "" };
        html.push_str(&format!(
            r#"<a class="{}" href="{}">{}</a>"#,
            class,
            link.href,
            escape(link.label)
        ));
    }
    html.push_str("</nav>");
    let login = match ctx.session {
        Some(session) => format!(
            r#"<div class="login"><span>{}</span> <a href="{}">Se déconnecter</a></div>"#,
            escape(&session.username),
            pages::SIGNOUT
        ),
        None => format!(
            r#"<div class="login"><a href="{}">Se connecter</a></div>"#,
            pages::SIGNIN
        ),
    };
    html.push_str(&login);
    html.push_str("</header>");
    html
}

fn tabs(ctx: &PageContext<'_>) -> String {
    let active = find_active_link(TAB_LINKS, ctx.path);
    let mut html = String::from(r#"<aside class="tabs">"#);
    for link in filter_links(TAB_LINKS, roles(ctx.session)) {
        html.push_str(&tab(link, active == Some(link)));
    }
    html.push_str("</aside>");
    html
}

fn tab(link: &NavLink, active: bool) -> String {
    format!(
        r#"<a class="tab{}" href="{}">{}<span>{}</span></a>"#,
        if active { " active" } else { "" },
        link.href,
        link.icon.map(icon).unwrap_or_default(),
        escape(link.label)
    )
}

fn flash(flash: &Flash) -> String {
    let mut html = String::new();
    if let Some(notice) = &flash.notice {
        html.push_str(&format!(r#"<p class="notice" role="status">{}</p>"#, escape(notice)));
    }
    if let Some(error) = &flash.error {
        html.push_str(&format!(r#"<p class="error" role="alert">{}</p>"#, escape(error)));
    }
    html
}

pub fn layout(ctx: &PageContext<'_>, title: &str, body: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n<html lang=\"fr\"><head><meta charset=\"utf-8\">",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
            "<title>{title}</title></head><body>{navbar}<main>{flash}{body}</main></body></html>"
        ),
        title = escape(title),
        navbar = navbar(ctx),
        flash = flash(ctx.flash),
        body = body
    )
}

fn holdings_table(holdings: &[Holding], prices: &PriceMap) -> String {
    let rows: String = holdings
        .iter()
        .map(|holding| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&holding.symbol),
                holding.quantity,
                price(prices.get(&holding.symbol).copied())
            )
        })
        .collect();
    format!(
        "<table><thead><tr><th>Nom</th><th>Quantité</th><th>Prix actuel</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

pub fn user_card(ranking: &Ranking<RankedAccount>, prices: &PriceMap) -> String {
    let account = &ranking.account;
    format!(
        concat!(
            "<article class=\"card\"><header>",
            "<span class=\"avatar\">{initials}</span>",
            "<div><h2>{first} {last}</h2><p>Username: {username}</p></div>",
            "<span class=\"rank\">#{rank}</span></header>",
            "<section><p><span>Solde:</span> <span>{balance}</span></p>{table}</section>",
            "<footer><span>Total:</span> <span>{total}</span></footer></article>"
        ),
        initials = escape(&account.initials()),
        first = escape(&account.first_name),
        last = escape(&account.last_name),
        username = escape(&account.username),
        rank = ranking.rank,
        balance = price(Some(account.balance.unwrap_or(0.0))),
        table = holdings_table(account.stocks.as_deref().unwrap_or_default(), prices),
        total = price(Some(ranking.total)),
    )
}

pub fn ranking_page(
    ctx: &PageContext<'_>,
    rankings: &[Ranking<RankedAccount>],
    prices: &PriceMap,
) -> String {
    let mut body = format!(
        r#"<div class="title"><h1>Classement</h1><a class="reload" href="{}" aria-label="Reload">&#8635;</a></div><div class="grid">"#,
        pages::INDEX
    );
    for ranking in rankings {
        body.push_str(&user_card(ranking, prices));
    }
    body.push_str("</div>");
    layout(ctx, "Accueil", &body)
}

pub fn own_account_page(
    ctx: &PageContext<'_>,
    ranking: Option<&Ranking<RankedAccount>>,
    prices: &PriceMap,
) -> String {
    let content = match ranking {
        Some(ranking) => user_card(ranking, prices),
        None => "<p>Aucune donnée de classement pour ce compte.</p>".to_string(),
    };
    let body = format!(
        r#"<div class="account">{}<div class="content"><h1>Mon compte</h1>{}</div></div>"#,
        tabs(ctx),
        content
    );
    layout(ctx, "Mon compte", &body)
}

fn scope_label(scope: Scope) -> &'static str {
    match scope {
        Scope::User => "Utilisateur",
        Scope::Admin => "Admin",
        Scope::Service => "Service",
    }
}

fn add_account_form() -> String {
    format!(
        concat!(
            "<details class=\"add-account\"><summary>Ajouter un compte</summary>",
            "<form method=\"post\" action=\"{}\">{}",
            "<button type=\"submit\">Ajouter</button></form></details>"
        ),
        pages::account::USERS,
        account_fields()
    )
}

fn account_fields() -> &'static str {
    concat!(
        "<label>Nom d'utilisateur <input name=\"username\" minlength=\"3\" maxlength=\"32\" required></label>",
        "<label>Prénom <input name=\"firstName\" required></label>",
        "<label>Nom <input name=\"lastName\" required></label>",
        "<label>Mot de passe <input name=\"password\" type=\"password\" required></label>"
    )
}

fn modify_form(account: &Account) -> String {
    let options: String = [Scope::User, Scope::Admin]
        .iter()
        .map(|&scope| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                scope,
                if account.scope == scope { " selected" } else { "" },
                scope_label(scope)
            )
        })
        .collect();
    format!(
        concat!(
            "<form class=\"modify\" method=\"post\" action=\"{base}/{id}\">",
            "<label>Scope <select name=\"scope\">{options}</select></label>",
            "<label>Compte actif <select name=\"enabled\">",
            "<option value=\"true\"{on}>Oui</option><option value=\"false\"{off}>Non</option>",
            "</select></label><button type=\"submit\">Modifier</button></form>",
            "<form class=\"delete\" method=\"post\" action=\"{base}/{id}/delete\">",
            "<button type=\"submit\">Supprimer</button></form>"
        ),
        base = pages::account::USERS,
        id = account.id,
        options = options,
        on = if account.enabled { " selected" } else { "" },
        off = if account.enabled { "" } else { " selected" },
    )
}

fn account_details(account: &Account) -> String {
    let base = format!("{}/{}", pages::account::USERS, account.id);
    let mut html = format!(
        concat!(
            "<div class=\"details\"><form method=\"post\" action=\"{base}/balance\">",
            "<label>Solde: <input name=\"balance\" type=\"number\" step=\"any\" min=\"0\" value=\"{balance}\"> €</label>",
            " <span>{formatted}</span> <button type=\"submit\">Enregistrer</button></form>",
            "<table><thead><tr><th>Nom</th><th>Quantité</th><th></th></tr></thead><tbody>"
        ),
        base = base,
        balance = account.balance.unwrap_or(0.0),
        formatted = price(Some(account.balance.unwrap_or(0.0))),
    );
    for holding in account.stocks.as_deref().unwrap_or_default() {
        html.push_str(&format!(
            concat!(
                "<tr><td>{symbol}</td><td><form method=\"post\" action=\"{base}/stocks/{segment}\">",
                "<input name=\"quantity\" type=\"number\" step=\"any\" min=\"0\" value=\"{quantity}\">",
                "<button type=\"submit\">&#10003;</button></form></td>",
                "<td><form method=\"post\" action=\"{base}/stocks/{segment}/delete\">",
                "<button type=\"submit\" aria-label=\"Delete\">&#128465;</button></form></td></tr>"
            ),
            symbol = escape(&holding.symbol),
            segment = urlencoding::encode(&holding.symbol),
            base = base,
            quantity = holding.quantity,
        ));
    }
    html.push_str(&format!(
        concat!(
            "</tbody></table><form class=\"add-stock\" method=\"post\" action=\"{base}/stocks\">",
            "<input name=\"symbol\" placeholder=\"Entrer le nom\">",
            "<input name=\"quantity\" type=\"number\" step=\"any\" placeholder=\"Entrer la quantité\">",
            "<button type=\"submit\">Ajouter</button></form></div>"
        ),
        base = base
    ));
    html
}

fn account_row(account: &Account) -> String {
    let mut html = format!(
        concat!(
            "<tr><td>{id}</td><td>{first}</td><td>{last}</td><td>{scope}</td><td>{enabled}</td>",
            "<td>{actions}</td></tr>"
        ),
        id = account.id,
        first = escape(&account.first_name),
        last = escape(&account.last_name),
        scope = account.scope,
        enabled = if account.enabled {
            r#"<span class="enabled">&#10003;</span>"#
        } else {
            r#"<span class="disabled">&#10007;</span>"#
        },
        actions = modify_form(account),
    );
    if account.enabled {
        html.push_str(&format!(
            r#"<tr class="collapsible"><td colspan="6">{}</td></tr>"#,
            account_details(account)
        ));
    }
    html
}

pub fn users_page(ctx: &PageContext<'_>, accounts: &[Account]) -> String {
    let mut body = format!(
        concat!(
            "<div class=\"account\">{tabs}<div class=\"content\">{add}",
            "<table class=\"accounts\"><thead><tr><th>Id</th><th>Nom</th><th>Prénom</th>",
            "<th>Rôle</th><th>Actif</th><th></th></tr></thead><tbody>"
        ),
        tabs = tabs(ctx),
        add = add_account_form(),
    );
    for account in accounts {
        body.push_str(&account_row(account));
    }
    body.push_str("</tbody></table></div></div>");
    layout(ctx, "Gestions des utilisateurs", &body)
}

pub fn login_page(ctx: &PageContext<'_>, callback_url: &str) -> String {
    let body = format!(
        concat!(
            "<h1>Connexion</h1><form method=\"post\" action=\"{signin}\">",
            "<input type=\"hidden\" name=\"callbackUrl\" value=\"{callback}\">",
            "<label>Nom d'utilisateur <input name=\"username\" required></label>",
            "<label>Mot de passe <input name=\"password\" type=\"password\" required></label>",
            "<button type=\"submit\">Se connecter</button></form>",
            "<p><a href=\"{signup}\">Créer un compte</a></p>"
        ),
        signin = pages::SIGNIN,
        callback = escape(callback_url),
        signup = pages::SIGNUP,
    );
    layout(ctx, "Connexion", &body)
}

pub fn register_page(ctx: &PageContext<'_>) -> String {
    let body = format!(
        concat!(
            "<h1>Inscription</h1><form method=\"post\" action=\"{}\">{}",
            "<button type=\"submit\">S'inscrire</button></form>"
        ),
        pages::SIGNUP,
        account_fields()
    );
    layout(ctx, "Inscription", &body)
}

pub fn error_page(ctx: &PageContext<'_>, code: u16, message: &str) -> String {
    let body = format!(
        r#"<h1>{}</h1><p>{}</p><p><a href="{}">Retour à l'accueil</a></p>"#,
        code,
        escape(message),
        pages::INDEX
    );
    layout(ctx, &format!("Erreur {}", code), &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(scopes: &[Scope]) -> Session {
        Session {
            username: "alice".to_string(),
            scopes: scopes.to_vec(),
            token: "t".to_string(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn navbar_follows_roles_and_active_path() {
        let flash = Flash::default();
        let admin = session(&[Scope::Admin]);
        let ctx = PageContext {
            session: Some(&admin),
            path: "/account/users",
            flash: &flash,
        };
        let html = navbar(&ctx);
        assert!(html.contains(r#"<a class="" href="/">Classement</a>"#));
        assert!(html.contains(r#"<a class="active" href="/account/users">Utilisateurs</a>"#));

        let user = session(&[Scope::User]);
        let ctx = PageContext {
            session: Some(&user),
            path: "/",
            flash: &flash,
        };
        let html = navbar(&ctx);
        assert!(html.contains(r#"<a class="active" href="/">Classement</a>"#));
        assert!(!html.contains("Utilisateurs"));
    }

    #[test]
    fn anonymous_navbar_only_offers_login() {
        let flash = Flash::default();
        let ctx = PageContext {
            session: None,
            path: "/",
            flash: &flash,
        };
        let html = navbar(&ctx);
        assert!(!html.contains("Classement"));
        assert!(html.contains("Se connecter"));
    }

    #[test]
    fn card_shows_rank_and_formatted_total() {
        let ranking = Ranking {
            rank: 2,
            total: 1234.56,
            account: RankedAccount {
                first_name: "Alice".to_string(),
                last_name: "Martin".to_string(),
                username: "alice".to_string(),
                balance: None,
                stocks: Some(vec![Holding {
                    symbol: "ABC".to_string(),
                    quantity: 3.0,
                }]),
            },
        };
        let html = user_card(&ranking, &PriceMap::new());
        assert!(html.contains("#2"));
        assert!(html.contains("AM"));
        assert!(html.contains("0,00\u{a0}€"));
        assert!(html.contains("1\u{202f}234,56\u{a0}€"));
        assert!(html.contains("<td>ABC</td><td>3</td><td></td>"));
    }

    #[test]
    fn disabled_accounts_have_no_details() {
        let account = Account {
            id: 7,
            first_name: "Bob".to_string(),
            last_name: "Durand".to_string(),
            username: "bob".to_string(),
            balance: Some(10.0),
            scope: Scope::User,
            enabled: false,
            stocks: None,
        };
        let html = account_row(&account);
        assert!(!html.contains("/account/users/7/balance"));
        assert!(html.contains("/account/users/7/delete"));

        let enabled = Account {
            enabled: true,
            ..account
        };
        assert!(account_row(&enabled).contains("/account/users/7/balance"));
    }

    #[test]
    fn flash_messages_are_escaped() {
        let flash = Flash {
            notice: None,
            error: Some("<b>boom</b>".to_string()),
        };
        assert_eq!(
            super::flash(&flash),
            r#"<p class="error" role="alert">&lt;b&gt;boom&lt;/b&gt;</p>"#
        );
    }
}
