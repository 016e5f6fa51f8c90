// src/links.rs
use crate::models::Scope;
use crate::pages;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icon {
    Person,
    ListBullet,
}

/// A role-gated navigation entry.
#[derive(Debug, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub href: &'static str,
    pub allowed_roles: &'static [Scope],
    pub icon: Option<Icon>,
}

pub const NAV_LINKS: &[NavLink] = &[
    NavLink {
        label: "Classement",
        href: pages::INDEX,
        allowed_roles: &[Scope::User, Scope::Admin],
        icon: None,
    },
    NavLink {
        label: "Utilisateurs",
        href: pages::account::USERS,
        allowed_roles: &[Scope::Admin],
        icon: None,
    },
];

pub const TAB_LINKS: &[NavLink] = &[
    NavLink {
        label: "Mon compte",
        href: pages::account::INDEX,
        allowed_roles: &[Scope::User, Scope::Admin],
        icon: Some(Icon::Person),
    },
    NavLink {
        label: "Comptes utilisateurs",
        href: pages::account::USERS,
        allowed_roles: &[Scope::Admin],
        icon: Some(Icon::ListBullet),
    },
];

/// First link whose href equals `current_path` exactly.
pub fn find_active_link<'a>(links: &'a [NavLink], current_path: &str) -> Option<&'a NavLink> {
    links.iter().find(|link| link.href == current_path)
}

/// Links visible to the caller, in their original order.
///
/// Without a caller there is nothing to show.
pub fn filter_links<'a>(links: &'a [NavLink], caller_roles: Option<&[Scope]>) -> Vec<&'a NavLink> {
    match caller_roles {
        Some(roles) => links
            .iter()
            .filter(|link| link.allowed_roles.iter().any(|role| roles.contains(role)))
            .collect(),
        None => Vec::new(),
    }
}

/// Whether the caller may open `path`. Paths no link points at are unrestricted.
pub fn is_allowed(links: &[NavLink], path: &str, caller_roles: Option<&[Scope]>) -> bool {
    match find_active_link(links, path) {
        Some(link) => filter_links(links, caller_roles).contains(&link),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERLAPPING: &[NavLink] = &[
        NavLink {
            label: "Compte",
            href: "/account",
            allowed_roles: &[Scope::User],
            icon: None,
        },
        NavLink {
            label: "Utilisateurs",
            href: "/account/users",
            allowed_roles: &[Scope::Admin],
            icon: None,
        },
    ];

    fn hrefs(links: &[&NavLink]) -> Vec<&'static str> {
        links.iter().map(|link| link.href).collect()
    }

    #[test]
    fn active_link_uses_exact_match() {
        let found = find_active_link(OVERLAPPING, "/account/users").unwrap();
        assert_eq!(found.href, "/account/users");
        assert_eq!(find_active_link(OVERLAPPING, "/account").unwrap().label, "Compte");
        assert!(find_active_link(OVERLAPPING, "/acc").is_none());
        assert!(find_active_link(OVERLAPPING, "/account/users/3").is_none());
    }

    #[test]
    fn anonymous_caller_sees_nothing() {
        assert!(filter_links(NAV_LINKS, None).is_empty());
        assert!(filter_links(TAB_LINKS, None).is_empty());
    }

    #[test]
    fn user_sees_only_shared_links() {
        let roles = [Scope::User];
        assert_eq!(hrefs(&filter_links(NAV_LINKS, Some(&roles))), vec!["/"]);
        assert_eq!(hrefs(&filter_links(TAB_LINKS, Some(&roles))), vec!["/account"]);
    }

    #[test]
    fn admin_sees_everything_in_order() {
        let roles = [Scope::Admin];
        assert_eq!(
            hrefs(&filter_links(NAV_LINKS, Some(&roles))),
            vec!["/", "/account/users"]
        );
    }

    #[test]
    fn empty_role_set_sees_nothing() {
        assert!(filter_links(NAV_LINKS, Some(&[])).is_empty());
        assert!(filter_links(NAV_LINKS, Some(&[Scope::Service])).is_empty());
    }

    #[test]
    fn guards_follow_link_roles() {
        let user = [Scope::User];
        let admin = [Scope::Admin];
        assert!(!is_allowed(TAB_LINKS, "/account/users", Some(&user)));
        assert!(is_allowed(TAB_LINKS, "/account/users", Some(&admin)));
        assert!(is_allowed(TAB_LINKS, "/account", Some(&user)));
        assert!(!is_allowed(TAB_LINKS, "/account", None));
        assert!(is_allowed(TAB_LINKS, "/login", None));
    }
}
