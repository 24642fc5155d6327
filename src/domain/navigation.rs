use serde::Serialize;
use utoipa::ToSchema;

use crate::model::role::{Capability, Role};

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Page {
    pub path: &'static str,
    pub label: &'static str,
    /// `None` means any signed-in user.
    pub capability: Option<Capability>,
    #[serde(skip)]
    in_menu: bool,
}

const fn page(
    path: &'static str,
    label: &'static str,
    capability: Option<Capability>,
    in_menu: bool,
) -> Page {
    Page {
        path,
        label,
        capability,
        in_menu,
    }
}

/// Every protected page, in sidebar order.
pub const PAGES: &[Page] = &[
    page(HOME_PATH, "ダッシュボード", None, true),
    page("/attendance", "打刻", Some(Capability::Punch), true),
    page("/attendance/history", "勤怠履歴", Some(Capability::ViewHistory), true),
    page("/requests", "申請", Some(Capability::SubmitRequests), true),
    page("/requests/new", "新規申請", Some(Capability::SubmitRequests), false),
    page("/requests/approval", "承認", Some(Capability::ApproveRequests), true),
    page("/admin", "管理", Some(Capability::ManageEmployees), false),
    page("/admin/employees", "社員管理", Some(Capability::ManageEmployees), true),
    page("/admin/employees/new", "社員登録", Some(Capability::ManageEmployees), false),
    page("/admin/departments", "部門管理", Some(Capability::ManageDepartments), true),
    page("/admin/reports", "レポート", Some(Capability::ViewReports), true),
];

const PROTECTED_PREFIXES: [&str; 4] = [HOME_PATH, "/attendance", "/requests", "/admin"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RouteDecision {
    Allow,
    Redirect { to: &'static str },
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Most specific page covering `path`.
fn page_for(path: &str) -> Option<&'static Page> {
    PAGES
        .iter()
        .filter(|p| matches_prefix(path, p.path))
        .max_by_key(|p| p.path.len())
}

/// Decides whether a navigation to `path` proceeds, given the caller's role
/// (`None` when not signed in).
pub fn resolve(path: &str, role: Option<Role>) -> RouteDecision {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    if path == LOGIN_PATH {
        return match role {
            Some(_) => RouteDecision::Redirect { to: HOME_PATH },
            None => RouteDecision::Allow,
        };
    }

    let protected = PROTECTED_PREFIXES
        .iter()
        .any(|prefix| matches_prefix(path, prefix));
    if !protected {
        return RouteDecision::Allow;
    }

    let Some(role) = role else {
        return RouteDecision::Redirect { to: LOGIN_PATH };
    };

    match page_for(path).and_then(|p| p.capability) {
        Some(cap) if !role.can(cap) => RouteDecision::Redirect { to: HOME_PATH },
        _ => RouteDecision::Allow,
    }
}

/// Sidebar entries visible to `role`.
pub fn menu_for(role: Role) -> Vec<Page> {
    PAGES
        .iter()
        .filter(|p| p.in_menu)
        .filter(|p| p.capability.is_none_or(|cap| role.can(cap)))
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_users_are_sent_to_login() {
        for path in ["/dashboard", "/attendance/history?month=2025-04", "/admin/reports"] {
            assert_eq!(
                resolve(path, None),
                RouteDecision::Redirect { to: LOGIN_PATH },
                "{path}"
            );
        }
        assert_eq!(resolve("/login", None), RouteDecision::Allow);
    }

    #[test]
    fn signed_in_users_skip_login() {
        assert_eq!(
            resolve("/login", Some(Role::Employee)),
            RouteDecision::Redirect { to: HOME_PATH }
        );
    }

    #[test]
    fn role_gates_apply_to_nested_pages() {
        assert_eq!(
            resolve("/requests/approval", Some(Role::Employee)),
            RouteDecision::Redirect { to: HOME_PATH }
        );
        assert_eq!(resolve("/requests/approval", Some(Role::Manager)), RouteDecision::Allow);
        assert_eq!(
            resolve("/admin/employees/new", Some(Role::Manager)),
            RouteDecision::Redirect { to: HOME_PATH }
        );
        assert_eq!(
            resolve("/admin/unknown", Some(Role::Manager)),
            RouteDecision::Redirect { to: HOME_PATH }
        );
        assert_eq!(resolve("/admin/reports/", Some(Role::Admin)), RouteDecision::Allow);
    }

    #[test]
    fn similar_prefixes_do_not_match() {
        assert_eq!(resolve("/administrator", None), RouteDecision::Allow);
        assert_eq!(resolve("/requestsx", None), RouteDecision::Allow);
    }

    #[test]
    fn menu_follows_capabilities() {
        let paths = |role| menu_for(role).iter().map(|p| p.path).collect::<Vec<_>>();

        assert_eq!(
            paths(Role::Employee),
            vec!["/dashboard", "/attendance", "/attendance/history", "/requests"]
        );
        assert!(paths(Role::Manager).contains(&"/requests/approval"));
        assert!(!paths(Role::Manager).contains(&"/admin/employees"));
        assert_eq!(paths(Role::Admin).len(), 8);
    }

    #[test]
    fn decisions_serialize_with_a_tag() {
        let json = serde_json::to_value(RouteDecision::Redirect { to: LOGIN_PATH }).unwrap();
        assert_eq!(json, serde_json::json!({"decision": "redirect", "to": "/login"}));
    }
}
