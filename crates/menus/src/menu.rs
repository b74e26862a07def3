use serde::{Deserialize, Serialize};

use crm_core::{DomainError, MenuId, RoleId};

pub const MENU_NAME_MAX: usize = 100;
pub const HREF_MAX: usize = 20;

/// A navigation entry shown to users whose role was granted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    pub menu_id: MenuId,
    pub menu_name: String,
    pub href: String,
    pub icon: String,
}

/// Grant of a menu to a role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMenu {
    pub role_id: RoleId,
    pub menu_id: MenuId,
}

fn checked(field: &str, value: String, max: Option<usize>) -> Result<String, DomainError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(DomainError::field(field, "must not be empty"));
    }
    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(DomainError::field(
                field,
                format!("must be at most {max} characters"),
            ));
        }
    }
    Ok(value)
}

/// Validated input for a new menu; the store assigns `menu_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMenu {
    pub menu_name: String,
    pub href: String,
    pub icon: String,
}

impl NewMenu {
    pub fn parse(
        menu_name: Option<String>,
        href: Option<String>,
        icon: Option<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            menu_name: checked("menuName", menu_name.unwrap_or_default(), Some(MENU_NAME_MAX))?,
            href: checked("href", href.unwrap_or_default(), Some(HREF_MAX))?,
            icon: checked("icon", icon.unwrap_or_default(), None)?,
        })
    }

    pub fn into_menu(self, menu_id: MenuId) -> Menu {
        Menu {
            menu_id,
            menu_name: self.menu_name,
            href: self.href,
            icon: self.icon,
        }
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuUpdate {
    pub menu_name: Option<String>,
    pub href: Option<String>,
    pub icon: Option<String>,
}

impl MenuUpdate {
    pub fn parse(
        menu_name: Option<String>,
        href: Option<String>,
        icon: Option<String>,
    ) -> Result<Self, DomainError> {
        if menu_name.is_none() && href.is_none() && icon.is_none() {
            return Err(DomainError::validation("at least one menu field is required"));
        }
        Ok(Self {
            menu_name: menu_name
                .map(|v| checked("menuName", v, Some(MENU_NAME_MAX)))
                .transpose()?,
            href: href.map(|v| checked("href", v, Some(HREF_MAX))).transpose()?,
            icon: icon.map(|v| checked("icon", v, None)).transpose()?,
        })
    }

    pub fn apply(self, menu: &mut Menu) {
        if let Some(name) = self.menu_name {
            menu.menu_name = name;
        }
        if let Some(href) = self.href {
            menu.href = href;
        }
        if let Some(icon) = self.icon {
            menu.icon = icon;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn new_menu_trims_and_checks_limits() {
        let menu = NewMenu::parse(s(" Dashboard "), s("/home"), s("home"))
            .unwrap()
            .into_menu(MenuId::new(7));
        assert_eq!(menu.menu_name, "Dashboard");
        assert_eq!(menu.menu_id, MenuId::new(7));

        let err = NewMenu::parse(s("Reports"), Some("/".repeat(HREF_MAX + 1)), s("i")).unwrap_err();
        assert_eq!(err, DomainError::field("href", "must be at most 20 characters"));

        let err = NewMenu::parse(None, s("/x"), s("i")).unwrap_err();
        assert_eq!(err, DomainError::field("menuName", "must not be empty"));
    }

    #[test]
    fn update_keeps_absent_fields() {
        let mut menu = NewMenu::parse(s("A"), s("/a"), s("a"))
            .unwrap()
            .into_menu(MenuId::new(1));
        MenuUpdate::parse(None, s("/b"), None).unwrap().apply(&mut menu);
        assert_eq!(menu.menu_name, "A");
        assert_eq!(menu.href, "/b");
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(MenuUpdate::parse(None, None, None).is_err());
        assert!(MenuUpdate::parse(s("  "), None, None).is_err());
    }

    #[test]
    fn menu_serializes_camel_case() {
        let menu = NewMenu::parse(s("A"), s("/a"), s("a"))
            .unwrap()
            .into_menu(MenuId::new(3));
        let json = serde_json::to_value(&menu).unwrap();
        assert_eq!(json["menuId"], 3);
        assert_eq!(json["menuName"], "A");
    }
}
