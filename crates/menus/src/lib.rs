//! Navigation menus and their per-role grants.

pub mod menu;
pub mod repository;
pub mod service;

pub use menu::{Menu, MenuUpdate, NewMenu, RoleMenu};
pub use repository::MenuRepository;
pub use service::MenusService;
