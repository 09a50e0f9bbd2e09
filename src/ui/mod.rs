pub mod navbar;
pub mod sidebar;
pub mod theme;
pub mod viewer;
