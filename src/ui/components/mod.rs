pub mod chat_area;
pub mod group_dialog;
pub mod input_bar;
pub mod login;
pub mod sidebar;
