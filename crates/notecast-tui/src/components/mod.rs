pub mod header;
pub mod help_overlay;
pub mod home;
pub mod library;
pub mod log_panel;
pub mod player;
pub mod player_bar;
pub mod processing;
pub mod upload;
