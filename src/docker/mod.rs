pub mod composer;
pub mod image_manager;
pub mod layout;
pub mod startup_command;
