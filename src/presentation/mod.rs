// Presentation layer - Console dashboard and operator input
pub mod alert;
pub mod console_commands;
pub mod console_view;
