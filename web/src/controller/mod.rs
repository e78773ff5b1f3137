pub mod health_check_controller;
pub mod ticket_controller;
pub mod user_session_controller;
