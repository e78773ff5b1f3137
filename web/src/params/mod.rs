pub mod ticket;
pub mod user_session;
