pub mod pastes_handler;
pub mod problem;
