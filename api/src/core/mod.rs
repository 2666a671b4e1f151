pub mod app_state;
pub mod delivery_locks;
pub mod http;
