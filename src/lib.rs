pub mod config;
pub mod dom;
pub mod profile;
pub mod render;
pub mod role;
pub mod scenario;
pub mod server;
pub mod studio;
#[doc(hidden)]
pub mod test_support;
pub mod widget;
