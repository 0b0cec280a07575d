pub mod bulk;
pub mod database;
pub mod redirector;
pub mod repositories;
