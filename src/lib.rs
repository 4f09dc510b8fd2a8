// Library for tests to access modules

pub mod config;
pub mod history_repo;
pub mod models;
pub mod render;
pub mod routes;
pub mod snmp_repo;
pub mod status_board;
pub mod units;
pub mod version;
pub mod worker;
