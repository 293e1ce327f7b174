//! Business logic services

pub mod auth;
pub mod zabbix;

pub use auth::AuthService;
pub use zabbix::ZabbixClient;
