#![deny(clippy::all)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![warn(clippy::todo)]
// #![warn(clippy::cargo)]
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]

#[tokio::main]
async fn main() {
    app::run().await;
}

#[cfg(test)]
mod tests {
    mod support;

    mod auth_tests;
    mod jwt_tests;
    mod projects_tests;
    mod tasks_tests;
    mod tenants_tests;
    mod users_tests;
}

pub mod cfg {
    mod app_settings;
    mod database_settings;
    mod jwt_settings;
    mod server_settings;
    mod tenancy_settings;

    pub use app_settings::*;
    pub use database_settings::*;
    pub use jwt_settings::*;
    pub use server_settings::*;
    pub use tenancy_settings::*;
}

pub mod core {
    mod context;
    mod dberror;
    mod dbpool;
    mod error;
    mod pagination;
    mod response;
    mod validation;

    pub use context::*;
    pub use dberror::*;
    pub use dbpool::*;
    pub use error::*;
    pub use pagination::*;
    pub use response::*;
    pub use validation::*;
}

pub mod auth {
    pub mod guard;
    mod jwt;
    mod password;
    mod policy;
    mod principal;

    pub use jwt::*;
    pub use password::*;
    pub use policy::*;
    pub use principal::*;
}

pub mod db {
    mod audit_logs;
    mod projects;
    mod tasks;
    mod tenants;
    mod types;
    mod users;

    pub use audit_logs::*;
    pub use projects::*;
    pub use tasks::*;
    pub use tenants::*;
    pub use types::*;
    pub use users::*;
}

pub mod routes {
    pub mod auth;
    pub mod health;
    pub mod projects;
    pub mod tasks;
    pub mod tenants;
    pub mod users;
}

pub mod services {
    pub mod audit;
    pub mod quota;
}

pub mod app {
    mod cli;
    mod migrations;
    mod router;
    mod server;

    pub use cli::*;
    pub use migrations::*;
    pub use router::*;
    pub use server::*;
}
