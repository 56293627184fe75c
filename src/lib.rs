pub mod batch;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod recurring;
