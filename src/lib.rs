pub mod cli;
pub mod config;
pub mod handler;
pub mod ingestion;
pub mod shipper;
pub mod shutdown;
pub mod web;
