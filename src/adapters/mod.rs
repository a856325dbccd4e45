// Adapters layer: concrete implementations of the domain ports (backend http, auth, local files).

pub mod auth;
pub mod rest;
pub mod storage;
