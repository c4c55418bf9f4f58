mod auth;
mod search;
