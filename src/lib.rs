// Library root
// -----------
// This crate exposes the library surface of the `appstax` CLI. The binary
// (`main.rs`) parses the command line and hands off to `ui`.
//
// Module responsibilities:
// - `api`: blocking HTTP client for the Appstax backend and the
//   `Transport` trait the rest of the crate talks to.
// - `account`: typed calls for sessions, apps, collections and relations.
// - `hosting`: the deploy pipeline (filter, archive, package, upload,
//   orchestrate) plus server hosting management.
// - `config` / `session`: `appstax.conf` and the persisted login session.
// - `logging`: file logger set up once at startup.
// - `select`: decision logic behind the interactive prompts.
// - `ui`: dialoguer/indicatif flows for every command.
pub mod account;
pub mod api;
pub mod config;
pub mod error;
pub mod hosting;
pub mod logging;
pub mod models;
pub mod select;
pub mod session;
pub mod ui;
