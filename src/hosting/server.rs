// Lifecycle of the app's hosted server.

use serde_json::json;

use crate::api::Transport;
use crate::error::ApiError;
use crate::models::ServerStatus;

const SERVER_PATH: &str = "/appstax/hosting/server";

/// Actions the backend accepts on a running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerAction {
    Start,
    Stop,
}

impl ServerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerAction::Start => "start",
            ServerAction::Stop => "stop",
        }
    }
}

pub fn create_server<T: Transport + ?Sized>(api: &T, access_code: &str) -> Result<(), ApiError> {
    api.post(SERVER_PATH, &json!({ "accessCode": access_code }))?;
    Ok(())
}

pub fn delete_server<T: Transport + ?Sized>(api: &T) -> Result<(), ApiError> {
    api.delete(SERVER_PATH)?;
    Ok(())
}

pub fn get_server_status<T: Transport + ?Sized>(api: &T) -> Result<ServerStatus, ApiError> {
    api.get(SERVER_PATH)?.json()
}

pub fn send_server_action<T: Transport + ?Sized>(
    api: &T,
    action: ServerAction,
) -> Result<(), ApiError> {
    api.post(
        &format!("{}/{}", SERVER_PATH, action.as_str()),
        &serde_json::Value::Null,
    )?;
    Ok(())
}

/// The last `nlines` lines of the server log, as plain text.
pub fn get_server_log<T: Transport + ?Sized>(api: &T, nlines: u64) -> Result<String, ApiError> {
    Ok(api
        .get(&format!("{}/logs?nlines={}", SERVER_PATH, nlines))?
        .text())
}
