// Sessions, apps, collections and relations.
//
// Every call goes through a `Transport`, so the same functions work
// against the real backend and the fakes used in tests.

use serde::Deserialize;
use serde_json::json;

use crate::api::{Transport, SESSION_HEADER};
use crate::error::ApiError;
use crate::models::{App, Collection, Relation, SessionInfo, User};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityBody {
    user_id: String,
    account_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewAppBody {
    app_id: String,
}

#[derive(Deserialize)]
struct ObjectsBody {
    #[serde(default)]
    objects: Vec<serde_json::Map<String, serde_json::Value>>,
}

fn session_from<T: Transport + ?Sized>(
    api: &T,
    path: &str,
    body: serde_json::Value,
) -> Result<SessionInfo, ApiError> {
    let res = api.post(path, &body)?;
    let identity: IdentityBody = res.json()?;
    let session_id = res
        .header(SESSION_HEADER)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::NotFound(format!("No session id returned by {}", path)))?
        .to_string();
    tracing::debug!("Session established for user {}", identity.user_id);
    Ok(SessionInfo {
        session_id,
        user_id: identity.user_id,
        account_id: identity.account_id,
    })
}

pub fn login<T: Transport + ?Sized>(
    api: &T,
    email: &str,
    password: &str,
) -> Result<SessionInfo, ApiError> {
    session_from(
        api,
        "/appstax/sessions",
        json!({ "email": email, "password": password }),
    )
}

pub fn signup<T: Transport + ?Sized>(
    api: &T,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<SessionInfo, ApiError> {
    session_from(
        api,
        "/appstax/users",
        json!({
            "firstName": first_name,
            "lastName": last_name,
            "email": email,
            "password": password,
        }),
    )
}

pub fn get_user<T: Transport + ?Sized>(api: &T, user_id: &str) -> Result<User, ApiError> {
    api.get(&format!("/appstax/users/{}", user_id))?.json()
}

pub fn get_user_apps<T: Transport + ?Sized>(api: &T, user_id: &str) -> Result<Vec<App>, ApiError> {
    Ok(get_user(api, user_id)?.apps)
}

pub fn get_app_by_id<T: Transport + ?Sized>(api: &T, app_id: &str) -> Result<App, ApiError> {
    api.get(&format!("/appstax/apps/{}", app_id))?.json()
}

pub fn get_app_by_key<T: Transport + ?Sized>(
    api: &T,
    user_id: &str,
    app_key: &str,
) -> Result<App, ApiError> {
    get_user_apps(api, user_id)?
        .into_iter()
        .find(|app| app.app_key == app_key)
        .ok_or_else(|| ApiError::NotFound("App not found".into()))
}

/// The configured app, fetched in full (with its collections).
pub fn get_current_app<T: Transport + ?Sized>(
    api: &T,
    user_id: &str,
    app_key: &str,
) -> Result<App, ApiError> {
    let app = get_app_by_key(api, user_id, app_key)?;
    get_app_by_id(api, &app.app_id)
}

pub fn save_app<T: Transport + ?Sized>(api: &T, app: &App) -> Result<(), ApiError> {
    api.put(
        &format!("/appstax/apps/{}", app.app_id),
        &serde_json::to_value(app)?,
    )?;
    Ok(())
}

/// Create `app` and return it as the backend stored it.
pub fn save_new_app<T: Transport + ?Sized>(api: &T, app: &App) -> Result<App, ApiError> {
    let created: NewAppBody = api.post("/appstax/apps", &serde_json::to_value(app)?)?.json()?;
    get_app_by_id(api, &created.app_id)
}

pub fn save_new_collection<T: Transport + ?Sized>(
    api: &T,
    collection: &Collection,
) -> Result<Collection, ApiError> {
    let created: Collection = api
        .post("/appstax/collections", &serde_json::to_value(collection)?)?
        .json()?;
    get_collection_by_id(api, &created.collection_id)
}

pub fn get_collection_by_id<T: Transport + ?Sized>(
    api: &T,
    id: &str,
) -> Result<Collection, ApiError> {
    api.get(&format!("/appstax/collections/{}", id))?.json()
}

pub fn get_collection_by_name<T: Transport + ?Sized>(
    api: &T,
    user_id: &str,
    app_key: &str,
    name: &str,
) -> Result<Collection, ApiError> {
    get_current_app(api, user_id, app_key)?
        .collections
        .into_iter()
        .find(|c| c.collection_name == name)
        .ok_or_else(|| ApiError::NotFound(format!("Collection '{}' not found", name)))
}

/// Objects in `collection` matching `filter`. Objects are user data, so
/// they stay as JSON maps.
pub fn get_objects<T: Transport + ?Sized>(
    api: &T,
    collection: &str,
    filter: &str,
) -> Result<Vec<serde_json::Map<String, serde_json::Value>>, ApiError> {
    let path = format!("/objects/{}?{}", collection, encode_query(&[("filter", filter)]));
    let body: ObjectsBody = api.get(&path)?.json()?;
    Ok(body.objects)
}

/// Create `relation` on the configured app and return it with its id.
pub fn save_new_relation<T: Transport + ?Sized>(
    api: &T,
    user_id: &str,
    app_key: &str,
    relation: &Relation,
) -> Result<Relation, ApiError> {
    let app = get_current_app(api, user_id, app_key)?;
    let created: Relation = api
        .post(
            &format!("/appstax/apps/{}/relations", app.app_id),
            &serde_json::to_value(relation)?,
        )?
        .json()?;
    Ok(Relation {
        relation_id: created.relation_id,
        ..relation.clone()
    })
}

pub fn get_cors_origins<T: Transport + ?Sized>(
    api: &T,
    app_id: &str,
) -> Result<Vec<String>, ApiError> {
    api.get(&format!("/appstax/apps/{}/origins", app_id))?.json()
}

/// Add `origin` to the app's CORS origins unless it is already there.
pub fn add_cors_origin<T: Transport + ?Sized>(
    api: &T,
    app_id: &str,
    origin: &str,
) -> Result<(), ApiError> {
    let mut origins = get_cors_origins(api, app_id)?;
    tracing::debug!("Existing CORS origins for app {}: {:?}", app_id, origins);
    if !origins.iter().any(|o| o == origin) {
        origins.push(origin.to_string());
        api.put(
            &format!("/appstax/apps/{}/origins", app_id),
            &serde_json::to_value(&origins)?,
        )?;
        tracing::debug!("Added new CORS origin: {:?}", origins);
    }
    Ok(())
}

/// Public URL of the app's hosted files, or empty if no subdomain is set.
pub fn format_hosting_url(app: &App) -> String {
    if app.hosting_subdomain.is_empty() {
        String::new()
    } else {
        format!("http://{}.appstax.io", app.hosting_subdomain)
    }
}

fn encode_query(pairs: &[(&str, &str)]) -> String {
    match reqwest::Url::parse_with_params("http://localhost/", pairs) {
        Ok(url) => url.query().unwrap_or_default().to_string(),
        Err(_) => String::new(),
    }
}
