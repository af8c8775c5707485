// Typed records for the entities the backend returns.
//
// Identifiers the backend assigns default to empty strings so a record
// can be built locally and posted before it has one. Names are required
// when decoding, so a malformed response fails with a decode error.

use serde::{Deserialize, Serialize};

fn is_empty(s: &str) -> bool {
    s.is_empty()
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct App {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub app_key: String,
    pub app_name: String,
    #[serde(default)]
    pub app_description: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub account_id: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub payment_plan: String,
    #[serde(default)]
    pub hosting_subdomain: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<Collection>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub collection_id: String,
    pub collection_name: String,
    #[serde(default, skip_serializing_if = "is_empty")]
    pub app_id: String,
    /// Column definitions; their shape is owned by the backend.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub schema: serde_json::Value,
}

/// A link between two collections, e.g. `posts.comments -> comments`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(default, skip_serializing_if = "is_empty")]
    pub relation_id: String,
    #[serde(default)]
    pub relation_type: String,
    #[serde(default)]
    pub source_collection: String,
    #[serde(default)]
    pub source_property: String,
    #[serde(default)]
    pub target_collection: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub apps: Vec<App>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ServerStatus {
    pub status: String,
}

/// Identity returned by login and signup.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub user_id: String,
    pub account_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_decodes_with_missing_optional_fields() {
        let app: App = serde_json::from_str(
            r#"{"appId":"a1","appKey":"k1","appName":"Blog","hostingSubdomain":"blog"}"#,
        )
        .unwrap();
        assert_eq!(app.app_id, "a1");
        assert_eq!(app.hosting_subdomain, "blog");
        assert!(app.collections.is_empty());
    }

    #[test]
    fn test_app_missing_name_is_a_decode_error() {
        let res: Result<App, _> = serde_json::from_str(r#"{"appId":"a1"}"#);
        assert!(res.is_err());
        let res: Result<User, _> = serde_json::from_str(r#"{"apps":"nope","userId":"u"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_new_app_serializes_without_server_assigned_ids() {
        let app = App {
            app_name: "Blog".into(),
            app_description: "My blog".into(),
            account_id: "acc".into(),
            payment_plan: "PROTOTYPE".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(&app).unwrap();
        assert!(v.get("appId").is_none());
        assert!(v.get("collections").is_none());
        assert_eq!(v["paymentPlan"], "PROTOTYPE");
        assert_eq!(v["accountId"], "acc");
    }
}
