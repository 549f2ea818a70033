use axum::{extract::Query, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

const DEFAULT_NAME: &str = "Guest";

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HelloResponse {
    pub message: String,
}

/// First `name` value wins; repeated or unrelated parameters are ignored.
fn greeting_name(params: Vec<(String, String)>) -> String {
    params
        .into_iter()
        .find(|(key, _)| key == "name")
        .map(|(_, value)| value)
        .unwrap_or_else(|| DEFAULT_NAME.to_string())
}

/// Echo greeting; never touches the store.
pub async fn hello(Query(params): Query<Vec<(String, String)>>) -> Json<HelloResponse> {
    let name = greeting_name(params);
    info!(%name, "greeting");
    Json(HelloResponse { message: format!("Hello, {name}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn first_name_parameter_is_used() {
        assert_eq!(greeting_name(pairs(&[("name", "Ada"), ("name", "Bob")])), "Ada");
        assert_eq!(greeting_name(pairs(&[("lang", "en"), ("name", "Bob")])), "Bob");
        assert_eq!(greeting_name(pairs(&[("lang", "en")])), "Guest");
        assert_eq!(greeting_name(Vec::new()), "Guest");
        assert_eq!(greeting_name(pairs(&[("name", "")])), "");
    }
}
