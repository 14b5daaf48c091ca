//! Controller document settings and category link lists.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Settings overview response.
#[derive(Debug, Serialize)]
pub struct SettingsOverview {
    pub categories: Vec<String>,
    pub tasks: Vec<String>,
}

/// Category and task names, for picking what to edit.
pub async fn settings_overview(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<SettingsOverview>> {
    let document = state.catalog.load().await?;

    Ok(Json(SettingsOverview {
        categories: document.category_names(),
        tasks: document.task_names(),
    }))
}

/// Settings response.
#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub settings: Value,
}

/// Settings update request. Keys are merged into the stored object.
#[derive(Debug, Deserialize)]
pub struct SettingsUpdateRequest {
    pub settings: Map<String, Value>,
}

/// Get global settings.
pub async fn get_global_settings(
    State(state): State<AppState>,
    _user: AuthUser,
) -> ApiResult<Json<SettingsResponse>> {
    let document = state.catalog.load().await?;

    Ok(Json(SettingsResponse {
        category: None,
        settings: as_object(document.global_settings),
    }))
}

/// Update global settings.
pub async fn update_global_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SettingsUpdateRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    let keys = request.settings.len();
    let settings = state
        .catalog
        .update(|document| {
            merge_into(&mut document.global_settings, request.settings);
            Ok::<_, ApiError>(document.global_settings.clone())
        })
        .await?;

    info!(user = %user.subject, keys, "Global settings updated");
    Ok(Json(SettingsResponse {
        category: None,
        settings,
    }))
}

/// Get one category's settings.
pub async fn get_category_settings(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(name): Path<String>,
) -> ApiResult<Json<SettingsResponse>> {
    let mut document = state.catalog.load().await?;
    let settings = document
        .categories
        .remove(&name)
        .ok_or_else(|| category_not_found(&name))?;

    Ok(Json(SettingsResponse {
        category: Some(name),
        settings: as_object(settings),
    }))
}

/// Update one category's settings.
pub async fn update_category_settings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
    Json(request): Json<SettingsUpdateRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    let settings = state
        .catalog
        .update(|document| {
            let settings = document
                .categories
                .get_mut(&name)
                .ok_or_else(|| category_not_found(&name))?;
            merge_into(settings, request.settings);
            Ok::<_, ApiError>(settings.clone())
        })
        .await?;

    info!(user = %user.subject, category = %name, "Category settings updated");
    Ok(Json(SettingsResponse {
        category: Some(name),
        settings,
    }))
}

/// A category's stored link list.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryLinks {
    pub links: Vec<String>,
}

/// Links of a category whose extractor reads them from the controller file.
pub async fn get_category_links(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(name): Path<String>,
) -> ApiResult<Json<CategoryLinks>> {
    let document = state.catalog.load().await?;
    if !document.categories.contains_key(&name) {
        return Err(category_not_found(&name));
    }
    if !document.has_editable_links(&name) {
        return Err(links_not_editable(&name));
    }

    Ok(Json(CategoryLinks {
        links: document.category_links(&name),
    }))
}

/// Replace a category's link list. Blank entries are dropped.
pub async fn update_category_links(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
    Json(request): Json<CategoryLinks>,
) -> ApiResult<Json<CategoryLinks>> {
    let links = state
        .catalog
        .update(|document| {
            if !document.categories.contains_key(&name) {
                return Err(category_not_found(&name));
            }
            if !document.has_editable_links(&name) {
                return Err(links_not_editable(&name));
            }
            document.set_category_links(&name, &request.links);
            Ok(document.category_links(&name))
        })
        .await?;

    info!(user = %user.subject, category = %name, links = links.len(), "Category links updated");
    Ok(Json(CategoryLinks { links }))
}

fn category_not_found(name: &str) -> ApiError {
    ApiError::NotFound(format!("Category '{}' not found", name))
}

fn links_not_editable(name: &str) -> ApiError {
    ApiError::Unprocessable(format!("Direct link editing not supported for '{}'", name))
}

/// Settings stored as anything but an object read as empty.
fn as_object(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        _ => Value::Object(Map::new()),
    }
}

fn merge_into(target: &mut Value, updates: Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        map.extend(updates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_into_keeps_other_keys() {
        let mut settings = json!({"ollama_model": "llama3", "ollama_timeout": 60});
        let updates = json!({"ollama_timeout": 120, "ollama_api_url": null});
        merge_into(&mut settings, updates.as_object().unwrap().clone());

        assert_eq!(
            settings,
            json!({"ollama_model": "llama3", "ollama_timeout": 120, "ollama_api_url": null})
        );
    }

    #[test]
    fn test_merge_into_replaces_non_object() {
        let mut settings = Value::Null;
        merge_into(&mut settings, json!({"a": 1}).as_object().unwrap().clone());
        assert_eq!(settings, json!({"a": 1}));
    }
}
