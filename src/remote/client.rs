//! Rate-limited client for the content management API.
//!
//! All five mutating operations plus the list and schema lookups live
//! here. Every call acquires admission from the shared limiter before
//! touching the network. Mutating calls (except create) carry the
//! current version token in [`VERSION_HEADER`]; a 409 response maps to
//! [`Error::VersionConflict`], any other non-success status to
//! [`Error::RemoteRejected`].

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::model::EntityGroup;
use crate::remote::limiter::RateLimiter;
use crate::remote::types::{
    EntryList, EntryPayload, FieldMap, RemoteEntry, SchemaField, SchemaList, SCHEMA_HEADER,
    VERSION_HEADER,
};
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Client for entry operations against one space of the remote store.
#[derive(Debug)]
pub struct EntryClient {
    http: reqwest::Client,
    base_url: String,
    space: String,
    schema: String,
    access_token: String,
    default_locale: String,
    common_id_field: String,
    limiter: Arc<RateLimiter>,
}

impl EntryClient {
    /// Build a client from the remote configuration and a shared limiter.
    #[must_use]
    pub fn new(config: &RemoteConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            space: config.space.clone(),
            schema: config.schema.clone(),
            access_token: config.access_token.clone(),
            default_locale: config.default_locale.clone(),
            common_id_field: config.common_id_field.clone(),
            limiter,
        }
    }

    fn entries_url(&self) -> String {
        format!("{}/spaces/{}/entries", self.base_url, self.space)
    }

    fn entry_url(&self, entry_id: &str) -> String {
        format!("{}/{}", self.entries_url(), entry_id)
    }

    /// Create an entry from the group's per-locale field map.
    ///
    /// When the store rejects the creation and the group is not keyed by
    /// the default locale, one retry is made with every field value keyed
    /// under the default locale instead.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteRejected` if both attempts are refused.
    pub async fn create(
        &self,
        group: &EntityGroup,
        mapping: &BTreeMap<String, String>,
    ) -> Result<(String, String)> {
        let payload = EntryPayload {
            fields: self.build_fields(group, mapping, None),
        };
        let response = self.post_entry(&payload).await?;

        let response = if response.status() == StatusCode::CREATED
            || group.representative().locale == self.default_locale
        {
            response
        } else {
            // fallback: retry once keyed by the default locale
            tracing::info!(
                common_id = %group.common_id(),
                locale = %self.default_locale,
                "create rejected, retrying with default locale"
            );
            let payload = EntryPayload {
                fields: self.build_fields(group, mapping, Some(&self.default_locale)),
            };
            self.post_entry(&payload).await?
        };

        if response.status() != StatusCode::CREATED {
            return Err(rejection("create", None, response).await);
        }
        let entry: RemoteEntry = response.json().await?;
        Ok((entry.sys.id, entry.sys.version.to_string()))
    }

    async fn post_entry(&self, payload: &EntryPayload) -> Result<reqwest::Response> {
        self.limiter.admit().await;
        let response = self
            .http
            .post(self.entries_url())
            .bearer_auth(&self.access_token)
            .header(SCHEMA_HEADER, &self.schema)
            .json(payload)
            .send()
            .await?;
        Ok(response)
    }

    /// Replace an entry's full field map.
    ///
    /// # Errors
    ///
    /// Returns `Error::VersionConflict` on a stale version token, or
    /// `Error::RemoteRejected` on any other refusal.
    pub async fn update(
        &self,
        group: &EntityGroup,
        mapping: &BTreeMap<String, String>,
        entry_id: &str,
        version: &str,
    ) -> Result<String> {
        let payload = EntryPayload {
            fields: self.build_fields(group, mapping, None),
        };

        self.limiter.admit().await;
        let response = self
            .http
            .put(self.entry_url(entry_id))
            .bearer_auth(&self.access_token)
            .header(VERSION_HEADER, version)
            .json(&payload)
            .send()
            .await?;

        let entry = expect_entry("update", entry_id, version, response, StatusCode::OK).await?;
        Ok(entry.sys.version.to_string())
    }

    /// Mark an entry published.
    ///
    /// On success the store bumps the version again internally, so the
    /// next usable token is the reported published version plus one.
    ///
    /// # Errors
    ///
    /// Returns `Error::VersionConflict` or `Error::RemoteRejected`.
    pub async fn publish(&self, entry_id: &str, version: &str) -> Result<String> {
        self.limiter.admit().await;
        let response = self
            .http
            .put(format!("{}/published", self.entry_url(entry_id)))
            .bearer_auth(&self.access_token)
            .header(VERSION_HEADER, version)
            .send()
            .await?;

        let entry = expect_entry("publish", entry_id, version, response, StatusCode::OK).await?;
        let next = entry
            .sys
            .published_version
            .map_or(entry.sys.version, |v| v + 1);
        Ok(next.to_string())
    }

    /// Mark an entry draft (unpublish).
    ///
    /// Callers treat a failure here as "already draft" where the
    /// reconciliation semantics allow it; the client itself reports it.
    ///
    /// # Errors
    ///
    /// Returns `Error::VersionConflict` or `Error::RemoteRejected`.
    pub async fn unpublish(&self, entry_id: &str, version: &str) -> Result<String> {
        self.limiter.admit().await;
        let response = self
            .http
            .delete(format!("{}/published", self.entry_url(entry_id)))
            .bearer_auth(&self.access_token)
            .header(VERSION_HEADER, version)
            .send()
            .await?;

        let entry = expect_entry("unpublish", entry_id, version, response, StatusCode::OK).await?;
        Ok(entry.sys.version.to_string())
    }

    /// Delete an entry, unpublishing it first.
    ///
    /// The unpublish half is non-fatal (the entry may already be draft);
    /// the delete half is required.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteRejected` when the delete itself is refused.
    pub async fn delete(&self, entry_id: &str, version: &str) -> Result<()> {
        let version = match self.unpublish(entry_id, version).await {
            Ok(new_version) => new_version,
            Err(e) => {
                tracing::warn!(entry_id, error = %e, "unpublish before delete failed, continuing");
                version.to_string()
            }
        };

        self.limiter.admit().await;
        let response = self
            .http
            .delete(self.entry_url(entry_id))
            .bearer_auth(&self.access_token)
            .header(VERSION_HEADER, &version)
            .send()
            .await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(rejection("delete", Some(entry_id), response).await);
        }
        Ok(())
    }

    /// List all entries in the space.
    ///
    /// # Errors
    ///
    /// Returns `Error::RemoteRejected` on a non-success status.
    pub async fn list_entries(&self) -> Result<Vec<RemoteEntry>> {
        self.limiter.admit().await;
        let response = self
            .http
            .get(self.entries_url())
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection("list", None, response).await);
        }
        let list: EntryList = response.json().await?;
        Ok(list.items)
    }

    /// Look up the field list of a named schema.
    ///
    /// # Errors
    ///
    /// Returns `Error::SchemaNotFound` when no schema matches, or
    /// `Error::RemoteRejected` on a non-success status.
    pub async fn schema_fields(&self, name: &str) -> Result<Vec<SchemaField>> {
        self.limiter.admit().await;
        let response = self
            .http
            .get(format!("{}/spaces/{}/schemas", self.base_url, self.space))
            .query(&[("name", name)])
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection("schema lookup", None, response).await);
        }
        let list: SchemaList = response.json().await?;
        list.items
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.fields)
            .ok_or_else(|| Error::SchemaNotFound {
                name: name.to_string(),
            })
    }

    /// Assemble the per-locale field map for a group.
    ///
    /// Every mapped field collects one value per row, keyed by the row's
    /// locale (or by `locale_override` for the create fallback). The
    /// common-id field is populated identically for each locale so the
    /// remote entry always links back to its local entity.
    fn build_fields(
        &self,
        group: &EntityGroup,
        mapping: &BTreeMap<String, String>,
        locale_override: Option<&str>,
    ) -> FieldMap {
        let mut fields = FieldMap::new();
        let common_id = group.common_id().clone();

        for row in group.rows() {
            let locale = locale_override.unwrap_or(&row.locale).to_string();
            fields
                .entry(self.common_id_field.clone())
                .or_default()
                .insert(locale.clone(), common_id.clone());

            for (column, field) in mapping {
                let value = row.content.get(column).cloned().unwrap_or(Value::Null);
                fields
                    .entry(field.clone())
                    .or_default()
                    .insert(locale.clone(), value);
            }
        }
        fields
    }
}

/// Consume a response that should carry an entry body with the given
/// success status, mapping 409 to a version conflict.
async fn expect_entry(
    operation: &'static str,
    entry_id: &str,
    version: &str,
    response: reqwest::Response,
    expected: StatusCode,
) -> Result<RemoteEntry> {
    if response.status() == StatusCode::CONFLICT {
        return Err(Error::VersionConflict {
            entry_id: entry_id.to_string(),
            version: version.to_string(),
        });
    }
    if response.status() != expected {
        return Err(rejection(operation, Some(entry_id), response).await);
    }
    Ok(response.json().await?)
}

async fn rejection(
    operation: &'static str,
    entry_id: Option<&str>,
    response: reqwest::Response,
) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::RemoteRejected {
        operation,
        entry_id: entry_id.map(ToString::to_string),
        status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PublishStatus, Row};
    use serde_json::json;

    fn client() -> EntryClient {
        let config = RemoteConfig {
            common_id_field: "commonId".to_string(),
            default_locale: "en-US".to_string(),
            ..RemoteConfig::default()
        };
        EntryClient::new(
            &config,
            Arc::new(RateLimiter::new(&crate::config::RateLimitConfig::default())),
        )
    }

    fn row(pk: i64, locale: &str, title: &str) -> Row {
        let mut content = BTreeMap::new();
        content.insert("title".to_string(), json!(title));
        Row {
            pk,
            common_id: json!(10),
            entry_id: None,
            entry_version: None,
            status: Some(PublishStatus::Draft),
            locale: locale.to_string(),
            content,
        }
    }

    #[test]
    fn test_build_fields_unions_locales() {
        let client = client();
        let group = EntityGroup::new(vec![row(1, "en-US", "Hello"), row(2, "de-DE", "Hallo")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("title".to_string(), "headline".to_string());

        let fields = client.build_fields(&group, &mapping, None);
        assert_eq!(fields["headline"]["en-US"], json!("Hello"));
        assert_eq!(fields["headline"]["de-DE"], json!("Hallo"));
        assert_eq!(fields["commonId"]["en-US"], json!(10));
        assert_eq!(fields["commonId"]["de-DE"], json!(10));
    }

    #[test]
    fn test_build_fields_locale_override_collapses_to_one() {
        let client = client();
        let group = EntityGroup::new(vec![row(1, "fr-FR", "Bonjour")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("title".to_string(), "headline".to_string());

        let fields = client.build_fields(&group, &mapping, Some("en-US"));
        assert_eq!(fields["headline"].len(), 1);
        assert_eq!(fields["headline"]["en-US"], json!("Bonjour"));
    }

    #[test]
    fn test_build_fields_missing_column_is_null() {
        let client = client();
        let group = EntityGroup::new(vec![row(1, "en-US", "Hello")]);
        let mut mapping = BTreeMap::new();
        mapping.insert("nonexistent".to_string(), "extra".to_string());

        let fields = client.build_fields(&group, &mapping, None);
        assert_eq!(fields["extra"]["en-US"], Value::Null);
    }
}
