//! Google People API v1 Client

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::client::GoogleClient;
use super::common::Page;
use crate::common::AppResult;

/// Every person field the contact tables can project.
pub const PERSON_FIELDS: &str = "addresses,biographies,birthdays,calendarUrls,clientData,coverPhotos,emailAddresses,events,externalIds,genders,interests,locations,memberships,metadata,miscKeywords,names,nicknames,occupations,organizations,phoneNumbers,photos,relations,sipAddresses,skills,urls,userDefined";

/// `contactGroups.batchGet` accepts at most this many resource names.
pub const BATCH_GET_MAX: usize = 200;

pub const DEFAULT_MAX_MEMBERS: i64 = 2500;

pub struct PeopleApi {
    client: Arc<GoogleClient>,
}

super::google_api_wrapper!(PeopleApi);

impl PeopleApi {
    /// List one page of the caller's contacts
    pub async fn list_connections(&self, page_size: u64, page_token: Option<&str>) -> AppResult<Page> {
        let mut query_params = vec![
            ("personFields", PERSON_FIELDS.to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }

        let response = self.client.get("/people/me/connections", &query_params).await?;
        let page = Page::from_response(&response, "connections");
        debug!("Retrieved {} contacts", page.items.len());
        Ok(page)
    }

    /// List one page of domain directory profiles
    pub async fn list_directory_people(&self, page_size: u64, page_token: Option<&str>) -> AppResult<Page> {
        let mut query_params = vec![
            ("readMask", PERSON_FIELDS.to_string()),
            ("sources", "DIRECTORY_SOURCE_TYPE_DOMAIN_PROFILE".to_string()),
            ("pageSize", page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }

        let response = self.client.get("/people:listDirectoryPeople", &query_params).await?;
        let page = Page::from_response(&response, "people");
        debug!("Retrieved {} directory profiles", page.items.len());
        Ok(page)
    }

    /// List one page of contact groups (without members)
    pub async fn list_contact_groups(&self, page_size: u64, page_token: Option<&str>) -> AppResult<Page> {
        let mut query_params = vec![("pageSize", page_size.to_string())];
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }

        let response = self.client.get("/contactGroups", &query_params).await?;
        let page = Page::from_response(&response, "contactGroups");
        debug!("Retrieved {} contact groups", page.items.len());
        Ok(page)
    }

    /// Fetch contact groups with members, `BATCH_GET_MAX` names per call
    ///
    /// Returns the groups in request order; unresolved names are skipped.
    pub async fn batch_get_contact_groups(&self, resource_names: &[String], max_members: i64) -> AppResult<Vec<Value>> {
        let mut groups = Vec::with_capacity(resource_names.len());

        for chunk in resource_names.chunks(BATCH_GET_MAX) {
            let mut query_params: Vec<(&str, String)> = chunk.iter().map(|name| ("resourceNames", name.clone())).collect();
            query_params.push(("maxMembers", max_members.to_string()));

            let response = self.client.get("/contactGroups:batchGet", &query_params).await?;
            let resolved = response
                .get("responses")
                .and_then(|v| v.as_array())
                .into_iter()
                .flatten()
                .filter_map(|r| r.get("contactGroup").cloned());
            groups.extend(resolved);
        }

        debug!("Resolved {} of {} contact groups", groups.len(), resource_names.len());
        Ok(groups)
    }
}
