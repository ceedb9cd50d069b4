use serde::{Deserialize, Serialize};

/// Identity record owned by the account service. The password never leaves it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(rename = "$createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    pub account_id: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "$id")]
    pub id: String,
    pub account_id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub image_id: Option<String>,
    #[serde(rename = "$createdAt")]
    pub created_at: String,
    #[serde(rename = "$updatedAt")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "$id")]
    pub id: String,
    pub creator: String,
    #[serde(default)]
    pub caption: String,
    #[serde(rename = "image")]
    pub image_url: String,
    pub image_id: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(rename = "$createdAt")]
    pub created_at: String,
    #[serde(rename = "$updatedAt")]
    pub updated_at: String,
}

/// Join record between a user profile and a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedPost {
    #[serde(rename = "$id")]
    pub id: String,
    pub user: String,
    pub post: String,
    #[serde(rename = "$createdAt")]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
    pub bucket_id: String,
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(rename = "$createdAt")]
    pub created_at: String,
}

/// One page of a listing. `total` counts every match, not just this page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentList<T> {
    pub total: usize,
    pub documents: Vec<T>,
}

/// Marker returned by deletions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deleted {
    pub status: String,
}

impl Deleted {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn post_reads_store_field_names() {
        let post: Post = serde_json::from_value(json!({
            "$id": "p1",
            "$createdAt": "2024-01-01T00:00:00.000000Z",
            "$updatedAt": "2024-01-02T00:00:00.000000Z",
            "creator": "u1",
            "caption": "sunset",
            "image": "http://localhost/preview",
            "imageId": "f1",
            "location": "Lisbon",
            "tags": ["sea"],
        }))
        .unwrap();

        assert_eq!(post.image_url, "http://localhost/preview");
        assert_eq!(post.image_id, "f1");
        assert!(post.likes.is_empty());
    }

    #[test]
    fn session_secret_is_not_serialized() {
        let session = Session {
            id: "s1".into(),
            account_id: "a1".into(),
            secret: "hunter2".into(),
            expires_at: "2099-01-01T00:00:00Z".into(),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert!(value.get("secret").is_none());
        assert_eq!(value["accountId"], "a1");
    }
}
