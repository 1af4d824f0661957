use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user profile together with its derived search artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub title: Option<String>,
    pub about: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub custom_status: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub experience: Vec<WorkExperience>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub search: SearchState,
}

/// Staleness bookkeeping and derived artifacts owned by the index builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchState {
    /// Text the current search vector was built from
    pub searchable_text: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub embeddings_stale: bool,
    pub search_vector_stale: bool,
    pub embedding_updated_at: Option<DateTime<Utc>>,
    pub search_vector_updated_at: Option<DateTime<Utc>>,
    /// Bumped on every dirty-mark so a rebuild racing an edit can tell.
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    #[serde(default)]
    pub id: Uuid,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    #[serde(default)]
    pub id: Uuid,
    pub degree: String,
    pub institution: String,
    #[serde(default)]
    pub field_of_study: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(default)]
    pub id: Uuid,
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub hidden: bool,
}

/// A repeatable profile section (projects, education, ...).
pub trait SectionEntry: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);
    fn set_hidden(&mut self, hidden: bool);
    fn entries_mut(profile: &mut UserProfile) -> &mut Vec<Self>;
}

impl SectionEntry for WorkExperience {
    const KIND: &'static str = "experience";

    fn id(&self) -> Uuid {
        self.id
    }
    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
    fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    fn entries_mut(profile: &mut UserProfile) -> &mut Vec<Self> {
        &mut profile.experience
    }
}

impl SectionEntry for Education {
    const KIND: &'static str = "education";

    fn id(&self) -> Uuid {
        self.id
    }
    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
    fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    fn entries_mut(profile: &mut UserProfile) -> &mut Vec<Self> {
        &mut profile.education
    }
}

impl SectionEntry for Project {
    const KIND: &'static str = "project";

    fn id(&self) -> Uuid {
        self.id
    }
    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
    fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    fn entries_mut(profile: &mut UserProfile) -> &mut Vec<Self> {
        &mut profile.projects
    }
}

impl SectionEntry for Contact {
    const KIND: &'static str = "contact";

    fn id(&self) -> Uuid {
        self.id
    }
    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }
    fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }
    fn entries_mut(profile: &mut UserProfile) -> &mut Vec<Self> {
        &mut profile.contacts
    }
}

/// Create-profile request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Partial update of the core profile fields. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub username: Option<String>,
    pub title: Option<String>,
    pub about: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub custom_status: Option<String>,
    pub image: Option<String>,
}

/// Hide/show request for a section entry
#[derive(Debug, Clone, Deserialize)]
pub struct VisibilityUpdate {
    pub hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Default,
    /// Reserved for query rewriting; ranks exactly like `Default` today.
    Ai,
}

impl SearchMode {
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.unwrap_or("default").trim().to_ascii_lowercase().as_str() {
            "" | "default" => Some(Self::Default),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }
}

/// Search query-string parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub mode: Option<String>,
}

/// A ranked profile summary. `score` is a lexical rank or a fused RRF score
/// depending on which pass produced it; the two are not comparable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub image: Option<String>,
    pub custom_status: Option<String>,
    pub score: f32,
}

impl SearchResult {
    pub fn from_profile(profile: &UserProfile, score: f32) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            username: profile.username.clone(),
            image: profile.image.clone(),
            custom_status: profile.custom_status.clone(),
            score,
        }
    }
}

/// Search response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub users: Vec<SearchResult>,
}

/// Outcome of one index builder run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub candidates: usize,
    pub embeddings_updated: usize,
    pub text_indexes_updated: usize,
}

/// Manual rebuild request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildRequest {
    #[serde(default)]
    pub user_ids: Vec<Uuid>,
}

/// Index health counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    pub profiles: usize,
    pub embeddings_stale: usize,
    pub search_vectors_stale: usize,
    pub embedded: usize,
    pub indexed_documents: u64,
}
