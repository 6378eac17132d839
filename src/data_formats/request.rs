use serde::{Deserialize, Serialize};

// Every field is optional so that missing input is reported as a validation
// message instead of a deserialization failure.

// ----------------- Auth Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// ----------------- Post Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct PostRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag_list: Option<String>,
}

// ----------------- Comment Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct CommentRequest {
    pub content: Option<String>,
}

// ----------------- Tag Request -----------------
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct TagRequest {
    pub name: Option<String>,
}
