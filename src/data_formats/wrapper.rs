use serde::{Deserialize, Serialize};

use super::response::{PostResponse, UserResponse};

#[derive(Debug, Deserialize, Serialize)]
pub struct UserWrapper<T> {
    pub user: T,
}

/// Body of a successful signup or login.
#[derive(Debug, Deserialize, Serialize)]
pub struct AuthWrapper {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PostWrapper<T> {
    pub post: T,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MultiplePostsWrapper {
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CommentWrapper<T> {
    pub comment: T,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TagWrapper<T> {
    pub tag: T,
}

impl<T> PostWrapper<T> {
    pub fn wrap_with_post_data(post: T) -> PostWrapper<T> {
        PostWrapper { post }
    }
}
