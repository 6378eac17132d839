use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    expiry::expires_at,
    models::{CommentWithAuthor, PostDetails, Tag, User},
    tags::render_tag_list,
};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AuthorResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub image: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CommentResponse {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: AuthorResponse,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PostResponse {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub tag_list: String,
    pub tags: Vec<TagResponse>,
    pub comments: Vec<CommentResponse>,
}

impl UserResponse {
    pub fn new(
        User {
            id,
            name,
            email,
            image,
            created_at,
            updated_at,
            ..
        }: User,
    ) -> Self {
        UserResponse {
            id,
            name,
            email,
            image,
            created_at,
            updated_at,
        }
    }
}

impl From<Tag> for TagResponse {
    fn from(Tag { id, name }: Tag) -> Self {
        TagResponse { id, name }
    }
}

impl CommentResponse {
    pub fn new(
        CommentWithAuthor {
            id,
            content,
            user_id,
            post_id,
            created_at,
            updated_at,
            author_name,
            author_email,
            author_image,
        }: CommentWithAuthor,
    ) -> Self {
        CommentResponse {
            id,
            content,
            post_id,
            user_id,
            created_at,
            updated_at,
            user: AuthorResponse {
                id: user_id,
                name: author_name,
                email: author_email,
                image: author_image,
            },
        }
    }
}

impl PostResponse {
    pub fn new(
        PostDetails {
            post,
            tags,
            comments,
        }: PostDetails,
    ) -> Self {
        PostResponse {
            id: post.id,
            title: post.title,
            body: post.body,
            user_id: post.user_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
            expires_at: expires_at(post.created_at),
            tag_list: render_tag_list(&tags),
            tags: tags.into_iter().map(TagResponse::from).collect(),
            comments: comments.into_iter().map(CommentResponse::new).collect(),
        }
    }
}
