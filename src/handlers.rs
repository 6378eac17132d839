use std::sync::Arc;

use axum::{
    http::{StatusCode, Uri},
    Extension, Json,
};
use chrono::Utc;

use crate::{
    authentication::{hash_password_argon2, verify_password_argon2, AuthUser, TokenService},
    authorization::ensure_owner,
    db_helpers::Store,
    errors::RequestError,
    expiry::ExpiryQueue,
    extractors::{JsonBody, PathParams, QueryParams},
    models::{NewPost, NewUser, Post, PostChanges, TagRemoval},
    tags::parse_tag_list,
    validation::{validate_comment, validate_post, validate_signup, validate_tag_name},
    AuthWrapper, CommentRequest, CommentResponse, CommentWrapper, LoginRequest,
    MultiplePostsWrapper, PostQueryParams, PostRequest, PostResponse, PostWrapper, SignupRequest,
    TagRequest, TagResponse, TagWrapper, UserResponse, UserWrapper,
};

type StoreExt = Extension<Arc<dyn Store>>;
type JsonResult<T> = Result<Json<T>, RequestError>;
type CreatedResult<T> = Result<(StatusCode, Json<T>), RequestError>;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "ok"
}

pub async fn not_found(uri: Uri) -> RequestError {
    tracing::debug!(%uri, "No route");
    RequestError::NotFound("Not found")
}

async fn find_post(store: &dyn Store, id: i64) -> Result<Post, RequestError> {
    store
        .get_post(id)
        .await?
        .ok_or(RequestError::NotFound("Post not found"))
}

// ----------------- Auth Handlers -----------------
pub async fn signup(
    Extension(store): StoreExt,
    Extension(tokens): Extension<Arc<TokenService>>,
    JsonBody(UserWrapper { user: request }): JsonBody<UserWrapper<SignupRequest>>,
) -> CreatedResult<AuthWrapper> {
    let mut errors = match validate_signup(
        request.name.as_deref(),
        request.email.as_deref(),
        request.password.as_deref(),
        request.image.as_deref(),
    ) {
        Ok(()) => Vec::new(),
        Err(RequestError::Validation(messages)) => messages,
        Err(e) => return Err(e),
    };
    if let Some(email) = request.email.as_deref() {
        if store.get_user_by_email(email).await?.is_some() {
            errors.push("Email has already been taken".to_owned());
        }
    }
    if !errors.is_empty() {
        return Err(RequestError::Validation(errors));
    }

    let password_digest = hash_password_argon2(request.password.unwrap_or_default()).await?;
    let new_user = NewUser {
        name: request.name.unwrap_or_default(),
        email: request.email.unwrap_or_default(),
        password_digest,
        image: request.image.unwrap_or_default(),
    };

    let user = store
        .insert_user(&new_user, Utc::now())
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                return RequestError::validation("Email has already been taken");
            }
            e
        })?;

    let token = tokens.issue(user.id)?;
    tracing::info!(user_id = user.id, "User signed up");
    Ok((
        StatusCode::CREATED,
        Json(AuthWrapper {
            user: UserResponse::new(user),
            token,
        }),
    ))
}

pub async fn login(
    Extension(store): StoreExt,
    Extension(tokens): Extension<Arc<TokenService>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> JsonResult<AuthWrapper> {
    let (email, password) = match (request.email, request.password) {
        (Some(email), Some(password)) => (email, password),
        _ => return Err(RequestError::NotAuthorized(INVALID_CREDENTIALS)),
    };

    let user = match store.get_user_by_email(&email).await? {
        Some(user) => user,
        None => return Err(RequestError::NotAuthorized(INVALID_CREDENTIALS)),
    };

    let is_password_correct = verify_password_argon2(password, &user.password_digest).await?;
    if !is_password_correct {
        return Err(RequestError::NotAuthorized(INVALID_CREDENTIALS));
    }

    let token = tokens.issue(user.id)?;
    Ok(Json(AuthWrapper {
        user: UserResponse::new(user),
        token,
    }))
}
// ----------------- End Auth Handlers -----------------

// ----------------- Tag Handlers -----------------
pub async fn list_tags(_: AuthUser, Extension(store): StoreExt) -> JsonResult<Vec<TagResponse>> {
    let tags = store.list_tags().await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

pub async fn create_tag(
    _: AuthUser,
    Extension(store): StoreExt,
    JsonBody(TagWrapper { tag: request }): JsonBody<TagWrapper<TagRequest>>,
) -> CreatedResult<TagResponse> {
    validate_tag_name(request.name.as_deref())?;
    let name = request.name.unwrap_or_default();

    let tag = store.insert_tag(&name, Utc::now()).await.map_err(|e| {
        if e.is_unique_violation() {
            return RequestError::validation("Name has already been taken");
        }
        e
    })?;
    Ok((StatusCode::CREATED, Json(TagResponse::from(tag))))
}

pub async fn remove_post_tag(
    AuthUser { id: user_id }: AuthUser,
    Extension(store): StoreExt,
    PathParams((post_id, tag_id)): PathParams<(i64, i64)>,
) -> Result<StatusCode, RequestError> {
    let post = find_post(&*store, post_id).await?;
    if store.get_tag(tag_id).await?.is_none() {
        return Err(RequestError::NotFound("Tag not found"));
    }
    ensure_owner(user_id, post.user_id)?;

    match store.remove_tag_from_post(post_id, tag_id).await? {
        TagRemoval::Removed => Ok(StatusCode::NO_CONTENT),
        TagRemoval::NotAttached => Err(RequestError::NotFound("Tag not found")),
        TagRemoval::LastTag => Err(RequestError::validation("Tags must have at least one tag")),
    }
}
// ----------------- End Tag Handlers -----------------

// ----------------- Post Handlers -----------------
pub async fn list_posts(
    _: AuthUser,
    Extension(store): StoreExt,
    QueryParams(PostQueryParams { tag_id }): QueryParams<PostQueryParams>,
) -> JsonResult<MultiplePostsWrapper> {
    let posts = store.list_posts(tag_id).await?;
    Ok(Json(MultiplePostsWrapper {
        posts: posts.into_iter().map(PostResponse::new).collect(),
    }))
}

pub async fn get_post(
    _: AuthUser,
    Extension(store): StoreExt,
    PathParams(id): PathParams<i64>,
) -> JsonResult<PostWrapper<PostResponse>> {
    let details = store
        .get_post_details(id)
        .await?
        .ok_or(RequestError::NotFound("Post not found"))?;
    Ok(Json(PostWrapper::wrap_with_post_data(PostResponse::new(
        details,
    ))))
}

pub async fn create_post(
    AuthUser { id: user_id }: AuthUser,
    Extension(store): StoreExt,
    Extension(expiry_queue): Extension<ExpiryQueue>,
    JsonBody(PostWrapper { post: request }): JsonBody<PostWrapper<PostRequest>>,
) -> CreatedResult<PostWrapper<PostResponse>> {
    let title = request.title.unwrap_or_default();
    let body = request.body.unwrap_or_default();
    let tags = parse_tag_list(request.tag_list.as_deref().unwrap_or_default());
    validate_post(&title, &body, &tags)?;

    let (details, expiry_check) = store
        .create_post(user_id, NewPost { title, body, tags }, Utc::now())
        .await?;
    expiry_queue.schedule(expiry_check);

    tracing::info!(post_id = details.post.id, user_id, "Post created");
    Ok((
        StatusCode::CREATED,
        Json(PostWrapper::wrap_with_post_data(PostResponse::new(
            details,
        ))),
    ))
}

pub async fn update_post(
    AuthUser { id: user_id }: AuthUser,
    Extension(store): StoreExt,
    PathParams(id): PathParams<i64>,
    JsonBody(PostWrapper { post: request }): JsonBody<PostWrapper<PostRequest>>,
) -> JsonResult<PostWrapper<PostResponse>> {
    let post = find_post(&*store, id).await?;
    ensure_owner(user_id, post.user_id)?;

    let tags = request.tag_list.as_deref().map(parse_tag_list);
    let final_tags = match &tags {
        Some(tags) => tags.clone(),
        None => store
            .tags_for_post(id)
            .await?
            .into_iter()
            .map(|tag| tag.name)
            .collect(),
    };
    validate_post(
        request.title.as_deref().unwrap_or(&post.title),
        request.body.as_deref().unwrap_or(&post.body),
        &final_tags,
    )?;

    let changes = PostChanges {
        title: request.title,
        body: request.body,
        tags,
    };
    let details = store.update_post(id, changes, Utc::now()).await?;
    Ok(Json(PostWrapper::wrap_with_post_data(PostResponse::new(
        details,
    ))))
}

pub async fn delete_post(
    AuthUser { id: user_id }: AuthUser,
    Extension(store): StoreExt,
    PathParams(id): PathParams<i64>,
) -> Result<StatusCode, RequestError> {
    let post = find_post(&*store, id).await?;
    ensure_owner(user_id, post.user_id)?;

    store.delete_post(id).await?;
    tracing::info!(post_id = id, user_id, "Post deleted");
    Ok(StatusCode::NO_CONTENT)
}
// ----------------- End Post Handlers -----------------

// ----------------- Comment Handlers -----------------
pub async fn list_comments(
    _: AuthUser,
    Extension(store): StoreExt,
    PathParams(post_id): PathParams<i64>,
) -> JsonResult<Vec<CommentResponse>> {
    find_post(&*store, post_id).await?;
    let comments = store.list_comments(post_id).await?;
    Ok(Json(
        comments.into_iter().map(CommentResponse::new).collect(),
    ))
}

pub async fn create_comment(
    AuthUser { id: user_id }: AuthUser,
    Extension(store): StoreExt,
    PathParams(post_id): PathParams<i64>,
    JsonBody(CommentWrapper { comment: request }): JsonBody<CommentWrapper<CommentRequest>>,
) -> CreatedResult<CommentResponse> {
    find_post(&*store, post_id).await?;
    validate_comment(request.content.as_deref())?;

    let comment = store
        .insert_comment(
            post_id,
            user_id,
            &request.content.unwrap_or_default(),
            Utc::now(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::new(comment))))
}

pub async fn update_comment(
    AuthUser { id: user_id }: AuthUser,
    Extension(store): StoreExt,
    PathParams((post_id, id)): PathParams<(i64, i64)>,
    JsonBody(CommentWrapper { comment: request }): JsonBody<CommentWrapper<CommentRequest>>,
) -> JsonResult<CommentResponse> {
    find_post(&*store, post_id).await?;
    let comment = store
        .get_comment(post_id, id)
        .await?
        .ok_or(RequestError::NotFound("Comment not found"))?;
    ensure_owner(user_id, comment.user_id)?;
    validate_comment(request.content.as_deref())?;

    let comment = store
        .update_comment(id, &request.content.unwrap_or_default(), Utc::now())
        .await?;
    Ok(Json(CommentResponse::new(comment)))
}

pub async fn delete_comment(
    AuthUser { id: user_id }: AuthUser,
    Extension(store): StoreExt,
    PathParams((post_id, id)): PathParams<(i64, i64)>,
) -> Result<StatusCode, RequestError> {
    find_post(&*store, post_id).await?;
    let comment = store
        .get_comment(post_id, id)
        .await?
        .ok_or(RequestError::NotFound("Comment not found"))?;
    ensure_owner(user_id, comment.user_id)?;

    store.delete_comment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
// ----------------- End Comment Handlers -----------------
