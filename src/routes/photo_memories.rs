use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::models::{HappyMemory, MAX_MEMORIES_PER_USER};
use crate::db::HappyMemoryRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_memories))
        .route(
            "/upload",
            post(upload_memory).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/weekly-candidate", get(weekly_candidate))
        .route("/:memory_id", put(update_memory).delete(delete_memory))
}

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MEDIA_URL_PREFIX: &str = "/media/";
const DEFAULT_EXTENSION: &str = "jpg";
const CANDIDATE_MESSAGE: &str = "Remember that you have beautiful moments — this is one of them.";
const TOO_MANY: &str =
    "You can upload up to 10 happy memories. Please delete one before adding a new one.";
const BAD_DATE: &str = "Invalid memory_date format (expected YYYY-MM-DD).";

#[derive(Debug, Serialize)]
pub struct MemoryView {
    pub memory_id: String,
    pub image_url: String,
    pub caption: Option<String>,
    pub memory_date: Option<NaiveDate>,
    pub created_at: chrono::NaiveDateTime,
}

impl From<HappyMemory> for MemoryView {
    fn from(m: HappyMemory) -> Self {
        MemoryView {
            memory_id: m.memory_id,
            image_url: m.image_url,
            caption: m.caption,
            memory_date: m.memory_date,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemoryRequest {
    pub caption: Option<String>,
    pub memory_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyCandidate {
    pub show: bool,
    pub message: Option<&'static str>,
    pub memory: Option<MemoryView>,
}

fn parse_memory_date(value: Option<&str>) -> AppResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::BadRequest(BAD_DATE.to_string())),
    }
}

/// Lower-cased alphanumeric extension of `file_name`, `jpg` when absent.
fn file_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Disk path of a stored image, only for URLs inside the user's own folder.
fn disk_path(media_dir: &str, user_id: &str, image_url: &str) -> Option<PathBuf> {
    let rel = image_url.strip_prefix(MEDIA_URL_PREFIX)?;
    let (folder, file) = rel.split_once('/')?;
    if folder != format!("user_{}", user_id) || file.is_empty() || file.contains(['/', '\\']) || file.starts_with('.') {
        return None;
    }
    Some(FsPath::new(media_dir).join(folder).join(file))
}

struct Upload {
    bytes: Vec<u8>,
    extension: String,
}

async fn upload_memory(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    if HappyMemoryRepository::count_for_user(&state.db, &user.id).await? >= MAX_MEMORIES_PER_USER {
        return Err(AppError::BadRequest(TOO_MANY.to_string()));
    }

    let mut upload = None;
    let mut caption = None;
    let mut memory_date = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let is_image = field
                    .content_type()
                    .map(|ct| ct.starts_with("image/"))
                    .unwrap_or(false);
                if !is_image {
                    return Err(AppError::BadRequest("File must be an image.".to_string()));
                }
                let extension = file_extension(field.file_name());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
                upload = Some(Upload {
                    bytes: bytes.to_vec(),
                    extension,
                });
            }
            "caption" | "memory_date" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid form field: {}", e)))?;
                if name == "caption" {
                    caption = Some(text).filter(|c| !c.is_empty());
                } else {
                    memory_date = Some(text);
                }
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    let memory_date = parse_memory_date(memory_date.as_deref())?;

    let memory_id = Uuid::new_v4().to_string();
    let folder = format!("user_{}", user.id);
    let file_name = format!("{}.{}", memory_id, upload.extension);
    let dir = FsPath::new(&state.config.server.media_dir).join(&folder);

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create media folder: {}", e)))?;
    tokio::fs::write(dir.join(&file_name), &upload.bytes)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to store image: {}", e)))?;

    let image_url = format!("{}{}/{}", MEDIA_URL_PREFIX, folder, file_name);
    HappyMemoryRepository::create(
        &state.db,
        &memory_id,
        &user.id,
        &image_url,
        caption.as_deref(),
        memory_date,
    )
    .await?;

    tracing::info!("Stored happy memory {} for user {}", memory_id, user.id);
    Ok(Json(json!({ "image_url": image_url })))
}

async fn list_memories(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<MemoryView>>> {
    let memories = HappyMemoryRepository::list_for_user(&state.db, &user.id).await?;
    Ok(Json(
        memories
            .into_iter()
            .take(MAX_MEMORIES_PER_USER as usize)
            .map(MemoryView::from)
            .collect(),
    ))
}

async fn update_memory(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(memory_id): Path<String>,
    Json(request): Json<UpdateMemoryRequest>,
) -> AppResult<Json<Value>> {
    let memory_date = parse_memory_date(request.memory_date.as_deref())?;
    HappyMemoryRepository::update(
        &state.db,
        &memory_id,
        &user.id,
        request.caption.as_deref(),
        memory_date,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Memory not found".to_string()))?;
    Ok(Json(json!({ "ok": true })))
}

async fn delete_memory(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(memory_id): Path<String>,
) -> AppResult<Json<Value>> {
    let memory = HappyMemoryRepository::find_for_user(&state.db, &memory_id, &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Memory not found".to_string()))?;

    if let Some(path) = disk_path(&state.config.server.media_dir, &user.id, &memory.image_url) {
        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    HappyMemoryRepository::delete(&state.db, &memory_id, &user.id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// The newest stored memory for the weekly popup.
async fn weekly_candidate(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<WeeklyCandidate>> {
    let memory = HappyMemoryRepository::latest(&state.db, &user.id).await?;
    Ok(Json(match memory {
        Some(memory) => WeeklyCandidate {
            show: true,
            message: Some(CANDIDATE_MESSAGE),
            memory: Some(memory.into()),
        },
        None => WeeklyCandidate {
            show: false,
            message: None,
            memory: None,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};

    use crate::db::models::UserRole;
    use crate::routes::testing::TestApp;

    const BOUNDARY: &str = "mendly-test-boundary";

    fn multipart_request(token: &str, content_type: &str, memory_date: Option<&str>) -> Request<Body> {
        let mut body = String::new();
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"beach.PNG\"\r\nContent-Type: {content_type}\r\n\r\nfake-bytes\r\n"
        ));
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nSunny day\r\n"
        ));
        if let Some(date) = memory_date {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"memory_date\"\r\n\r\n{date}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/photo-memories/upload")
            .header("authorization", format!("Bearer {}", token))
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn extension_and_disk_path_rules() {
        assert_eq!(file_extension(Some("a.PNG")), "png");
        assert_eq!(file_extension(Some("noext")), "jpg");
        assert_eq!(file_extension(Some("x.p/g")), "jpg");
        assert_eq!(file_extension(None), "jpg");

        assert_eq!(
            disk_path("media", "u1", "/media/user_u1/a.jpg"),
            Some(FsPath::new("media").join("user_u1").join("a.jpg"))
        );
        assert_eq!(disk_path("media", "u1", "/media/user_u2/a.jpg"), None);
        assert_eq!(disk_path("media", "u1", "/media/user_u1/../x"), None);
    }

    #[tokio::test]
    async fn upload_list_update_delete() {
        let app = TestApp::new().await;
        let (user, token) = app.user("alice", UserRole::Regular).await;

        let (status, body) = app
            .send_request(multipart_request(&token, "image/png", Some("2025-06-01")))
            .await;
        assert_eq!(status, StatusCode::OK);
        let url = body["image_url"].as_str().unwrap().to_string();
        assert!(url.starts_with(&format!("/media/user_{}/", user.id)));
        assert!(url.ends_with(".png"));
        let path = disk_path(&app.state.config.server.media_dir, &user.id, &url).unwrap();
        assert!(path.exists());

        let (_, list) = app.send("GET", "/photo-memories", Some(&token), None).await;
        assert_eq!(list[0]["caption"], "Sunny day");
        assert_eq!(list[0]["memory_date"], "2025-06-01");
        let id = list[0]["memory_id"].as_str().unwrap().to_string();

        let (status, _) = app
            .send(
                "PUT",
                &format!("/photo-memories/{}", id),
                Some(&token),
                Some(serde_json::json!({"caption": "Beach", "memory_date": "bad"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, candidate) = app
            .send("GET", "/photo-memories/weekly-candidate", Some(&token), None)
            .await;
        assert_eq!(candidate["show"], true);
        assert_eq!(candidate["memory"]["memory_id"], id.as_str());

        let (status, _) = app
            .send("DELETE", &format!("/photo-memories/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!path.exists());

        let (status, _) = app
            .send("DELETE", &format!("/photo-memories/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn upload_rejects_non_images_and_enforces_cap() {
        let app = TestApp::new().await;
        let (user, token) = app.user("alice", UserRole::Regular).await;

        let (status, body) = app
            .send_request(multipart_request(&token, "text/plain", None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "File must be an image.");

        for i in 0..MAX_MEMORIES_PER_USER {
            HappyMemoryRepository::create(
                &app.state.db,
                &format!("m{}", i),
                &user.id,
                "/media/x.jpg",
                None,
                None,
            )
            .await
            .unwrap();
        }
        let (status, body) = app
            .send_request(multipart_request(&token, "image/jpeg", None))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], TOO_MANY);

        let (_, candidate) = app
            .send("GET", "/photo-memories/weekly-candidate", Some(&token), None)
            .await;
        assert_eq!(candidate["show"], true);
        assert_eq!(
            candidate["memory"]["memory_id"],
            format!("m{}", MAX_MEMORIES_PER_USER - 1).as_str()
        );
    }
}
