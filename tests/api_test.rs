// End-to-end tests of the HTTP surface against a fake image host.

mod common;

use std::{path::Path, time::Duration};

use serde_json::{Value, json};
use tokio::net::TcpListener;

use comic_cache::{ComicService, router, settings::{Settings, SettingsStore}};

use common::{UpstreamResolver, start_upstream, strip_bytes, tracker};

struct TestServer {
    base: String,
    client: reqwest::Client,
    _dir: tempfile::TempDir,
    settings_path: std::path::PathBuf,
    folder: std::path::PathBuf,
}

impl TestServer {
    async fn start() -> Self {
        let upstream = start_upstream().await;
        let dir = tempfile::tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        let folder = dir.path().join("comics");

        let service = ComicService::new(
            SettingsStore::open(&settings_path),
            folder.clone(),
            tracker(UpstreamResolver::new(&upstream)),
        )
        .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router(service)).await.ok();
        });

        Self {
            base: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            _dir: dir,
            settings_path,
            folder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn wait_status(&self, path: &str) -> Value {
        for _ in 0..400 {
            let (_, body) = self.get(path).await;
            if body["status"] == "success" || body["status"] == "failure" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("{} never finished", path);
    }

    fn stored_settings(&self) -> Settings {
        Settings::load(&self.settings_path)
    }
}

fn write(folder: &Path, name: &str, bytes: &[u8]) {
    std::fs::create_dir_all(folder).unwrap();
    std::fs::write(folder.join(name), bytes).unwrap();
}

#[tokio::test]
async fn catalog_routes_add_edit_select() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/comics").await;
    assert_eq!(status, 200);
    assert_eq!(body["selected"], "Fox Trot");
    assert_eq!(body["comics"][0]["url"], "foxtrot");

    let baby_blues = json!({"name": "Baby Blues", "url": "babyblues", "short_code": "bb"});
    let (status, body) = server
        .send(reqwest::Method::POST, "/comics", baby_blues.clone())
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["header_bg"], "#ff0000");
    assert_eq!(body["header_fg"], "#ffffff");

    let (status, body) = server.send(reqwest::Method::POST, "/comics", baby_blues).await;
    assert_eq!(status, 409);
    assert!(body["msg"].as_str().unwrap().contains("name"));

    let (status, _) = server
        .send(
            reqwest::Method::POST,
            "/comics",
            json!({"name": "", "url": "x", "short_code": "x"}),
        )
        .await;
    assert_eq!(status, 400);

    let stored = server.stored_settings();
    assert_eq!(stored.comics.len(), 2);
    assert_eq!(stored.selected_comic, "Baby Blues");

    let (status, _) = server
        .send(
            reqwest::Method::POST,
            "/comics/select",
            json!({"name": "Fox Trot"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(server.stored_settings().selected_comic, "Fox Trot");

    let (status, body) = server
        .send(
            reqwest::Method::PUT,
            "/comics/Baby%20Blues",
            json!({"name": "Baby Blues", "url": "babyblues", "short_code": "bb", "header_bg": "#ffff00"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["header_fg"], "#000000");
    assert_eq!(server.stored_settings().selected_comic, "Baby Blues");

    let before = server.stored_settings();
    let (status, _) = server
        .send(
            reqwest::Method::PUT,
            "/comics/NoSuchComic",
            json!({"name": "New", "url": "new", "short_code": "nw"}),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(server.stored_settings(), before);

    let (status, _) = server
        .send(reqwest::Method::POST, "/comics/select", json!({"name": "Gone"}))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn cached_strip_is_served_without_download() {
    let server = TestServer::start().await;
    write(&server.folder, "ft240305.bmp", b"bitmap");

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            "/request_image",
            json!({"date": "2024-03-05"}),
        )
        .await;
    assert_eq!(status, 202);
    assert_eq!(body["status"], "loading");

    let body = server.wait_status("/status").await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["file_path"], "/image/ft240305.bmp");

    let resp = server
        .client
        .get(server.url("/image/ft240305.bmp"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "image/bmp");
    assert_eq!(&resp.bytes().await.unwrap()[..], b"bitmap");
}

#[tokio::test]
async fn missing_strip_is_downloaded_and_polled_by_ticket() {
    let server = TestServer::start().await;
    server
        .send(
            reqwest::Method::POST,
            "/comics",
            json!({"name": "Baby Blues", "url": "babyblues", "short_code": "bb"}),
        )
        .await;

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            "/request_image",
            json!({"comic": "Baby Blues", "date": "2024-03-05"}),
        )
        .await;
    assert_eq!(status, 202);
    let ticket = body["ticket"].as_str().unwrap().to_string();

    let body = server.wait_status(&format!("/status/{}", ticket)).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["file_path"], "/image/bb240305.jpg");

    let resp = server
        .client
        .get(server.url("/image/bb240305.jpg"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["content-type"], "image/jpeg");
    assert_eq!(
        resp.bytes().await.unwrap().to_vec(),
        strip_bytes("babyblues-20240305")
    );

    let stored = server.stored_settings();
    assert_eq!(stored.selected_comic, "Baby Blues");
    assert_eq!(stored.date.to_string(), "2024-03-05");
}

#[tokio::test]
async fn unknown_comic_and_ticket_are_not_found() {
    let server = TestServer::start().await;

    let (status, _) = server
        .send(
            reqwest::Method::POST,
            "/request_image",
            json!({"comic": "Nope", "date": "2024-03-05"}),
        )
        .await;
    assert_eq!(status, 404);

    let (status, body) = server.get("/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "idle");

    let (status, _) = server
        .get("/status/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn image_route_rejects_bad_names() {
    let server = TestServer::start().await;
    write(&server.folder, "ft240305.jpg", b"jpg");

    let (status, _) = server.get("/image/..%2Fsettings.json").await;
    assert_eq!(status, 400);

    let (status, _) = server.get("/image/ft999999.jpg").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn navigate_moves_and_saves_the_date() {
    let server = TestServer::start().await;

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            "/navigate",
            json!({"date": "2024-01-31", "step": "next_month"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["date"], "2024-02-29");
    assert_eq!(server.stored_settings().date.to_string(), "2024-02-29");

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            "/navigate",
            json!({"date": "2024-03-05", "step": "previous_week"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["date"], "2024-02-27");
}
