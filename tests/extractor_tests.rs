//! Extractor integration tests
//!
//! The registry dispatch is exercised with a mocked extractor, and the
//! direct-URL extractor against a local wiremock server. Nothing here
//! touches yt-dlp or the real network.

use async_trait::async_trait;
use mockall::mock;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tubescribe::extractors::direct::DirectExtractor;
use tubescribe::extractors::{AudioFormat, ExtractorRegistry, MediaExtractor, MediaInfo};

mock! {
    pub Extractor {}

    #[async_trait]
    impl MediaExtractor for Extractor {
        async fn probe(&self, url: &str) -> anyhow::Result<MediaInfo>;
        async fn fetch_audio(&self, url: &str, dest_stem: &Path) -> anyhow::Result<PathBuf>;
        fn supports(&self, url: &str) -> bool;
        fn name(&self) -> &'static str;
    }
}

fn mocked_extractor() -> MockExtractor {
    let mut mock = MockExtractor::new();
    mock.expect_supports()
        .returning(|url| url.contains("mock.example"));
    mock.expect_name().return_const("mock");
    mock
}

#[tokio::test]
async fn registry_routes_probe_to_matching_extractor() {
    let mut mock = mocked_extractor();
    mock.expect_probe().returning(|url| {
        Ok(MediaInfo {
            title: "Mocked media".to_string(),
            duration_seconds: Some(12.0),
            thumbnail_url: None,
            format: None,
            original_url: url.to_string(),
        })
    });

    let mut registry = ExtractorRegistry::default();
    registry.register(Box::new(mock));

    let info = registry
        .probe("https://mock.example/clip/42")
        .await
        .unwrap();
    assert_eq!(info.title, "Mocked media");
    assert_eq!(info.duration_seconds, Some(12.0));
}

#[tokio::test]
async fn registry_routes_fetch_to_matching_extractor() {
    let mut mock = mocked_extractor();
    mock.expect_fetch_audio()
        .returning(|_, stem| Ok(stem.with_extension("mp3")));

    let mut registry = ExtractorRegistry::default();
    registry.register(Box::new(mock));

    let dir = TempDir::new().unwrap();
    let stem = dir.path().join("audio_test");
    let audio_path = registry
        .fetch_audio("https://mock.example/clip/42", &stem)
        .await
        .unwrap();
    assert_eq!(audio_path, stem.with_extension("mp3"));
}

#[tokio::test]
async fn registry_rejects_bad_scheme_before_dispatch() {
    let registry = ExtractorRegistry::default();
    let err = registry
        .probe("ftp://example.com/a.mp3")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP or HTTPS"));
}

#[tokio::test]
async fn direct_probe_reads_title_from_path() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/My_Great-Episode.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .insert_header("content-length", "16"),
        )
        .mount(&server)
        .await;

    let extractor = DirectExtractor::new();
    let url = format!("{}/My_Great-Episode.mp3", server.uri());
    let info = extractor.probe(&url).await.unwrap();

    assert_eq!(info.title, "My Great Episode");
    assert_eq!(info.original_url, url);
    assert_eq!(info.duration_seconds, None);
    assert_eq!(info.format, Some(AudioFormat::Mp3));
}

#[tokio::test]
async fn direct_fetch_downloads_bytes() {
    let server = MockServer::start().await;
    let payload = b"fake mp3 payload".to_vec();

    Mock::given(method("HEAD"))
        .and(path("/episode.mp3"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "audio/mpeg"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/episode.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let extractor = DirectExtractor::new();
    let url = format!("{}/episode.mp3", server.uri());
    let audio_path = extractor
        .fetch_audio(&url, &dir.path().join("audio_ab12"))
        .await
        .unwrap();

    assert_eq!(
        audio_path.extension().and_then(|e| e.to_str()),
        Some("mp3")
    );
    assert_eq!(std::fs::read(&audio_path).unwrap(), payload);
}

#[tokio::test]
async fn direct_probe_surfaces_http_errors() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/gone.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let extractor = DirectExtractor::new();
    let err = extractor
        .probe(&format!("{}/gone.mp3", server.uri()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn local_fetch_copies_audio_files_as_is() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("talk.mp3");
    std::fs::write(&source, b"pretend audio").unwrap();

    let registry = ExtractorRegistry::default();
    let stem = dir.path().join("audio_copy");
    let audio_path = registry
        .fetch_audio(source.to_str().unwrap(), &stem)
        .await
        .unwrap();

    assert_eq!(audio_path, stem.with_extension("mp3"));
    assert_eq!(std::fs::read(&audio_path).unwrap(), b"pretend audio");
    // Source stays where it was
    assert!(source.exists());
}

#[tokio::test]
async fn local_fetch_rejects_empty_file() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("empty.mp3");
    std::fs::write(&source, b"").unwrap();

    let registry = ExtractorRegistry::default();
    let err = registry
        .fetch_audio(source.to_str().unwrap(), &dir.path().join("stem"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("empty"));
}
