//! ═══════════════════════════════════════════════════════════════════
//! 엔진 통합 테스트
//! ═══════════════════════════════════════════════════════════════════
//!
//! 로컬 axum 서버로 퍼블리시 위치(Web 모드)를 모킹하여 전체 파이프라인을
//! 검증합니다:
//!
//! 1. **확인 → 다운로드 → 실행 → 정리** 전체 흐름
//! 2. **취소 계약** — 다운로드 전 취소, 실행 대기 중 취소(강제 종료)
//! 3. **실패 정규화** — 404 매니페스트, 동일 버전
//! 4. **스케줄러 원샷 체크**
//!
//! 인스톨러는 셸 스크립트 본문으로 모킹합니다. 실행 비트 없이 내려받은
//! 파일은 직접 실행에 실패하고 런처의 sh 폴백으로 실행됩니다.
//! 모든 테스트는 tempdir로 파일시스템을 격리합니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use clickonce_updater_lib::scheduler;
use clickonce_updater_lib::{
    EngineConfig, InstallMode, UpdateEngine, UpdateResult, Version,
};

// ═══════════════════════════════════════════════════════
// 테스트 유틸리티
// ═══════════════════════════════════════════════════════

fn manifest_xml(version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<asmv1:assembly xmlns:asmv1="urn:schemas-microsoft-com:asm.v1" manifestVersion="1.0">
  <asmv1:assemblyIdentity name="demoapp.exe" version="{}" type="win32" />
</asmv1:assembly>"#,
        version
    )
}

/// 모킹 퍼블리시 서버 라우터
///
/// `/pub/demoapp.application` → 배포 매니페스트 (옵션: 응답 지연)
/// `/pub/setup.exe` → 인스톨러 본문
fn mock_publish_router(manifest: String, installer: Vec<u8>, manifest_delay_ms: u64) -> Router {
    Router::new()
        .route(
            "/pub/demoapp.application",
            get(move || {
                let manifest = manifest.clone();
                async move {
                    if manifest_delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(manifest_delay_ms)).await;
                    }
                    manifest
                }
            }),
        )
        .route(
            "/pub/setup.exe",
            get(move || {
                let installer = installer.clone();
                async move { installer }
            }),
        )
}

/// 로컬 모킹 서버 시작. 반환: (베이스 URL, JoinHandle)
async fn start_mock_publish_server(
    router: Router,
) -> Result<(String, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server died");
    });

    Ok((format!("http://{}", addr), handle))
}

/// 네트워크 배포 설치 루트 + 로컬 매니페스트 준비
fn make_install_root(base: &Path, local_version: &str) -> PathBuf {
    let root = base
        .join("AppData")
        .join("Local")
        .join("Apps")
        .join("2.0")
        .join("demoapp.1a2b3c4d");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("demoapp.exe.manifest"), manifest_xml(local_version)).unwrap();
    root
}

fn web_engine(base: &Path, root: &Path, publish_url: &str) -> Result<UpdateEngine> {
    let config = EngineConfig {
        publish_path: publish_url.to_string(),
        check_timeout_secs: 5,
        binary_version: None,
        app_name: Some("demoapp".to_string()),
        install_root: Some(root.display().to_string()),
        data_root: Some(base.join("data-root").display().to_string()),
        download_dir: Some(base.join("downloads").display().to_string()),
    };
    Ok(UpdateEngine::new(config)?)
}

/// 토큰을 일정 시간 뒤에 취소
fn cancel_after(token: &CancellationToken, delay_ms: u64) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        token.cancel();
    });
}

// ═══════════════════════════════════════════════════════
// 테스트 1: 전체 흐름 (확인 → 다운로드 → 실행 → 정리)
// ═══════════════════════════════════════════════════════

#[cfg(unix)]
#[tokio::test]
async fn end_to_end_web_update() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    let router = mock_publish_router(manifest_xml("1.0.1.0"), b"exit 0\n".to_vec(), 0);
    let (url, server) = start_mock_publish_server(router).await?;

    // 퍼블리시 위치에 의도적으로 슬래시를 붙여 정규화까지 함께 검증
    let mut engine = web_engine(base.path(), &root, &format!("{}/pub/", url))?;
    assert_eq!(engine.install_mode(), InstallMode::Web);

    let token = CancellationToken::new();
    assert!(engine.check_update_available(&token).await);
    assert!(engine.server_version_checked());

    let outcome = engine.update(&token).await;
    assert_eq!(outcome, UpdateResult::Ok);

    // 내려받은 인스톨러는 성공 후 삭제되어야 한다
    let setup_path = base.path().join("downloads").join("setup1.0.1.0.exe");
    assert!(!setup_path.exists(), "temp installer should be deleted");

    server.abort();
    Ok(())
}

#[tokio::test]
async fn web_check_against_equal_server_version() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    let router = mock_publish_router(manifest_xml("1.0.0.0"), b"exit 0\n".to_vec(), 0);
    let (url, server) = start_mock_publish_server(router).await?;

    let mut engine = web_engine(base.path(), &root, &format!("{}/pub", url))?;
    let token = CancellationToken::new();

    assert!(!engine.check_update_available(&token).await);
    assert_eq!(engine.update(&token).await, UpdateResult::NoUpdate);

    // NoUpdate 경로는 다운로드를 만들지 않는다
    assert!(!base.path().join("downloads").exists());

    server.abort();
    Ok(())
}

#[tokio::test]
async fn web_server_version_cached_after_first_read() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    let router = mock_publish_router(manifest_xml("1.0.2.0"), Vec::new(), 0);
    let (url, server) = start_mock_publish_server(router).await?;

    let mut engine = web_engine(base.path(), &root, &format!("{}/pub", url))?;

    assert_eq!(
        engine.cached_server_version().await,
        Some(Version::new(1, 0, 2, 0))
    );
    assert!(engine.cached_update_available().await);

    // 서버를 내려도 캐시는 살아 있어야 한다
    server.abort();
    assert_eq!(
        engine.cached_server_version().await,
        Some(Version::new(1, 0, 2, 0))
    );
    Ok(())
}

// ═══════════════════════════════════════════════════════
// 테스트 2: 취소 계약
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn update_cancelled_before_download_leaves_no_file() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    // 서버 매니페스트 응답을 지연시켜 버전 확인 중에 취소가 발생하게 한다
    let router = mock_publish_router(manifest_xml("1.0.1.0"), b"exit 0\n".to_vec(), 2_000);
    let (url, server) = start_mock_publish_server(router).await?;

    let mut engine = web_engine(base.path(), &root, &format!("{}/pub", url))?;
    let token = CancellationToken::new();
    cancel_after(&token, 100);

    let outcome = engine.update(&token).await;
    assert_eq!(outcome, UpdateResult::TimeoutOccurred);

    // 다운로드 단계 전에 중단 — 임시 파일이 생기면 안 된다
    assert!(!base.path().join("downloads").exists());

    server.abort();
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn update_kills_installer_on_cancellation_during_wait() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    // 오래 걸리는 인스톨러 — 대기 중 취소되면 강제 종료되어야 한다
    let router = mock_publish_router(manifest_xml("1.0.1.0"), b"sleep 30\n".to_vec(), 0);
    let (url, server) = start_mock_publish_server(router).await?;

    let mut engine = web_engine(base.path(), &root, &format!("{}/pub", url))?;
    let token = CancellationToken::new();
    cancel_after(&token, 300);

    let outcome = engine.update(&token).await;
    assert_eq!(outcome, UpdateResult::RunningTimeoutError);

    // 강제 종료 경로에서는 임시 파일을 삭제하지 않는다 (성공 시에만 정리)
    let setup_path = base.path().join("downloads").join("setup1.0.1.0.exe");
    assert!(setup_path.exists());

    server.abort();
    Ok(())
}

// ═══════════════════════════════════════════════════════
// 테스트 3: 실패 정규화
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn missing_server_manifest_maps_to_manifest_not_found() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    // setup.exe만 서빙 — 매니페스트 경로는 404
    let router = Router::new().route("/pub/setup.exe", get(|| async { "noop" }));
    let (url, server) = start_mock_publish_server(router).await?;

    let mut engine = web_engine(base.path(), &root, &format!("{}/pub", url))?;
    let token = CancellationToken::new();

    let err = engine
        .try_check_update_available(&token)
        .await
        .unwrap_err();
    assert_eq!(err.code, UpdateResult::ManifestNotFound);

    assert!(!engine.check_update_available(&token).await);
    assert!(!engine.server_version_checked());

    server.abort();
    Ok(())
}

#[tokio::test]
async fn garbage_server_manifest_maps_to_cannot_process() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    let router = mock_publish_router("this is not xml".to_string(), Vec::new(), 0);
    let (url, server) = start_mock_publish_server(router).await?;

    let mut engine = web_engine(base.path(), &root, &format!("{}/pub", url))?;
    let token = CancellationToken::new();

    let err = engine.refresh_server_version(&token).await.unwrap_err();
    assert_eq!(err.code, UpdateResult::CannotProcessManifest);

    server.abort();
    Ok(())
}

// ═══════════════════════════════════════════════════════
// 테스트 4: 스케줄러 원샷 체크
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn scheduler_check_once_reports_available_update() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    let router = mock_publish_router(manifest_xml("1.0.1.0"), Vec::new(), 0);
    let (url, server) = start_mock_publish_server(router).await?;

    let engine = web_engine(base.path(), &root, &format!("{}/pub", url))?;
    let engine = Arc::new(RwLock::new(engine));

    let report = scheduler::check_once(&engine).await;
    assert!(report.update_available);
    assert_eq!(report.local_version, Some(Version::new(1, 0, 0, 0)));
    assert_eq!(report.server_version, Some(Version::new(1, 0, 1, 0)));
    assert!(report.error.is_none());
    assert_eq!(scheduler::exit_code(&report), 0);

    let json = scheduler::report_to_json(&report);
    assert!(json.contains("\"1.0.1.0\""));

    server.abort();
    Ok(())
}

#[tokio::test]
async fn scheduler_check_once_captures_failure() -> Result<()> {
    let base = tempfile::tempdir()?;
    let root = make_install_root(base.path(), "1.0.0.0");

    // 서버 없음 — 연결 실패가 보고서에 담겨야 한다
    let engine = web_engine(base.path(), &root, "http://127.0.0.1:9/pub")?;
    let engine = Arc::new(RwLock::new(engine));

    let report = scheduler::check_once(&engine).await;
    assert!(!report.update_available);
    assert!(report.error.is_some());
    assert_eq!(scheduler::exit_code(&report), 1);

    Ok(())
}
