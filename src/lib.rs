//! # clickonce-updater-lib
//!
//! 네트워크 배포형 데스크톱 애플리케이션을 위한 셀프 업데이트 클라이언트
//! 라이브러리입니다. 설치 출처를 판별하고, 로컬/서버 배포 매니페스트에서
//! 버전을 읽어 비교한 뒤, 새 버전이 있으면 인스톨러를 내려받아 실행하고
//! 종료까지 추적합니다.
//!
//! ## 동작 원리
//! - **설치 출처 판별**: 실행 경로가 배포 캐시(`AppData/Local/Apps`) 내부인지
//!   확인하고, 퍼블리시 위치의 형태에 따라 Web / FileShare / NoNetwork 모드를
//!   생성 시 한 번 결정
//! - **버전 캐시**: 로컬/서버 버전은 최초 읽기 후 엔진 수명 동안 캐시
//! - **업데이트 실행**: 버전 재확인 → 인스톨러 다운로드(Web) 또는 공유 경로
//!   직접 사용(FileShare) → 실행 → 취소 토큰 경합 대기 → 타임아웃 시 강제
//!   종료 → 임시 파일 정리
//!
//! ## 아키텍처
//! - **매니페스트 리더(manifest.rs)**: XML 스트림에서 버전 추출, 취소 지원
//! - **설치 소스(install.rs)**: 배포 캐시 마커 / 데이터 디렉터리 탐색
//! - **실행기(launcher.rs)**: 분리 프로세스 시작, 셸 폴백
//! - **에러(error.rs)**: 닫힌 결과 코드 집합으로 정규화
//! - **스케줄러(scheduler.rs)**: 호스트 폴링용 원샷 체크 유틸리티
//!
//! 엔진은 백그라운드 태스크를 스폰하지 않습니다. 공개 연산은 호출 태스크
//! 안에서만 중단점을 가지며, 캐시를 변경하는 메서드는 `&mut self`를
//! 받으므로 호출측이 접근을 직렬화해야 합니다 (관례상
//! `Arc<RwLock<UpdateEngine>>`).
//!
//! ## 매니페스트 형식
//! 로컬은 `{installRoot}/{app}.exe.manifest`, 서버는
//! `{publish}/{app}.application`. 두 문서 모두 같은 요소에서 버전을 읽습니다:
//! ```xml
//! <asmv1:assembly xmlns:asmv1="urn:schemas-microsoft-com:asm.v1">
//!   <asmv1:assemblyIdentity name="demoapp.exe" version="1.0.1.0" />
//! </asmv1:assembly>
//! ```

// ══════════════════════════════════════════════════════
// 모듈
// ══════════════════════════════════════════════════════

pub mod error;
pub mod install;
pub mod launcher;
pub mod manifest;
pub mod scheduler;
pub mod version;


// Re-exports for convenience
pub use error::{DeploymentError, UpdateResult};
pub use install::InstallMode;
pub use scheduler::{CheckReport, SchedulerConfig};
pub use version::Version;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// HTTP 전송 타임아웃 (초) — 개별 요청의 하드 리밋
const HTTP_TRANSPORT_TIMEOUT_SECS: u64 = 30;

/// 퍼블리시 루트 기준 인스톨러 파일 이름
const SETUP_FILE_NAME: &str = "setup.exe";

// ══════════════════════════════════════════════════════
// 설정
// ══════════════════════════════════════════════════════

/// 엔진 설정
///
/// 오버라이드 필드는 테스트와 특수 호스트를 위한 것으로, 비워 두면
/// 실행 파일 경로와 플랫폼 기본 위치에서 유도됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 업데이트 확인 대상 퍼블리시 위치 (HTTP URL 또는 파일 공유 경로)
    pub publish_path: String,
    /// 버전 읽기 제한 시간 (초)
    pub check_timeout_secs: u64,
    /// 호스트 바이너리의 빌드 시점 버전 — 비네트워크 설치에서
    /// `current_version`이 이 값을 반환한다
    pub binary_version: Option<Version>,
    /// 애플리케이션 이름 오버라이드 (기본: 실행 파일 이름)
    pub app_name: Option<String>,
    /// 설치 루트 오버라이드 (기본: 실행 파일 디렉터리)
    pub install_root: Option<String>,
    /// 배포 캐시 데이터 루트 오버라이드 (테스트용 로컬 디렉터리 지원)
    pub data_root: Option<String>,
    /// 인스톨러 다운로드 디렉터리 오버라이드
    pub download_dir: Option<String>,
}

impl EngineConfig {
    pub fn new(publish_path: impl Into<String>) -> Self {
        Self {
            publish_path: publish_path.into(),
            ..Default::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            publish_path: String::new(),
            check_timeout_secs: 10,
            binary_version: None,
            app_name: None,
            install_root: None,
            data_root: None,
            download_dir: None,
        }
    }
}

/// UI/IPC 소비용 상태 스냅숏 — 캐시된 값만 반영하며 I/O를 하지 않는다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub install_mode: InstallMode,
    pub is_network_deployment: bool,
    pub data_dir: Option<String>,
    pub local_version: Option<Version>,
    pub server_version: Option<Version>,
    /// 마지막 서버 확인 시각 (RFC3339, 초기값은 엔진 생성 시각)
    pub last_check: String,
    pub update_available: bool,
}

// ══════════════════════════════════════════════════════
// UpdateEngine
// ══════════════════════════════════════════════════════

/// 업데이트 확인/다운로드/실행을 관리하는 엔진
///
/// 애플리케이션 실행당 한 번 생성합니다. 생성 시 설치 출처 판별이
/// 수행되며, 필수 정보(설치 루트, 애플리케이션 이름)를 얻지 못하면
/// 생성 자체가 실패합니다. HTTP 클라이언트는 엔진과 수명을 같이합니다.
pub struct UpdateEngine {
    config: EngineConfig,
    http: reqwest::Client,
    /// 실행 중인 애플리케이션 이름 (매니페스트 파일명의 기준)
    app_name: String,
    install_root: PathBuf,
    is_network_deployment: bool,
    install_mode: InstallMode,
    /// 배포 캐시의 사용자별 데이터 디렉터리 (탐색 실패 시 None)
    data_dir: Option<PathBuf>,
    /// {install_root}/{app}.exe.manifest
    manifest_path: PathBuf,
    /// {app}.application
    application_file_name: String,
    /// {publish}/{app}.application — FileShare 모드의 매니페스트이자 인스톨러
    application_file_path: PathBuf,
    /// 로컬 버전 캐시 — 매니페스트 재읽기를 줄이기 위한 것
    cached_local_version: Option<Version>,
    /// 서버 버전 캐시 — 성공한 확인 이후 엔진 수명 동안 유지
    cached_server_version: Option<Version>,
    /// 마지막으로 서버 버전을 성공적으로 읽은 시각
    last_check: DateTime<Utc>,
}

impl UpdateEngine {
    pub fn new(config: EngineConfig) -> Result<Self, DeploymentError> {
        let install_root = match &config.install_root {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.to_path_buf()))
                .ok_or_else(|| {
                    DeploymentError::new(
                        UpdateResult::UnknownError,
                        "Can't resolve install root directory!",
                    )
                })?,
        };

        let app_name = match &config.app_name {
            Some(name) => name.clone(),
            None => std::env::current_exe()
                .ok()
                .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .ok_or_else(|| {
                    DeploymentError::new(
                        UpdateResult::UnknownError,
                        "Can't find entry application name!",
                    )
                })?,
        };

        let is_network_deployment = install::is_deployment_cache_path(&install_root);

        let data_dir = if is_network_deployment {
            let data_root = Self::resolve_data_root(&config);
            let folder_name = install_root
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            install::search_app_data_dir(&data_root, &folder_name)?
        } else {
            None
        };

        let install_mode = install::resolve_install_mode(is_network_deployment, &config.publish_path);

        let manifest_path = install_root.join(format!("{}.exe.manifest", app_name));
        let application_file_name = format!("{}.application", app_name);
        let application_file_path = Path::new(&config.publish_path).join(&application_file_name);

        let http = reqwest::Client::builder()
            .user_agent(concat!("clickonce-updater/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(HTTP_TRANSPORT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                DeploymentError::new(
                    UpdateResult::UnknownError,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;

        tracing::debug!(
            "[Engine] Constructed: mode={:?} network={} root={}",
            install_mode,
            is_network_deployment,
            install_root.display()
        );

        Ok(Self {
            config,
            http,
            app_name,
            install_root,
            is_network_deployment,
            install_mode,
            data_dir,
            manifest_path,
            application_file_name,
            application_file_path,
            cached_local_version: None,
            cached_server_version: None,
            last_check: Utc::now(),
        })
    }

    fn resolve_data_root(config: &EngineConfig) -> PathBuf {
        if let Some(ref p) = config.data_root {
            if !p.is_empty() {
                return PathBuf::from(p);
            }
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA")
                .map(|d| PathBuf::from(d).join("Apps").join("2.0").join("Data"))
                .unwrap_or_else(|_| PathBuf::from("."))
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var("HOME")
                .map(|d| {
                    PathBuf::from(d)
                        .join(".local")
                        .join("share")
                        .join("Apps")
                        .join("2.0")
                        .join("Data")
                })
                .unwrap_or_else(|_| PathBuf::from("."))
        }
    }

    /// 인스톨러 다운로드 디렉터리 결정
    fn resolve_download_dir(&self) -> PathBuf {
        if let Some(ref p) = self.config.download_dir {
            if !p.is_empty() {
                return PathBuf::from(p);
            }
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA")
                .map(|d| PathBuf::from(d).join(&self.app_name).join("updates"))
                .unwrap_or_else(|_| PathBuf::from("./updates"))
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var("HOME")
                .map(|d| {
                    PathBuf::from(d)
                        .join(".cache")
                        .join(&self.app_name)
                        .join("updates")
                })
                .unwrap_or_else(|_| PathBuf::from("./updates"))
        }
    }

    // ─── 조회 ────────────────────────────────────────────

    /// 네트워크 배포 여부
    pub fn is_network_deployment(&self) -> bool {
        self.is_network_deployment
    }

    /// 설치 모드 (생성 시 고정)
    pub fn install_mode(&self) -> InstallMode {
        self.install_mode
    }

    /// 애플리케이션이 설치된 루트 디렉터리
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// 배포 캐시의 데이터 디렉터리
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// 업데이트를 확인하는 퍼블리시 위치
    pub fn update_location(&self) -> &str {
        &self.config.publish_path
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// 마지막으로 서버 버전을 성공적으로 읽은 시각
    pub fn last_check_time(&self) -> DateTime<Utc> {
        self.last_check
    }

    /// 서버 버전 확인이 성공한 적이 있는지
    pub fn server_version_checked(&self) -> bool {
        self.cached_server_version.is_some()
    }

    /// 서버 매니페스트 URL (Web 모드)
    pub fn manifest_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.publish_path.trim_end_matches('/'),
            self.application_file_name
        )
    }

    /// 인스톨러 URL (Web 모드) — 퍼블리시 위치의 슬래시 유무와 무관하게
    /// 구분자는 정확히 한 개
    pub fn installer_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.publish_path.trim_end_matches('/'),
            SETUP_FILE_NAME
        )
    }

    /// 캐시 기준 상태 스냅숏
    pub fn status(&self) -> EngineStatus {
        let local_version = self.cached_local_version.clone().or_else(|| {
            if !self.is_network_deployment {
                self.config.binary_version.clone()
            } else {
                None
            }
        });

        let update_available = match (&local_version, &self.cached_server_version) {
            (Some(local), Some(server)) => self.is_network_deployment && server > local,
            _ => false,
        };

        EngineStatus {
            install_mode: self.install_mode,
            is_network_deployment: self.is_network_deployment,
            data_dir: self
                .data_dir
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            local_version,
            server_version: self.cached_server_version.clone(),
            last_check: self.last_check.to_rfc3339(),
            update_available,
        }
    }

    // ─── 버전 읽기 ───────────────────────────────────────

    /// 현재 설치된 버전
    ///
    /// 캐시가 있으면 캐시를, 비네트워크 설치면 설정된 바이너리 버전을
    /// 반환합니다. 네트워크 설치는 `check_timeout_secs`로 제한된 로컬
    /// 매니페스트 읽기를 수행하고 캐시를 채웁니다. 두 번째 호출부터는
    /// 매니페스트를 다시 읽지 않습니다.
    pub async fn current_version(&mut self) -> Result<Version, DeploymentError> {
        if let Some(ref version) = self.cached_local_version {
            return Ok(version.clone());
        }

        if !self.is_network_deployment {
            return self.config.binary_version.clone().ok_or_else(|| {
                DeploymentError::new(
                    UpdateResult::UnknownError,
                    "Binary version is not configured for a non-network install",
                )
            });
        }

        let limit = Duration::from_secs(self.config.check_timeout_secs);
        let token = CancellationToken::new();
        match tokio::time::timeout(limit, self.refresh_local_version(&token)).await {
            Ok(result) => result,
            Err(_) => Err(DeploymentError::from_code(UpdateResult::TimeoutOccurred)),
        }
    }

    /// 로컬 매니페스트를 다시 읽고 캐시를 갱신
    pub async fn refresh_local_version(
        &mut self,
        token: &CancellationToken,
    ) -> Result<Version, DeploymentError> {
        if !self.is_network_deployment {
            return Err(DeploymentError::from_code(UpdateResult::NoNetworkInstall));
        }
        if self.app_name.is_empty() {
            return Err(DeploymentError::from_code(
                UpdateResult::ApplicationNameIsEmpty,
            ));
        }

        let version = manifest::read_local_manifest(&self.manifest_path, token).await?;
        self.cached_local_version = Some(version.clone());
        Ok(version)
    }

    /// 서버 매니페스트를 다시 읽고 캐시와 확인 시각을 갱신
    pub async fn refresh_server_version(
        &mut self,
        token: &CancellationToken,
    ) -> Result<Version, DeploymentError> {
        let version = match self.install_mode {
            InstallMode::Web => {
                let url = self.manifest_url();
                tracing::debug!("[Engine] Fetching server manifest: {}", url);

                let response = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(DeploymentError::from_code(UpdateResult::TimeoutOccurred));
                    }
                    sent = self.http.get(&url).send() => sent.map_err(|e| {
                        DeploymentError::new(
                            UpdateResult::CannotProcessManifest,
                            format!("Manifest request failed: {}", e),
                        )
                    })?,
                };

                if response.status() == reqwest::StatusCode::NOT_FOUND {
                    return Err(DeploymentError::new(
                        UpdateResult::ManifestNotFound,
                        format!("Can't find manifest at {}", url),
                    ));
                }
                if !response.status().is_success() {
                    return Err(DeploymentError::new(
                        UpdateResult::CannotProcessManifest,
                        format!("Manifest request failed: HTTP {}", response.status()),
                    ));
                }

                manifest::read_remote_manifest(response, token).await?
            }
            InstallMode::FileShare => {
                manifest::read_local_manifest(&self.application_file_path, token).await?
            }
            InstallMode::NoNetwork => {
                return Err(DeploymentError::from_code(UpdateResult::NoNetworkInstall));
            }
        };

        self.cached_server_version = Some(version.clone());
        self.last_check = Utc::now();
        Ok(version)
    }

    /// 마지막으로 읽은 서버 버전
    ///
    /// 캐시가 없으면 제한 시간 안에서 한 번 읽기를 시도하고, 그 시도의
    /// 오류는 삼킨 뒤(로그만 남김) 캐시 상태를 그대로 반환합니다.
    pub async fn cached_server_version(&mut self) -> Option<Version> {
        if self.cached_server_version.is_some() {
            return self.cached_server_version.clone();
        }

        let limit = Duration::from_secs(self.config.check_timeout_secs);
        let token = CancellationToken::new();
        match tokio::time::timeout(limit, self.refresh_server_version(&token)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!("[Engine] Server version check failed: {}", e);
            }
            Err(_) => {
                tracing::warn!(
                    "[Engine] Server version check timed out after {}s",
                    self.config.check_timeout_secs
                );
            }
        }

        self.cached_server_version.clone()
    }

    /// 캐시 기준 업데이트 가능 여부
    ///
    /// 네트워크 배포이고, 서버 확인이 성공했고, 캐시된 서버 버전이 현재
    /// 버전보다 엄격히 높을 때만 true.
    pub async fn cached_update_available(&mut self) -> bool {
        if !self.is_network_deployment || !self.server_version_checked() {
            return false;
        }

        match self.current_version().await {
            Ok(current) => self
                .cached_server_version
                .as_ref()
                .map(|server| server > &current)
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!("[Engine] Local version read failed: {}", e);
                false
            }
        }
    }

    // ─── 업데이트 확인 / 실행 ────────────────────────────

    /// 로컬/서버 버전을 새로 읽어 업데이트 여부 판정 (오류 보존 변형)
    pub async fn try_check_update_available(
        &mut self,
        token: &CancellationToken,
    ) -> Result<bool, DeploymentError> {
        let current = self.refresh_local_version(token).await?;
        let server = self.refresh_server_version(token).await?;
        Ok(current < server)
    }

    /// 업데이트 여부 판정 — 읽기 실패는 false로 수렴 (로그만 남김)
    pub async fn check_update_available(&mut self, token: &CancellationToken) -> bool {
        match self.try_check_update_available(token).await {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!("[Engine] Update check failed: {}", e);
                false
            }
        }
    }

    /// 업데이트 실행
    ///
    /// 버전을 새로 확인한 뒤(확인과 실행 사이의 캐시 오염 방지) 인스톨러를
    /// 받아 실행하고 종료까지 기다립니다. 결과는 항상 닫힌 코드로
    /// 보고됩니다. 취소로 다운로드가 중단되면 부분 파일을 삭제하고
    /// `TimeoutOccurred`, 대기 중 취소되면 인스톨러를 강제 종료하고
    /// `RunningTimeoutError`를 반환합니다. 인스톨러가 이미 일부 실행된 뒤
    /// 종료될 수 있다는 점은 엔진이 완화하지 않습니다.
    pub async fn update(&mut self, token: &CancellationToken) -> UpdateResult {
        if self.install_mode == InstallMode::NoNetwork {
            return UpdateResult::NoNetworkInstall;
        }

        // 시작 전에 이미 취소된 토큰 — 부수 효과 없이 종료
        if token.is_cancelled() {
            return UpdateResult::NoUpdate;
        }

        let available = match self.try_check_update_available(token).await {
            Ok(available) => available,
            Err(e) if e.code == UpdateResult::TimeoutOccurred => {
                tracing::warn!("[Engine] Version check cancelled before update");
                return UpdateResult::TimeoutOccurred;
            }
            Err(e) => {
                tracing::warn!("[Engine] Version check failed before update: {}", e);
                return UpdateResult::VersionCheckError;
            }
        };
        if !available {
            return UpdateResult::NoUpdate;
        }

        // try_check 성공 직후이므로 서버 버전 캐시는 채워져 있다
        let server_version = match self.cached_server_version.clone() {
            Some(version) => version,
            None => return UpdateResult::UnknownError,
        };

        let (installer_path, downloaded) = match self.install_mode {
            InstallMode::Web => match self.download_installer(&server_version, token).await {
                Ok(path) => (path, true),
                Err(code) => return code,
            },
            // 공유 경로의 배포 파일 자체가 실행 대상 — 다운로드 없음
            InstallMode::FileShare => (self.application_file_path.clone(), false),
            InstallMode::NoNetwork => return UpdateResult::NoNetworkInstall,
        };

        let outcome = self.run_installer(&installer_path, token).await;

        // 성공 시에만 내려받은 임시 파일 삭제. 파일 공유 인스톨러는
        // 엔진 소유가 아니므로 삭제하지 않는다.
        if downloaded && outcome == UpdateResult::Ok {
            if let Err(e) = std::fs::remove_file(&installer_path) {
                tracing::warn!(
                    "[Engine] Failed to delete downloaded installer {}: {}",
                    installer_path.display(),
                    e
                );
            }
        }

        outcome
    }

    /// 인스톨러 바이트를 임시 경로로 다운로드
    ///
    /// 파일 이름에 서버 버전을 넣어 서로 다른 버전의 동시 시도가 충돌하지
    /// 않게 합니다. 취소 시 부분 파일은 삭제됩니다.
    async fn download_installer(
        &self,
        server_version: &Version,
        token: &CancellationToken,
    ) -> Result<PathBuf, UpdateResult> {
        let url = self.installer_url();
        tracing::info!("[Engine] Downloading installer: {}", url);

        if token.is_cancelled() {
            return Err(UpdateResult::TimeoutOccurred);
        }

        let response = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(UpdateResult::TimeoutOccurred),
            sent = self.http.get(&url).send() => match sent {
                Ok(resp) if resp.status().is_success() => resp,
                Ok(resp) => {
                    tracing::error!("[Engine] Installer download failed: HTTP {}", resp.status());
                    return Err(UpdateResult::UnknownError);
                }
                Err(e) => {
                    tracing::error!("[Engine] Installer download failed: {}", e);
                    return Err(UpdateResult::UnknownError);
                }
            },
        };

        let download_dir = self.resolve_download_dir();
        if let Err(e) = std::fs::create_dir_all(&download_dir) {
            tracing::error!(
                "[Engine] Can't create download dir {}: {}",
                download_dir.display(),
                e
            );
            return Err(UpdateResult::UnknownError);
        }
        let setup_path = download_dir.join(format!("setup{}.exe", server_version));

        if let Err(code) = self.copy_to_file(response, &setup_path, token).await {
            let _ = std::fs::remove_file(&setup_path);
            return Err(code);
        }

        // 파일 확정 직전 마지막 취소 확인
        if token.is_cancelled() {
            let _ = std::fs::remove_file(&setup_path);
            return Err(UpdateResult::TimeoutOccurred);
        }

        tracing::info!("[Engine] Installer saved: {}", setup_path.display());
        Ok(setup_path)
    }

    async fn copy_to_file(
        &self,
        response: reqwest::Response,
        dest: &Path,
        token: &CancellationToken,
    ) -> Result<(), UpdateResult> {
        use futures_util::StreamExt;
        use tokio::io::AsyncWriteExt;

        let mut file = match tokio::fs::File::create(dest).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("[Engine] Can't create {}: {}", dest.display(), e);
                return Err(UpdateResult::UnknownError);
            }
        };

        let mut stream = response.bytes_stream();
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::warn!("[Engine] Installer download cancelled");
                    return Err(UpdateResult::TimeoutOccurred);
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        if let Err(e) = file.write_all(&bytes).await {
                            tracing::error!("[Engine] Write failed for {}: {}", dest.display(), e);
                            return Err(UpdateResult::UnknownError);
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!("[Engine] Download stream error: {}", e);
                        return Err(UpdateResult::UnknownError);
                    }
                    None => break,
                }
            }
        }

        if let Err(e) = file.flush().await {
            tracing::error!("[Engine] Flush failed for {}: {}", dest.display(), e);
            return Err(UpdateResult::UnknownError);
        }
        Ok(())
    }

    /// 인스톨러를 실행하고 종료를 기다린다
    async fn run_installer(&self, installer_path: &Path, token: &CancellationToken) -> UpdateResult {
        let working_dir = installer_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let child = match launcher::open_path(installer_path, &working_dir) {
            Some(child) => child,
            None => return UpdateResult::ErrorProcessNotStarted,
        };

        self.await_installer(child, token).await
        // child는 await_installer에서 drop — 모든 경로에서 핸들 해제
    }

    async fn await_installer(
        &self,
        mut child: tokio::process::Child,
        token: &CancellationToken,
    ) -> UpdateResult {
        tokio::select! {
            status = child.wait() => {
                return match status {
                    Ok(status) => {
                        // 인스톨러의 종료 코드는 판정하지 않는다 — 기록만
                        tracing::info!("[Engine] Installer exited: {:?}", status.code());
                        UpdateResult::Ok
                    }
                    Err(e) => {
                        tracing::error!("[Engine] Failed to wait for installer: {}", e);
                        UpdateResult::UnknownError
                    }
                };
            }
            _ = token.cancelled() => {}
        }

        // 취소 분기 — select가 wait 퓨처를 놓은 뒤 강제 종료한다
        tracing::warn!("[Engine] Installer wait cancelled — killing process");
        if let Err(e) = child.kill().await {
            tracing::error!("[Engine] Failed to kill installer: {}", e);
        }
        UpdateResult::RunningTimeoutError
    }
}
