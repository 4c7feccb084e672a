//! 에러 코드 체계
//!
//! 업데이트 파이프라인의 모든 결과를 닫힌 코드 집합으로 표현합니다.
//! 전송 계층(reqwest)이나 XML 파서의 원시 에러는 매니페스트 리더 경계에서
//! 이 모듈의 코드로 정규화된 뒤에만 공개 API를 넘습니다.

use serde::{Deserialize, Serialize};

/// 업데이트 파이프라인 결과 코드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateResult {
    /// 분류되지 않은 실패
    UnknownError,
    /// 정상 완료
    Ok,
    /// 서버 버전이 로컬보다 높지 않음
    NoUpdate,
    /// 업데이트 적용 완료
    UpdateSuccessful,
    /// 버전 확인 단계 실패
    VersionCheckError,
    /// 제한 시간 초과 또는 취소
    TimeoutOccurred,
    /// 네트워크 배포가 아닌 설치 — 업데이트 대상 아님
    NoNetworkInstall,
    /// 인스톨러 프로세스 시작 실패
    ErrorProcessNotStarted,
    /// 인스톨러 대기 중 취소되어 강제 종료함
    RunningTimeoutError,
    /// 애플리케이션 이름이 비어 있음
    ApplicationNameIsEmpty,
    /// 매니페스트 파일/스트림을 열 수 없음
    ManifestNotFound,
    /// 매니페스트 문서를 해석할 수 없음
    CannotProcessManifest,
    /// version 특성이 없거나 비어 있음
    VersionIsEmpty,
    /// 배포 캐시에서 데이터 디렉터리를 찾지 못함
    CannotFindDirectory,
}

impl UpdateResult {
    /// 코드별 표준 메시지
    pub fn describe(&self) -> &'static str {
        match self {
            UpdateResult::UnknownError => "Unknown error!",
            UpdateResult::Ok => "Ok",
            UpdateResult::NoUpdate => "No update available!",
            UpdateResult::UpdateSuccessful => "Update completed successfully",
            UpdateResult::VersionCheckError => "Error during version check!",
            UpdateResult::TimeoutOccurred => "Timeout occurred!",
            UpdateResult::NoNetworkInstall => "Not deployed by network!",
            UpdateResult::ErrorProcessNotStarted => "Can't start update process!",
            UpdateResult::RunningTimeoutError => "Running timeout error!",
            UpdateResult::ApplicationNameIsEmpty => "Application name is empty!",
            UpdateResult::ManifestNotFound => "Can't find manifest file!",
            UpdateResult::CannotProcessManifest => "Invalid manifest document!",
            UpdateResult::VersionIsEmpty => "Version info is empty!",
            UpdateResult::CannotFindDirectory => "Can't find application data directory!",
        }
    }

    /// 성공 계열 코드인지 (파이프라인이 정상 종료했는지)
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            UpdateResult::Ok | UpdateResult::UpdateSuccessful | UpdateResult::NoUpdate
        )
    }
}

/// 업데이트 엔진의 단일 에러 타입
///
/// 코드와 사람이 읽을 메시지를 함께 나릅니다. 호출측은 `code`로 분기하고
/// `message`는 로그/표시용으로만 사용합니다.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct DeploymentError {
    pub code: UpdateResult,
    pub message: String,
}

impl DeploymentError {
    pub fn new(code: UpdateResult, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 코드의 표준 메시지로 에러 생성
    pub fn from_code(code: UpdateResult) -> Self {
        Self {
            code,
            message: code.describe().to_string(),
        }
    }
}

impl From<UpdateResult> for DeploymentError {
    fn from(code: UpdateResult) -> Self {
        Self::from_code(code)
    }
}
