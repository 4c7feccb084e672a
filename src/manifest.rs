//! 배포 매니페스트 리더
//!
//! 배포 매니페스트(XML)에서 `assemblyIdentity` 요소의 `version` 특성을
//! 읽어 버전을 추출합니다. 로컬 파일과 원격 HTTP 스트림을 모두 지원하며,
//! 원격 읽기는 청크 단위로 취소 토큰에 반응합니다.
//!
//! 파싱은 전체 본문을 버퍼링한 뒤 수행합니다. 느린 스트림에서의 중단점은
//! 버퍼링 루프 안에 있습니다.

use std::path::Path;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{DeploymentError, UpdateResult};
use crate::version::Version;

/// MS 어셈블리 스키마 v1 네임스페이스
pub const ASM_V1_NAMESPACE: &str = "urn:schemas-microsoft-com:asm.v1";

/// XML 텍스트에서 배포 버전 추출
///
/// 실패 분류:
/// - 문서가 XML이 아니거나 `assemblyIdentity` 요소가 없음 → `CannotProcessManifest`
/// - 요소는 있지만 `version` 특성이 없거나 빈 문자열 → `VersionIsEmpty`
/// - 특성 값이 점 표기 버전으로 파싱되지 않음 → `CannotProcessManifest`
pub fn parse_manifest(xml: &str) -> Result<Version, DeploymentError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| {
        DeploymentError::new(
            UpdateResult::CannotProcessManifest,
            format!("Invalid manifest document: {}", e),
        )
    })?;

    let identity = doc
        .descendants()
        .find(|n| n.has_tag_name((ASM_V1_NAMESPACE, "assemblyIdentity")))
        .ok_or_else(|| {
            DeploymentError::new(
                UpdateResult::CannotProcessManifest,
                "Manifest has no assemblyIdentity element",
            )
        })?;

    let raw = identity.attribute("version").unwrap_or("");
    if raw.is_empty() {
        return Err(DeploymentError::from_code(UpdateResult::VersionIsEmpty));
    }

    Version::parse(raw).ok_or_else(|| {
        DeploymentError::new(
            UpdateResult::CannotProcessManifest,
            format!("Unparsable version '{}' in manifest", raw),
        )
    })
}

/// 로컬 매니페스트 파일에서 버전 읽기
///
/// 파일이 없으면 `ManifestNotFound`, 읽기 전에 토큰이 취소되면
/// `TimeoutOccurred`.
pub async fn read_local_manifest(
    path: &Path,
    token: &CancellationToken,
) -> Result<Version, DeploymentError> {
    if !path.exists() {
        return Err(DeploymentError::new(
            UpdateResult::ManifestNotFound,
            format!("Can't find manifest file at path {}", path.display()),
        ));
    }

    let content = tokio::select! {
        biased;
        _ = token.cancelled() => {
            return Err(DeploymentError::from_code(UpdateResult::TimeoutOccurred));
        }
        read = tokio::fs::read_to_string(path) => read.map_err(|e| {
            DeploymentError::new(
                UpdateResult::CannotProcessManifest,
                format!("Can't read manifest {}: {}", path.display(), e),
            )
        })?,
    };

    parse_manifest(&content)
}

/// HTTP 응답 본문을 버퍼링하며 매니페스트 파싱
///
/// 청크마다 취소를 확인하고, 취소되면 `TimeoutOccurred`로 중단합니다.
pub async fn read_remote_manifest(
    response: reqwest::Response,
    token: &CancellationToken,
) -> Result<Version, DeploymentError> {
    let mut stream = response.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("[Manifest] Remote read cancelled after {} bytes", buf.len());
                return Err(DeploymentError::from_code(UpdateResult::TimeoutOccurred));
            }
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    return Err(DeploymentError::new(
                        UpdateResult::CannotProcessManifest,
                        format!("Manifest download failed: {}", e),
                    ));
                }
                None => break,
            }
        }
    }

    let text = String::from_utf8(buf).map_err(|_| {
        DeploymentError::new(
            UpdateResult::CannotProcessManifest,
            "Manifest is not valid UTF-8",
        )
    })?;

    parse_manifest(&text)
}
