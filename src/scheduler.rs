//! 원샷 업데이트 체크 유틸리티
//!
//! 엔진 자체는 백그라운드 태스크를 돌리지 않습니다. 호스트(GUI/트레이)가
//! 시작 시점이나 타이머에서 `check_once`를 호출해 업데이트 여부를
//! 확인합니다. 이 모듈은 그때 쓰는 유틸리티와 타이머 간격 설정을
//! 제공합니다.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::{UpdateEngine, Version};

/// 체크 간격 설정 — 호스트가 타이머 간격을 결정할 때 참조
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 체크 간격 (시간 단위, 기본 3시간)
    pub interval_hours: u32,
    /// 체크 활성화 여부
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_hours: 3,
            enabled: true,
        }
    }
}

impl SchedulerConfig {
    /// 체크 간격을 Duration으로 변환
    pub fn interval_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_hours as u64 * 3600)
    }

    /// 체크 간격을 밀리초로 (JS setInterval 등에서 사용)
    pub fn interval_millis(&self) -> u64 {
        self.interval_hours as u64 * 3600 * 1000
    }

    /// 하루에 몇 번 체크하는지 계산
    pub fn checks_per_day(&self) -> u32 {
        if self.interval_hours == 0 {
            return 0;
        }
        24 / self.interval_hours
    }
}

/// 원샷 체크 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    /// 업데이트 가능 여부
    pub update_available: bool,
    /// 확인된 로컬 버전
    pub local_version: Option<Version>,
    /// 확인된 서버 버전
    pub server_version: Option<Version>,
    /// 오류 메시지 (있으면)
    pub error: Option<String>,
}

/// 한 번 체크하고 결과를 반환합니다.
///
/// 호스트가 주기적으로 호출하는 핵심 함수입니다. 실패해도 패닉 없이
/// 오류를 결과에 담아 돌려줍니다.
pub async fn check_once(engine: &Arc<RwLock<UpdateEngine>>) -> CheckReport {
    let mut eng = engine.write().await;

    if !eng.is_network_deployment() {
        return CheckReport {
            update_available: false,
            local_version: None,
            server_version: None,
            error: Some("Not deployed by network".into()),
        };
    }

    tracing::info!("[Scheduler] Running one-shot update check");

    let token = CancellationToken::new();
    match eng.try_check_update_available(&token).await {
        Ok(available) => {
            let status = eng.status();
            if available {
                tracing::info!(
                    "[Scheduler] Update available: {:?} -> {:?}",
                    status.local_version,
                    status.server_version
                );
            } else {
                tracing::info!("[Scheduler] Application is up to date");
            }
            CheckReport {
                update_available: available,
                local_version: status.local_version,
                server_version: status.server_version,
                error: None,
            }
        }
        Err(e) => {
            tracing::error!("[Scheduler] Check failed: {}", e);
            CheckReport {
                update_available: false,
                local_version: None,
                server_version: None,
                error: Some(e.to_string()),
            }
        }
    }
}

/// 체크 결과를 JSON 문자열로 직렬화 (프로세스 간 통신용)
pub fn report_to_json(report: &CheckReport) -> String {
    serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
}

/// 프로세스 종료 코드 결정
///
/// - `0` — 업데이트 있음 (호출측에서 알림 표시)
/// - `1` — 체크 실패 (에러)
/// - `2` — 업데이트 없음 (조용히 종료)
pub fn exit_code(report: &CheckReport) -> i32 {
    if report.error.is_some() {
        1
    } else if report.update_available {
        0
    } else {
        2
    }
}
