//! 외부 프로세스 실행기
//!
//! 인스톨러 실행 파일을 분리된 자식 프로세스로 시작합니다. 직접 실행이
//! 실패하면 커맨드 셸에 대상을 인자로 넘기는 폴백을 사용합니다.

use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

/// `&`를 cmd 이스케이프(`^&`)로 치환 — `cmd /c start`는 인자 안의 `&`를
/// 그대로 받지 못한다
pub fn escape_shell_amp(target: &str) -> String {
    target.replace('&', "^&")
}

/// Windows: 콘솔 창 숨김 플래그 적용. 그 외 플랫폼은 no-op.
#[cfg(target_os = "windows")]
fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW)
}

#[cfg(not(target_os = "windows"))]
fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    cmd
}

/// 대상 경로를 자식 프로세스로 실행
///
/// stdin은 차단(null), stdout/stderr는 부모를 따릅니다. 직접 실행이
/// 실패하면 커맨드 셸 폴백을 시도하고, 둘 다 실패하면 `None`을
/// 반환합니다. 호출측(엔진)은 `None`을 `ErrorProcessNotStarted`로
/// 처리합니다.
pub fn open_path(target: &Path, working_dir: &Path) -> Option<Child> {
    let mut cmd = Command::new(target);
    cmd.current_dir(working_dir)
        .stdin(Stdio::null())
        .kill_on_drop(false);
    apply_creation_flags(&mut cmd);

    match cmd.spawn() {
        Ok(child) => Some(child),
        Err(e) => {
            tracing::warn!(
                "[Launcher] Direct start failed for {}: {} — falling back to command shell",
                target.display(),
                e
            );
            spawn_via_shell(target, working_dir)
        }
    }
}

#[cfg(target_os = "windows")]
fn spawn_via_shell(target: &Path, working_dir: &Path) -> Option<Child> {
    let escaped = escape_shell_amp(&target.to_string_lossy());

    let mut cmd = Command::new("cmd");
    cmd.arg("/c")
        .arg("start")
        .arg(escaped)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .kill_on_drop(false);
    apply_creation_flags(&mut cmd);

    match cmd.spawn() {
        Ok(child) => Some(child),
        Err(e) => {
            tracing::error!("[Launcher] Shell fallback failed for {}: {}", target.display(), e);
            None
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn spawn_via_shell(target: &Path, working_dir: &Path) -> Option<Child> {
    // sh가 대상을 스크립트 피연산자로 받는다 — 인자 파싱이 없으므로
    // 이스케이프는 불필요
    let mut cmd = Command::new("sh");
    cmd.arg(target)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .kill_on_drop(false);

    match cmd.spawn() {
        Ok(child) => Some(child),
        Err(e) => {
            tracing::error!("[Launcher] Shell fallback failed for {}: {}", target.display(), e);
            None
        }
    }
}
