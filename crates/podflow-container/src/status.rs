//! コンテナ状態の分類
//!
//! inspect 結果の running / paused / dead / exit code から状態を導出します。
//! 毎回の inspect で再計算される純粋関数で、結果をキャッシュしません。

use bollard::models::{ContainerInspectResponse, ContainerState, ContainerStateStatusEnum};
use podflow_core::ContainerStatus;

/// エンジンが報告した状態フィールドからライフサイクル状態を分類
///
/// 判定は先勝ちの固定順: running → paused → dead → exit code。
/// シグナルで強制終了されたコンテナは非 0 の exit code として観測されるため
/// ExitedWithError に分類されます（独立した Killed 状態は持ちません）。
pub fn classify(state: &ContainerState) -> ContainerStatus {
    if state.running.unwrap_or(false) {
        return ContainerStatus::Running;
    }
    if state.paused.unwrap_or(false) {
        return ContainerStatus::Paused;
    }
    if state.dead.unwrap_or(false) {
        return ContainerStatus::Dead;
    }
    // 未起動のコンテナも exit code 0 を報告するため、Created を先に判定する
    if state.status == Some(ContainerStateStatusEnum::CREATED) {
        return ContainerStatus::Created;
    }
    match state.exit_code {
        Some(0) => ContainerStatus::Exited,
        Some(_) => ContainerStatus::ExitedWithError,
        None => ContainerStatus::Created,
    }
}

/// inspect 結果全体から状態を分類。状態フィールドが無ければ Unknown
pub fn classify_inspection(inspection: &ContainerInspectResponse) -> ContainerStatus {
    inspection
        .state
        .as_ref()
        .map(classify)
        .unwrap_or(ContainerStatus::Unknown)
}
