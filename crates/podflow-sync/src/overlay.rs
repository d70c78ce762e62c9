//! overlay マウント
//!
//! lower（読み取り専用）と upper（書き込み用）を merged へ合成します。
//! root ではネイティブの overlay を 1 回だけ発行し、rootless では
//! ネイティブを試してから、旧カーネルで想定される EPERM / EINVAL の
//! 場合に限り fuse-overlayfs へフォールバックします。それ以外の
//! エラーは致命的としてそのまま返します。

use crate::error::{Result, SyncError};
use nix::errno::Errno;
use nix::mount::{MsFlags, mount};
use nix::unistd::Uid;
use std::path::Path;

/// フォールバックに使うユーザ空間 overlay ヘルパ
pub const FUSE_OVERLAYFS: &str = "/usr/bin/fuse-overlayfs";

/// overlay を merged へマウントする
///
/// 4 つのディレクトリは無ければ作成されます。マウントはこの呼び出しの
/// 中だけで完結し、呼び出しをまたいで共有される状態はありません。
pub fn mount_overlay(lower: &Path, upper: &Path, work: &Path, merged: &Path) -> Result<()> {
    mount_overlay_with(lower, upper, work, merged, !Uid::effective().is_root(), native_mount)
}

/// マウント呼び出しと rootless 判定を注入できる実装本体
fn mount_overlay_with(
    lower: &Path,
    upper: &Path,
    work: &Path,
    merged: &Path,
    rootless: bool,
    mut mount_fn: impl FnMut(&Path, &str) -> std::result::Result<(), Errno>,
) -> Result<()> {
    for dir in [lower, upper, work, merged] {
        std::fs::create_dir_all(dir)?;
    }

    let base_opts = format!(
        "lowerdir={},upperdir={},workdir={}",
        lower.display(),
        upper.display(),
        work.display()
    );

    if !rootless {
        tracing::info!("Running as root, using native 'overlay'");
        return mount_fn(merged, &base_opts).map_err(|e| SyncError::MountFailed {
            merged: merged.to_path_buf(),
            source: e,
        });
    }

    tracing::info!("Running rootless, attempting native 'overlay' first");
    match mount_fn(merged, &base_opts) {
        Ok(()) => Ok(()),
        // 旧カーネルでは EPERM / EINVAL が想定される
        Err(Errno::EPERM | Errno::EINVAL) => {
            tracing::info!("Native rootless mount failed, falling back to 'fuse-overlayfs'");
            let fuse_opts = format!("{},mount_program={}", base_opts, FUSE_OVERLAYFS);
            mount_fn(merged, &fuse_opts).map_err(|e| SyncError::FallbackMountFailed {
                merged: merged.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(SyncError::MountFailed {
            merged: merged.to_path_buf(),
            source: e,
        }),
    }
}

fn native_mount(merged: &Path, options: &str) -> std::result::Result<(), Errno> {
    mount(
        Some("overlay"),
        merged,
        Some("overlay"),
        MsFlags::empty(),
        Some(options),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dirs(base: &Path) -> (std::path::PathBuf, std::path::PathBuf, std::path::PathBuf, std::path::PathBuf) {
        (
            base.join("lower"),
            base.join("upper"),
            base.join("work"),
            base.join("merged"),
        )
    }

    #[test]
    fn test_root_path_issues_single_native_mount() {
        let tmp = tempdir().unwrap();
        let (lower, upper, work, merged) = dirs(tmp.path());

        let mut calls: Vec<String> = Vec::new();
        mount_overlay_with(&lower, &upper, &work, &merged, false, |_, opts| {
            calls.push(opts.to_string());
            Ok(())
        })
        .unwrap();

        assert_eq!(calls.len(), 1);
        assert!(calls[0].contains("lowerdir="));
        assert!(!calls[0].contains("mount_program"));
        // ディレクトリはすべて作成されている
        assert!(merged.is_dir());
        assert!(work.is_dir());
    }

    #[test]
    fn test_rootless_eperm_falls_back_to_fuse_overlayfs() {
        let tmp = tempdir().unwrap();
        let (lower, upper, work, merged) = dirs(tmp.path());

        let mut calls: Vec<String> = Vec::new();
        mount_overlay_with(&lower, &upper, &work, &merged, true, |_, opts| {
            calls.push(opts.to_string());
            if calls.len() == 1 {
                Err(Errno::EPERM)
            } else {
                Ok(())
            }
        })
        .unwrap();

        assert_eq!(calls.len(), 2);
        // フォールバックは同じ lower/upper/work オプションに helper を加えたもの
        assert!(calls[1].starts_with(&calls[0]));
        assert!(calls[1].contains("mount_program=/usr/bin/fuse-overlayfs"));
    }

    #[test]
    fn test_rootless_einval_also_falls_back() {
        let tmp = tempdir().unwrap();
        let (lower, upper, work, merged) = dirs(tmp.path());

        let mut attempts = 0;
        mount_overlay_with(&lower, &upper, &work, &merged, true, |_, _| {
            attempts += 1;
            if attempts == 1 { Err(Errno::EINVAL) } else { Ok(()) }
        })
        .unwrap();

        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_rootless_unexpected_error_is_fatal() {
        let tmp = tempdir().unwrap();
        let (lower, upper, work, merged) = dirs(tmp.path());

        let mut attempts = 0;
        let err = mount_overlay_with(&lower, &upper, &work, &merged, true, |_, _| {
            attempts += 1;
            Err(Errno::ENODEV)
        })
        .unwrap_err();

        // フォールバックは試みられない
        assert_eq!(attempts, 1);
        assert!(matches!(err, SyncError::MountFailed { .. }));
    }

    #[test]
    fn test_fallback_failure_is_reported_as_fallback_error() {
        let tmp = tempdir().unwrap();
        let (lower, upper, work, merged) = dirs(tmp.path());

        let err = mount_overlay_with(&lower, &upper, &work, &merged, true, |_, _| {
            Err(Errno::EPERM)
        })
        .unwrap_err();

        assert!(matches!(err, SyncError::FallbackMountFailed { .. }));
    }
}
