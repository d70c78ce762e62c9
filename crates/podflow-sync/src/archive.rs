//! tar ストリームの生成
//!
//! ホストディレクトリを walk して tar アーカイブを書き出す producer 側。
//! 書き込み先は容量制限付きのチャンネルで、満杯のあいだ producer は
//! ブロックします（バックプレッシャ）。consumer 側がチャンネルを drop
//! すると書き込みが失敗し、walk はその場で中断します。

use bytes::Bytes;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// パイプ容量（チャンク数）
const PIPE_CAPACITY: usize = 8;

/// tar ストリームのチャンク。walk が失敗すると最後に Err が届く
pub type ChunkResult = std::result::Result<Bytes, io::Error>;

/// tar の書き出し先となるチャンネルライタ
struct ChannelWriter {
    tx: mpsc::Sender<ChunkResult>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // 受信側が閉じていたら BrokenPipe として walk を中断させる
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// ホストディレクトリを tar ストリームとして書き出すタスクを起動する
///
/// walk とアーカイブ書き込みはブロッキングタスク上で実行され、戻り値の
/// 受信側と並行に進みます。エントリは walk 順で、ディレクトリのヘッダは
/// 必ずその子のヘッダより先に現れます。シンボリックリンクはリンク先の
/// パスを保持したまま格納されます。walk が失敗した場合は最後のチャンク
/// として Err が届き、受信側がそれを同期全体の失敗として表面化します。
pub fn spawn_tar_stream(host_dir: PathBuf) -> mpsc::Receiver<ChunkResult> {
    let (tx, rx) = mpsc::channel(PIPE_CAPACITY);

    tokio::task::spawn_blocking(move || {
        if let Err(e) = write_tree(&host_dir, ChannelWriter { tx: tx.clone() }) {
            // 受信側が既に閉じている場合は通知できないが、それは中断要求そのもの
            let _ = tx.blocking_send(Err(e));
        }
    });

    rx
}

fn write_tree(host_dir: &Path, writer: ChannelWriter) -> io::Result<()> {
    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);
    append_dir_entries(&mut builder, host_dir, Path::new(""))?;
    builder.finish()
}

/// dir 直下のエントリを相対パス rel 配下としてアーカイブへ追加する
fn append_dir_entries(
    builder: &mut tar::Builder<ChannelWriter>,
    dir: &Path,
    rel: &Path,
) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let rel_path = rel.join(entry.file_name());
        let meta = std::fs::symlink_metadata(&path)?;

        if meta.is_dir() {
            // ヘッダを先に書いてから子へ降りる
            builder.append_path_with_name(&path, &rel_path)?;
            append_dir_entries(builder, &path, &rel_path)?;
        } else {
            // 通常ファイルとシンボリックリンク
            builder.append_path_with_name(&path, &rel_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    async fn collect_archive(host_dir: PathBuf) -> io::Result<Vec<u8>> {
        let mut rx = spawn_tar_stream(host_dir);
        let mut buf = Vec::new();
        while let Some(chunk) = rx.recv().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }

    fn entry_names(archive: &[u8]) -> Vec<String> {
        let mut names = Vec::new();
        let mut ar = tar::Archive::new(archive);
        for entry in ar.entries().unwrap() {
            let entry = entry.unwrap();
            names.push(entry.path().unwrap().to_string_lossy().into_owned());
        }
        names
    }

    #[tokio::test]
    async fn test_stream_contains_all_entries() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("b.txt"), "beta").unwrap();

        let archive = collect_archive(dir.path().to_path_buf()).await.unwrap();
        let names = entry_names(&archive);

        assert!(names.contains(&"a.txt".to_string()));
        assert!(names.contains(&"sub/b.txt".to_string()));
    }

    #[tokio::test]
    async fn test_directory_header_precedes_children() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("inner.txt"), "x").unwrap();

        let archive = collect_archive(dir.path().to_path_buf()).await.unwrap();
        let names = entry_names(&archive);

        let dir_pos = names.iter().position(|n| n.trim_end_matches('/') == "sub");
        let child_pos = names.iter().position(|n| n == "sub/inner.txt");
        assert!(dir_pos.unwrap() < child_pos.unwrap());
    }

    #[tokio::test]
    async fn test_file_contents_survive_streaming() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("data.txt"), "REPLACED").unwrap();

        let archive = collect_archive(dir.path().to_path_buf()).await.unwrap();

        let mut ar = tar::Archive::new(&archive[..]);
        let mut found = false;
        for entry in ar.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().to_string_lossy() == "data.txt" {
                let mut contents = String::new();
                entry.read_to_string(&mut contents).unwrap();
                assert_eq!(contents, "REPLACED");
                found = true;
            }
        }
        assert!(found);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_target_is_preserved() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("target.txt"), "t").unwrap();
        std::os::unix::fs::symlink("target.txt", dir.path().join("link.txt")).unwrap();

        let archive = collect_archive(dir.path().to_path_buf()).await.unwrap();

        let mut ar = tar::Archive::new(&archive[..]);
        let mut found = false;
        for entry in ar.entries().unwrap() {
            let entry = entry.unwrap();
            if entry.path().unwrap().to_string_lossy() == "link.txt" {
                let link = entry.link_name().unwrap().unwrap();
                assert_eq!(link.to_string_lossy(), "target.txt");
                found = true;
            }
        }
        assert!(found);
    }

    #[tokio::test]
    async fn test_walk_failure_surfaces_as_error_chunk() {
        let missing = PathBuf::from("/no/such/podflow/dir");
        let err = collect_archive(missing).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_dropped_receiver_aborts_producer() {
        let dir = tempdir().unwrap();
        // パイプ容量より大きなデータで producer をブロックさせる
        std::fs::write(dir.path().join("big.bin"), vec![0u8; 4 * 1024 * 1024]).unwrap();

        let rx = spawn_tar_stream(dir.path().to_path_buf());
        drop(rx);
        // producer 側タスクは BrokenPipe で終了する（ハングしないことの確認）
    }
}
