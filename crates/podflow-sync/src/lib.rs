//! ボリューム同期エンジン
//!
//! ホストディレクトリを tar ストリームとして名前付きボリュームへ書き込む
//! 同期処理と、ボリューム操作のリトライ、overlay マウントを提供します。

// Bollard 0.19 の非推奨APIを一時的に使用
#![allow(deprecated)]

pub mod archive;
pub mod error;
pub mod overlay;
pub mod retry;
pub mod sync;
pub mod volume;

pub use archive::*;
pub use error::*;
pub use overlay::*;
pub use retry::*;
pub use sync::*;
pub use volume::*;
