//! Podflow のコア仕様モデル
//!
//! コンテナエンジンに依存しないデータモデルとバリデーションを提供します。
//! エンジンへの変換・呼び出しは podflow-container / podflow-sync が担います。

pub mod error;
pub mod model;

pub use error::*;
pub use model::*;
