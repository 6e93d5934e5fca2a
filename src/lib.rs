//! batch-transcribe - 音声アーカイブの並列一括文字起こしシステム
//!
//! このクレートは、ディレクトリ内の音声ファイル群を並列に文字起こしし、
//! 各ファイルを文字起こし冒頭から導出した名前にリネームしたうえで、
//! 全文をタイムスタンプ付きの1ファイルにまとめて出力します。
//!
//! # 主な機能
//!
//! - **音声の正規化**: 任意のコンテナ/コーデックをモノラル・16kHz・
//!   16ビットPCM (300〜3000Hz帯域制限、振幅正規化済み) に変換
//! - **ストリーミング認識**: 正規化済みPCMを0.5秒単位のチャンクで
//!   認識エンジンに投入し、発話境界ごとにテキストを蓄積
//! - **有界リトライ**: ファイル単位で最大3回まで再試行
//! - **並列実行と順序保証**: ワーカープールで並列処理しつつ、
//!   最終出力は元の列挙順を厳密に維持
//!
//! # アーキテクチャ
//!
//! ```text
//! [audio/ ディレクトリ] → [Coordinator] → [FileTranscriptionTask (×N並列)]
//!                              ↓                    ↓
//!                        完了順に回収        [Normalizer] → [Recognizer]
//!                         ┌────┴────┐              ↓              ↓
//!                         │         │        (一時WAV、RAII)  (共有モデル)
//!                     [リネーム] [順序付きバッファ]
//!                                   ↓
//!                          [transcripts/transcript_*.txt]
//! ```
//!
//! # 使用例
//!
//! ```no_run
//! use batch_transcribe::config::Config;
//!
//! // 設定ファイルを読み込み
//! let config = Config::load_or_default("config.toml").unwrap();
//!
//! // またはデフォルト設定を生成
//! Config::write_default("config.toml").unwrap();
//! ```

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod normalizer;
pub mod output;
pub mod recognizer;
pub mod task;
pub mod types;

#[cfg(feature = "vosk")]
pub mod vosk_engine;
