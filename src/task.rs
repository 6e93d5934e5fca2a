use crate::engine::SpeechModel;
use crate::normalizer;
use crate::recognizer;
use crate::types::TranscriptionResult;
use anyhow::Result;
use std::path::Path;

/// ファイル名に使う文字起こし冒頭の最大文字数
const SNIPPET_MAX_CHARS: usize = 50;

/// リトライポリシーの結果
///
/// 例外ベースの制御フローではなく、明示的な判別結果として返すことで
/// 3回試行の契約を直接テストできるようにする。
#[derive(Debug, PartialEq, Eq)]
pub enum RetryOutcome {
    /// いずれかの試行で空でないテキストが得られた
    Success(String),
    /// 全試行が失敗 (変換エラー・認識エラー・空テキストを含む)
    Exhausted,
}

/// 1ファイル分の文字起こしタスクを実行
///
/// (正規化 → 認識) のパイプラインを最大 `max_attempts` 回まで逐次
/// 試行する。空でないテキストが得られた試行のみを成功とみなす。
/// このコンポーネント自体はリネームなどの副作用を行わない。
///
/// # Arguments
/// * `index` - 元の列挙位置 (0始まり)
/// * `original_name` - 元のファイル名
/// * `source_dir` - 入力ディレクトリ
/// * `model` - 共有の音声認識モデル
/// * `max_attempts` - 最大試行回数
pub fn run(
    index: usize,
    original_name: &str,
    source_dir: &Path,
    model: &dyn SpeechModel,
    max_attempts: u32,
) -> TranscriptionResult {
    let source_path = source_dir.join(original_name);

    match transcribe_with_retry(&source_path, model, max_attempts) {
        RetryOutcome::Success(transcript) => {
            let derived_name = derive_filename(index, &transcript, original_name);
            TranscriptionResult {
                index,
                original_name: original_name.to_string(),
                derived_name: Some(derived_name),
                transcript: Some(transcript),
            }
        }
        RetryOutcome::Exhausted => {
            log::error!(
                "{} 回の試行が全て失敗しました: {}",
                max_attempts,
                original_name
            );
            TranscriptionResult::exhausted(index, original_name.to_string())
        }
    }
}

/// 有界リトライ付きで文字起こしパイプラインを実行
///
/// 失敗の種類 (変換・認識・空テキスト) を区別せず、一律に次の試行へ
/// 進む。バックオフは行わない。
fn transcribe_with_retry(
    source_path: &Path,
    model: &dyn SpeechModel,
    max_attempts: u32,
) -> RetryOutcome {
    for attempt in 1..=max_attempts {
        match attempt_pipeline(source_path, model) {
            Ok(text) if !text.is_empty() => {
                return RetryOutcome::Success(text);
            }
            Ok(_) => {
                // 空テキストもリトライ対象として扱う
                log::warn!(
                    "試行 {}/{} 失敗 (空テキスト): {:?}",
                    attempt,
                    max_attempts,
                    source_path
                );
            }
            Err(e) => {
                log::warn!(
                    "試行 {}/{} 失敗: {:?}: {:#}",
                    attempt,
                    max_attempts,
                    source_path,
                    e
                );
            }
        }
    }
    RetryOutcome::Exhausted
}

/// 正規化 → 認識の1回分のパイプライン
///
/// 正規化済みの一時音声はこの関数のスコープに閉じており、
/// 成功・失敗どちらでも復帰時に破棄される。
fn attempt_pipeline(source_path: &Path, model: &dyn SpeechModel) -> Result<String> {
    let canonical = normalizer::normalize(source_path)?;
    recognizer::transcribe(&canonical, model)
}

/// 文字起こしから新しいファイル名を導出
///
/// 文字起こし冒頭50文字をサニタイズし、1始まりの2桁ゼロ詰め番号と
/// 元の拡張子を付けて組み立てる。純粋関数であり、I/Oを行わない。
///
/// # Examples
///
/// ```
/// # use batch_transcribe::task::derive_filename;
/// let name = derive_filename(0, "hello world", "recording.m4a");
/// assert_eq!(name, "01 - hello world.m4a");
/// ```
pub fn derive_filename(index: usize, transcript: &str, original_name: &str) -> String {
    let snippet = sanitize_snippet(transcript);
    let extension = Path::new(original_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{:02} - {}{}", index + 1, snippet, extension)
}

/// ファイル名に安全な文字起こし冒頭を生成
///
/// 先頭50文字のうち、英数字・空白・ハイフン・アンダースコア・
/// ピリオド以外の文字はすべてアンダースコアに置換する。
/// 冪等: 2回適用しても結果は変わらない。
fn sanitize_snippet(transcript: &str) -> String {
    transcript
        .chars()
        .take(SNIPPET_MAX_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
