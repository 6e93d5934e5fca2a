use crate::types::SampleI16;
use anyhow::Result;

/// 音声認識モデルの共通トレイト
///
/// プロセス起動時に一度だけ読み込まれ、全ワーカーから読み取り専用で
/// 共有される。可変状態はモデル側ではなくセッション側が持つため、
/// 複数スレッドから同時に `open_session` を呼び出せる。
pub trait SpeechModel: Send + Sync {
    /// 新しい認識セッションを開く
    ///
    /// セッションは1回の文字起こし試行ごとに作成し、試行の終了とともに
    /// 破棄する。ファイル間・リトライ間で使い回してはならない。
    ///
    /// # Arguments
    /// * `sample_rate` - 入力PCMのサンプリングレート (Hz)
    fn open_session<'a>(
        &'a self,
        sample_rate: u32,
    ) -> Result<Box<dyn RecognitionSession + Send + 'a>>;
}

/// 1回のストリーミング文字起こしセッション
///
/// 正規化済みPCMをチャンク単位で受け取り、発話境界ごとに
/// 確定テキストを返す。内部状態はセッションごとに独立。
pub trait RecognitionSession {
    /// 単語レベルのメタデータ出力を有効化
    ///
    /// エンジンが対応していない場合は何もしない。
    fn enable_words(&mut self) {}

    /// PCMチャンクを投入
    ///
    /// # Returns
    /// * `Ok(Some(text))` - 発話境界に到達し、テキストが確定した
    /// * `Ok(None)` - まだ発話の途中
    /// * `Err` - エンジン内部の回復不能なエラー
    fn accept_pcm(&mut self, samples: &[SampleI16]) -> Result<Option<String>>;

    /// ストリーム終端の最終結果を取り出す
    ///
    /// 全チャンク投入後に一度だけ呼ぶ。
    fn final_text(&mut self) -> Result<String>;
}
