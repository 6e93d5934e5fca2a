/// 16ビット整数型のオーディオサンプル
///
/// PCM形式の音声データを表現するための型エイリアス。
/// -32768 から 32767 の範囲の値を取る。
pub type SampleI16 = i16;

/// 正規化済み音声の固定サンプリングレート (Hz)
///
/// 認識エンジンが受け付ける唯一のレート。
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// 1ファイルの処理結果
///
/// 入力ディレクトリの列挙位置 (ordinal index) を保持し、
/// 完了順に関係なく最終出力の順序を決定する。
///
/// # 不変条件
///
/// リトライポリシー完了後、`derived_name` が `Some` であることと
/// `transcript` が空でない `Some` であることは同値。
/// 全リトライ失敗時は両方とも `None`。
///
/// # Examples
///
/// ```
/// # use batch_transcribe::types::TranscriptionResult;
/// let result = TranscriptionResult {
///     index: 0,
///     original_name: "interview.m4a".to_string(),
///     derived_name: Some("01 - hello world.m4a".to_string()),
///     transcript: Some("hello world".to_string()),
/// };
/// assert!(result.is_success());
/// ```
#[derive(Clone, Debug)]
pub struct TranscriptionResult {
    /// 元の列挙位置 (0始まり)
    pub index: usize,

    /// 元のファイル名 (ディレクトリ部分を含まない)
    pub original_name: String,

    /// 文字起こしから導出した新しいファイル名
    ///
    /// 全リトライ失敗時は `None`
    pub derived_name: Option<String>,

    /// 文字起こしテキスト
    ///
    /// 全リトライ失敗時は `None`
    pub transcript: Option<String>,
}

impl TranscriptionResult {
    /// 文字起こしに成功したかどうか
    pub fn is_success(&self) -> bool {
        self.transcript.is_some()
    }

    /// 全リトライ失敗の結果を作成
    pub fn exhausted(index: usize, original_name: String) -> Self {
        Self {
            index,
            original_name,
            derived_name: None,
            transcript: None,
        }
    }
}
