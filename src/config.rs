use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// バッチ文字起こしの設定
///
/// TOML形式の設定ファイルから読み込む。
/// 省略されたフィールドにはデフォルト値が使われる。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// 入力音声ディレクトリ
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    /// 音声認識モデルのディレクトリ
    ///
    /// 読み込み失敗は致命的エラーとなり、処理開始前に終了する
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// 文字起こし結果の出力ディレクトリ
    #[serde(default = "default_transcripts_dir")]
    pub transcripts_dir: String,

    /// 出力ファイル先頭の固定ヘッダー行
    #[serde(default = "default_output_header")]
    pub output_header: String,

    /// 1ファイルあたりの最大試行回数
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// ワーカースレッド数
    ///
    /// 0 の場合はホストの並列度 (available_parallelism) を使用する
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,

    /// ドライランモード
    ///
    /// true の場合、リネーム副作用を抑止する。
    /// 文字起こしと出力ファイルの生成は通常通り行う。
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

// Default functions
fn default_audio_dir() -> String {
    "./audio".to_string()
}

fn default_model_path() -> String {
    "./vosk-model-en-us-0.22".to_string()
}

fn default_transcripts_dir() -> String {
    "./transcripts".to_string()
}

fn default_output_header() -> String {
    "this is a \"Horal History Project\" from the class \"SSN103\" class".to_string()
}

fn default_max_retries() -> u32 {
    3 // 変換失敗・空テキストも含めて一律3回
}

fn default_worker_threads() -> usize {
    0 // ホストの並列度に従う
}

fn default_dry_run() -> bool {
    false
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio_dir: default_audio_dir(),
            model_path: default_model_path(),
            transcripts_dir: default_transcripts_dir(),
            output_header: default_output_header(),
            max_retries: default_max_retries(),
            worker_threads: default_worker_threads(),
            dry_run: default_dry_run(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use batch_transcribe::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    ///
    /// # Errors
    ///
    /// ファイルの書き込みに失敗した場合にエラーを返す。
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    /// ファイルが存在しない場合はエラーにならず、デフォルト設定を返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }

    /// 実際に使用するワーカースレッド数を解決
    ///
    /// `worker_threads` が 0 の場合はホストの並列度を返す。
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            self.worker_threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}
