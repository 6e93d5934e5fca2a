//! Vosk (Kaldi) バックエンド
//!
//! ネイティブの libvosk に依存するため、`vosk` フィーチャを有効にした
//! 場合のみコンパイルされる。

use crate::engine::{RecognitionSession, SpeechModel};
use crate::types::SampleI16;
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use vosk::{DecodingState, Model, Recognizer};

/// 読み込み済みのVoskモデル
///
/// プロセス全体で1つだけ読み込み、全ワーカーで共有する。
/// libvosk のモデルはスレッドセーフであり、複数のRecognizerから
/// 同時に参照できる。
pub struct VoskModel {
    model: Model,
}

impl VoskModel {
    /// モデルディレクトリから読み込み
    ///
    /// # Errors
    ///
    /// モデルが存在しない、または破損している場合にエラーを返す。
    /// このエラーは致命的として扱い、バッチ処理を開始しない。
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().into_owned();
        let model = Model::new(&path_str)
            .with_context(|| format!("Voskモデルの読み込みに失敗: {}", path_str))?;
        Ok(Self { model })
    }
}

impl SpeechModel for VoskModel {
    fn open_session<'a>(
        &'a self,
        sample_rate: u32,
    ) -> Result<Box<dyn RecognitionSession + Send + 'a>> {
        let recognizer = Recognizer::new(&self.model, sample_rate as f32)
            .context("Vosk Recognizerの作成に失敗")?;
        Ok(Box::new(VoskSession { recognizer }))
    }
}

struct VoskSession {
    recognizer: Recognizer,
}

impl RecognitionSession for VoskSession {
    fn enable_words(&mut self) {
        self.recognizer.set_words(true);
    }

    fn accept_pcm(&mut self, samples: &[SampleI16]) -> Result<Option<String>> {
        let state = self
            .recognizer
            .accept_waveform(samples)
            .map_err(|e| anyhow!("Vosk波形投入エラー: {:?}", e))?;

        match state {
            DecodingState::Finalized => {
                // 発話境界に到達。確定テキストを取り出す
                let text = self
                    .recognizer
                    .result()
                    .single()
                    .map(|r| r.text.to_string())
                    .unwrap_or_default();
                Ok(Some(text))
            }
            DecodingState::Running => Ok(None),
            DecodingState::Failed => Err(anyhow!("Voskデコードに失敗")),
        }
    }

    fn final_text(&mut self) -> Result<String> {
        Ok(self
            .recognizer
            .final_result()
            .single()
            .map(|r| r.text.to_string())
            .unwrap_or_default())
    }
}
