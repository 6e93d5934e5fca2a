use crate::engine::SpeechModel;
use crate::normalizer::CanonicalAudio;
use crate::types::{CANONICAL_SAMPLE_RATE, SampleI16};
use anyhow::{Context, Result, bail};

/// 1回の読み込みで投入するサンプル数
///
/// 16kHzで0.5秒分。認識エンジンの内部バッファリングと
/// 発話境界検出の粒度に合わせた値。
pub const CHUNK_SAMPLES: usize = 8000;

/// 正規化済み音声をストリーミングで文字起こしする
///
/// 新しい認識セッションを開き、PCMを [`CHUNK_SAMPLES`] 単位で投入する。
/// 発話境界ごとに確定テキストを収集し、ストリーム終端で最終結果を
/// 一度だけ取り出して、全セグメントを半角スペースで連結して返す。
///
/// # Errors
///
/// - 正規化済み音声がモノラル・16ビット・16kHzの前提を満たさない場合
/// - WAVの読み込みに失敗した場合
/// - エンジンがストリーム途中で回復不能なエラーを返した場合
///
/// エラー時、それまでに蓄積した部分結果は破棄される。
pub fn transcribe(audio: &CanonicalAudio, model: &dyn SpeechModel) -> Result<String> {
    let mut reader = hound::WavReader::open(audio.path())
        .with_context(|| format!("正規化WAVを開けません: {:?}", audio.path()))?;

    // ストリーミング開始前にフォーマット前提を検証する
    let spec = reader.spec();
    if spec.channels != 1
        || spec.bits_per_sample != 16
        || spec.sample_format != hound::SampleFormat::Int
        || spec.sample_rate != CANONICAL_SAMPLE_RATE
    {
        bail!(
            "正規化済み音声のフォーマットが不正: {}ch / {}bit / {}Hz",
            spec.channels,
            spec.bits_per_sample,
            spec.sample_rate
        );
    }

    let mut session = model.open_session(CANONICAL_SAMPLE_RATE)?;
    // 単語レベルのメタデータを有効化 (将来の利用に備えて保持)
    session.enable_words();

    let mut segments: Vec<String> = Vec::new();
    let mut chunk: Vec<SampleI16> = Vec::with_capacity(CHUNK_SAMPLES);

    for sample in reader.samples::<i16>() {
        let sample = sample.context("正規化WAVの読み込みに失敗")?;
        chunk.push(sample);

        if chunk.len() == CHUNK_SAMPLES {
            if let Some(text) = session.accept_pcm(&chunk)? {
                push_segment(&mut segments, &text);
            }
            chunk.clear();
        }
    }

    // 端数チャンクを投入
    if !chunk.is_empty() {
        if let Some(text) = session.accept_pcm(&chunk)? {
            push_segment(&mut segments, &text);
        }
    }

    // 終端の最終結果を一度だけ取り出す
    let final_text = session.final_text()?;
    push_segment(&mut segments, &final_text);

    Ok(segments.join(" ").trim().to_string())
}

/// 前後の空白を除去し、空でなければセグメント列に追加
fn push_segment(segments: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{FakeMode, FakeModel};
    use crate::normalizer::{self, CanonicalAudio};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// 指定サンプル数の16kHzモノラルWAVを生成して正規化する
    fn canonical_with_samples(dir: &Path, count: usize) -> CanonicalAudio {
        let path = dir.join("input.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..count {
            let t = i as f32 / 16000.0;
            let s = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 10000.0) as i16;
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        normalizer::normalize(&path).unwrap()
    }

    /// 任意のWAV仕様で正規化済みハンドルを偽造する (検証テスト用)
    fn forged_canonical(spec: hound::WavSpec, count: usize) -> CanonicalAudio {
        let temp = tempfile::Builder::new()
            .prefix("forged_")
            .suffix(".wav")
            .tempfile()
            .unwrap();
        let temp_path = temp.into_temp_path();
        let mut writer = hound::WavWriter::create(&temp_path, spec).unwrap();
        for _ in 0..count {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        CanonicalAudio::from_temp_path(temp_path, count)
    }

    #[test]
    fn test_all_chunks_consumed_in_order() {
        let dir = TempDir::new().unwrap();
        // 2チャンク + 端数1600サンプル
        let canonical = canonical_with_samples(dir.path(), 17600);
        let model = FakeModel::new(FakeMode::ChunkSizes);

        let text = transcribe(&canonical, &model).unwrap();
        assert_eq!(text, "8000 8000 1600");
        // セッションは1試行につき1つだけ開かれる
        assert_eq!(model.sessions_opened(), 1);
    }

    #[test]
    fn test_exact_chunk_boundary() {
        let dir = TempDir::new().unwrap();
        // ちょうど2チャンク分。端数投入は発生しない
        let canonical = canonical_with_samples(dir.path(), 16000);
        let model = FakeModel::new(FakeMode::ChunkSizes);

        let text = transcribe(&canonical, &model).unwrap();
        assert_eq!(text, "8000 8000");
    }

    #[test]
    fn test_segments_joined_with_final() {
        let dir = TempDir::new().unwrap();
        let canonical = canonical_with_samples(dir.path(), 24000);
        // チャンク1: "hello " (空白付き)、チャンク2: 空、チャンク3: "world"
        let model = FakeModel::new(FakeMode::Scripted {
            per_chunk: vec!["hello ".to_string(), String::new(), "world".to_string()],
            final_text: "again".to_string(),
        });

        let text = transcribe(&canonical, &model).unwrap();
        assert_eq!(text, "hello world again");
    }

    #[test]
    fn test_silence_yields_empty_string() {
        let dir = TempDir::new().unwrap();
        let canonical = canonical_with_samples(dir.path(), 8000);
        let model = FakeModel::new(FakeMode::Silence);

        let text = transcribe(&canonical, &model).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_rejects_wrong_sample_rate() {
        let canonical = forged_canonical(
            hound::WavSpec {
                channels: 1,
                sample_rate: 8000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            1000,
        );
        let model = FakeModel::new(FakeMode::Fixed("should not run".to_string()));
        let temp_path = canonical.path().to_path_buf();

        assert!(transcribe(&canonical, &model).is_err());
        // 検証はストリーミング開始前に行われ、セッションは開かれない
        assert_eq!(model.sessions_opened(), 0);

        // 失敗経路でも一時ファイルはハンドルのドロップで削除される
        drop(canonical);
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_rejects_stereo() {
        let canonical = forged_canonical(
            hound::WavSpec {
                channels: 2,
                sample_rate: 16000,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
            1000,
        );
        let model = FakeModel::new(FakeMode::Fixed("should not run".to_string()));
        let temp_path = canonical.path().to_path_buf();

        assert!(transcribe(&canonical, &model).is_err());
        assert_eq!(model.sessions_opened(), 0);

        drop(canonical);
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_engine_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let canonical = canonical_with_samples(dir.path(), 8000);
        let model = FakeModel::new(FakeMode::Fixed("unused".to_string())).fail_first(1);
        let temp_path = canonical.path().to_path_buf();

        assert!(transcribe(&canonical, &model).is_err());

        // 認識が失敗した試行でも、正規化済み音声の一時ファイルは
        // ドロップで必ず削除される
        drop(canonical);
        assert!(!temp_path.exists());
    }
}
