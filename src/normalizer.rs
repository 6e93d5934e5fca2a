use crate::types::{CANONICAL_SAMPLE_RATE, SampleI16};
use anyhow::{Context, Result, anyhow, bail};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tempfile::TempPath;

/// ローパスフィルタのカットオフ周波数 (Hz)
const LOW_PASS_CUTOFF_HZ: f32 = 3000.0;

/// ハイパスフィルタのカットオフ周波数 (Hz)
const HIGH_PASS_CUTOFF_HZ: f32 = 300.0;

/// ピーク正規化の目標振幅 (-0.1 dBFS)
const NORMALIZE_TARGET_PEAK: f32 = 0.988_55;

/// 正規化済みの音声データへのハンドル
///
/// モノラル・16kHz・16ビット符号付きPCM、300〜3000Hzの帯域制限、
/// 振幅正規化済みのWAVファイルを一時領域に保持する。
///
/// 一時ファイルは `TempPath` が所有しており、このハンドルのドロップ時に
/// 成功・失敗のどちらの経路でも必ず削除される。タスク間で共有しては
/// ならない。
pub struct CanonicalAudio {
    path: TempPath,
    duration_samples: usize,
}

impl CanonicalAudio {
    /// 一時WAVファイルのパス
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 既存の一時パスからハンドルを組み立てる (テスト用)
    #[cfg(test)]
    pub(crate) fn from_temp_path(path: TempPath, duration_samples: usize) -> Self {
        Self {
            path,
            duration_samples,
        }
    }

    /// サンプル数 (モノラル・16kHz換算)
    pub(crate) fn duration_samples(&self) -> usize {
        self.duration_samples
    }
}

/// 任意の音声ファイルを認識エンジン向けの正規形に変換
///
/// デコード → モノラル化 → 16kHzへリサンプリング → ピーク正規化 →
/// 帯域制限 (300〜3000Hz) → 16ビットPCMのWAV書き出し、の順で処理する。
///
/// # Errors
///
/// デコード不能・未対応コーデック・サンプル長ゼロ・書き込み失敗の
/// 場合にエラーを返す。エラーは呼び出し元でログに記録され、
/// バッチ全体は継続する。
pub fn normalize(source: &Path) -> Result<CanonicalAudio> {
    let (mut samples, source_rate) = decode_to_mono(source)?;

    if source_rate != CANONICAL_SAMPLE_RATE {
        samples = resample(&samples, source_rate, CANONICAL_SAMPLE_RATE)?;
    }

    // 元の変換パイプラインと同じ順序: 正規化 → ローパス → ハイパス
    normalize_peak(&mut samples);
    low_pass(&mut samples, LOW_PASS_CUTOFF_HZ, CANONICAL_SAMPLE_RATE);
    high_pass(&mut samples, HIGH_PASS_CUTOFF_HZ, CANONICAL_SAMPLE_RATE);

    let duration_samples = samples.len();
    let path = write_canonical_wav(&samples)
        .with_context(|| format!("正規化WAVの書き込みに失敗: {:?}", source))?;

    Ok(CanonicalAudio {
        path,
        duration_samples,
    })
}

/// 音声ファイルをデコードしてモノラルf32サンプル列を得る
///
/// マルチチャンネル入力はフレーム平均でダウンミックスする。
fn decode_to_mono(source: &Path) -> Result<(Vec<f32>, u32)> {
    let file = File::open(source).with_context(|| format!("入力ファイルを開けません: {:?}", source))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // 拡張子をヒントとしてコンテナ判定に渡す
    let mut hint = Hint::new();
    if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
        let _ = hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| anyhow!("コンテナの判定に失敗 {:?}: {}", source, e))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow!("音声トラックが見つかりません: {:?}", source))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params
        .sample_rate
        .ok_or_else(|| anyhow!("サンプリングレートが不明: {:?}", source))?;
    let channels = codec_params.channels.map_or(1, |c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| anyhow!("コーデックの初期化に失敗 {:?}: {}", source, e))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(anyhow!("パケット読み込みに失敗 {:?}: {}", source, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // 破損フレームはスキップして続行
                log::warn!("破損フレームをスキップ {:?}: {}", source, e);
                continue;
            }
            Err(e) => return Err(anyhow!("デコードに失敗 {:?}: {}", source, e)),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if num_frames == 0 {
            continue;
        }

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        let samples = sample_buf.samples();

        // マルチチャンネルはモノラルにダウンミックス
        if channels > 1 {
            for frame in samples.chunks(channels) {
                let mono: f32 = frame.iter().sum::<f32>() / channels as f32;
                all_samples.push(mono);
            }
        } else {
            all_samples.extend_from_slice(samples);
        }
    }

    if all_samples.is_empty() {
        bail!("デコード結果が空です: {:?}", source);
    }

    Ok((all_samples, source_rate))
}

/// rubato による16kHzへのリサンプリング
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| anyhow!("リサンプラーの初期化に失敗: {}", e))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + chunk_size);

    for chunk in samples.chunks(chunk_size) {
        let input = if chunk.len() < chunk_size {
            // 末尾チャンクはゼロ詰め
            let mut padded = chunk.to_vec();
            padded.resize(chunk_size, 0.0);
            padded
        } else {
            chunk.to_vec()
        };

        let result = resampler
            .process(&[input], None)
            .map_err(|e| anyhow!("リサンプリングに失敗: {}", e))?;

        if let Some(channel) = result.first() {
            output.extend_from_slice(channel);
        }
    }

    // 期待される長さに切り詰める
    let expected_len = (samples.len() as f64 * ratio) as usize;
    output.truncate(expected_len);

    Ok(output)
}

/// ピーク正規化
///
/// 最大振幅が目標値になるようゲインを掛ける。
/// 完全無音の場合は何もしない。
fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak <= 0.0 {
        return;
    }
    let gain = NORMALIZE_TARGET_PEAK / peak;
    for s in samples.iter_mut() {
        *s *= gain;
    }
}

/// 一次ローパスフィルタ (単極RC)
fn low_pass(samples: &mut [f32], cutoff_hz: f32, sample_rate: u32) {
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / sample_rate as f32;
    let alpha = dt / (rc + dt);

    let mut prev = 0.0f32;
    for s in samples.iter_mut() {
        prev += alpha * (*s - prev);
        *s = prev;
    }
}

/// 一次ハイパスフィルタ (単極RC)
fn high_pass(samples: &mut [f32], cutoff_hz: f32, sample_rate: u32) {
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / sample_rate as f32;
    let alpha = rc / (rc + dt);

    let Some(&first) = samples.first() else {
        return;
    };

    // 先頭サンプルはそのまま通す
    let mut prev_in = first;
    let mut prev_out = first;
    for s in samples.iter_mut().skip(1) {
        let out = alpha * (prev_out + *s - prev_in);
        prev_in = *s;
        prev_out = out;
        *s = out;
    }
}

/// 16ビット符号付きPCMのWAVとして一時ファイルに書き出す
///
/// ファイル名は `tempfile` により一意に生成され、返される `TempPath` の
/// ドロップで削除が保証される。
fn write_canonical_wav(samples: &[f32]) -> Result<TempPath> {
    let temp = tempfile::Builder::new()
        .prefix("canonical_")
        .suffix(".wav")
        .tempfile()
        .context("一時ファイルの作成に失敗")?;
    let temp_path = temp.into_temp_path();

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: CANONICAL_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(&temp_path, spec)
        .context("正規化WAVファイルの作成に失敗")?;

    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as SampleI16;
        writer
            .write_sample(value)
            .context("WAVファイルへのサンプル書き込みに失敗")?;
    }

    writer
        .finalize()
        .context("WAVファイルのファイナライズに失敗")?;

    Ok(temp_path)
}
