use crate::config::Config;
use crate::engine::SpeechModel;
use crate::output::TranscriptWriter;
use crate::task;
use crate::types::TranscriptionResult;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 対象とする音声ファイルの拡張子 (小文字比較)
const AUDIO_EXTENSIONS: [&str; 5] = ["m4a", "mp3", "wav", "ogg", "flac"];

/// 1回のバッチ実行のサマリ
#[derive(Debug)]
pub struct RunSummary {
    /// 入力ファイル総数
    pub total: usize,
    /// 文字起こしに成功したファイル数
    pub succeeded: usize,
    /// 生成した出力ファイル (成功0件の場合は None)
    pub output_path: Option<PathBuf>,
}

/// 入力ディレクトリから対象の音声ファイルを列挙
///
/// 拡張子が対象リストに一致する (大文字小文字を区別しない) 通常
/// ファイルのみを返す。サブディレクトリとその他のファイルは無視する。
/// 序数を決定的にするため、ファイル名でソートして返す。
pub fn scan_audio_files(dir: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("入力ディレクトリを開けません: {:?}", dir))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.context("ディレクトリエントリの読み込みに失敗")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);

        if matches {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    files.sort();
    Ok(files)
}

/// バッチ文字起こしを実行
///
/// 1ファイルにつき1タスクを有界ワーカープールに投入し、完了順に
/// 結果を回収する。完了ごとに2つの効果を発火する:
///
/// 1. 導出ファイル名があれば即座にリネーム (失敗は警告のみ)
/// 2. 結果をバッファに蓄積 (最終出力は元の列挙順を保つため、
///    逐次書き出しはしない)
///
/// 全タスク完了後、序数順にソートして出力ファイルを書き出す。
pub fn run(
    files: &[String],
    source_dir: &Path,
    model: &dyn SpeechModel,
    config: &Config,
) -> Result<RunSummary> {
    let total = files.len();
    let workers = config.resolved_worker_threads().min(total.max(1));
    let max_retries = config.max_retries;
    let dry_run = config.dry_run;

    log::info!("{} ファイルを {} ワーカーで処理します", total, workers);

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, String)>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded::<TranscriptionResult>();

    for (index, name) in files.iter().enumerate() {
        job_tx
            .send((index, name.clone()))
            .context("ジョブの投入に失敗")?;
    }
    drop(job_tx);

    let mut buffered: Vec<TranscriptionResult> = Vec::with_capacity(total);

    std::thread::scope(|s| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            s.spawn(move || {
                while let Ok((index, name)) = job_rx.recv() {
                    log::info!("処理開始 {}/{}: {}", index + 1, total, name);
                    let result = task::run(index, &name, source_dir, model, max_retries);
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        }
        // ワーカーに渡したクローンが全て閉じると受信ループが終了する
        drop(result_tx);

        // 完了順に回収。リネームは即時、出力はバッファリング
        for result in result_rx.iter() {
            if let Some(derived) = &result.derived_name {
                log::info!("文字起こし成功: {}", result.original_name);
                rename_source(source_dir, &result.original_name, derived, dry_run);
            }
            buffered.push(result);
        }
    });

    // 完了順ではなく元の列挙順で出力する
    buffered.sort_by_key(|r| r.index);

    let succeeded = buffered.iter().filter(|r| r.is_success()).count();

    let output_path = if succeeded > 0 {
        let writer = TranscriptWriter::new(&config.transcripts_dir, &config.output_header);
        let path = writer.write(&buffered)?;
        log::info!("{} 件の文字起こしを保存しました: {:?}", succeeded, path);
        Some(path)
    } else {
        log::warn!("文字起こし結果は1件もありませんでした");
        None
    };

    Ok(RunSummary {
        total,
        succeeded,
        output_path,
    })
}

/// 元ファイルを導出名へリネーム
///
/// 失敗してもバッチは継続し、文字起こし結果は最終出力に残る。
fn rename_source(dir: &Path, original: &str, derived: &str, dry_run: bool) {
    if dry_run {
        log::info!("[dry-run] リネームをスキップ: {} -> {}", original, derived);
        return;
    }

    match fs::rename(dir.join(original), dir.join(derived)) {
        Ok(()) => log::info!("リネーム完了: {} -> {}", original, derived),
        Err(e) => log::warn!("リネームに失敗 {}: {}", original, e),
    }
}
