use anyhow::Result;
use batch_transcribe::config::Config;
use batch_transcribe::coordinator;
use batch_transcribe::engine::SpeechModel;
use env_logger::Env;
use std::path::Path;

fn main() -> Result<()> {
    // ロガーを初期化
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .filter_module("symphonia_core", log::LevelFilter::Warn)
        .init();

    // コマンドライン引数をパース
    let args: Vec<String> = std::env::args().collect();

    // 設定ファイル生成モード
    if args.len() > 1 && args[1] == "--generate-config" {
        let config_path = if args.len() > 2 {
            &args[2]
        } else {
            "config.toml"
        };
        Config::write_default(config_path)?;
        println!("設定ファイルを生成しました: {}", config_path);
        return Ok(());
    }

    // 設定ファイルのパス
    let config_path = if args.len() > 1 && !args[1].starts_with("--") {
        &args[1]
    } else {
        "config.toml"
    };

    // 設定を読み込み
    let config = Config::load_or_default(config_path)?;

    log::info!("batch-transcribe を起動します");
    log::info!("設定: {:?}", config);

    // モデルを読み込み (失敗は致命的。ファイル処理を開始せず終了する)
    let model = load_model(&config)?;

    // 入力ファイルを列挙
    let audio_dir = Path::new(&config.audio_dir);
    let files = coordinator::scan_audio_files(audio_dir)?;

    if files.is_empty() {
        log::error!("音声ファイルが見つかりません: {:?}", audio_dir);
        log::error!("対応形式: .m4a, .mp3, .wav, .ogg, .flac");
        return Ok(());
    }

    // バッチ実行
    let summary = coordinator::run(&files, audio_dir, model.as_ref(), &config)?;

    log::info!(
        "完了: {}/{} ファイルを文字起こししました",
        summary.succeeded,
        summary.total
    );

    Ok(())
}

/// 音声認識モデルを読み込む
///
/// Voskバックエンドは `vosk` フィーチャ有効時のみ組み込まれる。
#[cfg(feature = "vosk")]
fn load_model(config: &Config) -> Result<Box<dyn SpeechModel>> {
    let model = batch_transcribe::vosk_engine::VoskModel::load(&config.model_path)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "vosk"))]
fn load_model(_config: &Config) -> Result<Box<dyn SpeechModel>> {
    anyhow::bail!(
        "音声認識バックエンドが組み込まれていません。`cargo build --features vosk` でビルドしてください"
    )
}
