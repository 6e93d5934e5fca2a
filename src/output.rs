use crate::types::TranscriptionResult;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 文字起こし結果のファイル書き出し
///
/// 実行ごとにタイムスタンプ付きのファイル名で出力ディレクトリに
/// 1ファイルを生成する。形式は固定ヘッダー行、生成時刻行、空行、
/// そして成功したファイルごとの `"NN. 本文"` ブロック (各ブロックの
/// 後に空行)。
pub struct TranscriptWriter {
    transcripts_dir: PathBuf,
    header: String,
}

impl TranscriptWriter {
    pub fn new<P: AsRef<Path>>(transcripts_dir: P, header: &str) -> Self {
        Self {
            transcripts_dir: transcripts_dir.as_ref().to_path_buf(),
            header: header.to_string(),
        }
    }

    /// 結果をタイムスタンプ付きファイルに書き出す
    ///
    /// `results` は序数順に並んでいることを前提とし、transcript が
    /// `None` の結果はスキップする。
    ///
    /// # Returns
    /// 生成した出力ファイルのパス
    ///
    /// # Errors
    ///
    /// 出力ディレクトリの作成またはファイル書き込みに失敗した場合。
    pub fn write(&self, results: &[TranscriptionResult]) -> Result<PathBuf> {
        if !self.transcripts_dir.exists() {
            fs::create_dir_all(&self.transcripts_dir).with_context(|| {
                format!("出力ディレクトリの作成に失敗: {:?}", self.transcripts_dir)
            })?;
        }

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = self.transcripts_dir.join(format!("transcript_{}.txt", timestamp));

        let mut file = fs::File::create(&path)
            .with_context(|| format!("出力ファイルの作成に失敗: {:?}", path))?;

        writeln!(file, "{}", self.header)?;
        writeln!(file)?;
        writeln!(
            file,
            "Generated on: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(file)?;

        for result in results {
            if let Some(transcript) = &result.transcript {
                writeln!(file, "{:02}. {}", result.index + 1, transcript)?;
                writeln!(file)?;
            }
        }

        file.flush().context("出力ファイルのフラッシュに失敗")?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn success(index: usize, name: &str, transcript: &str) -> TranscriptionResult {
        TranscriptionResult {
            index,
            original_name: name.to_string(),
            derived_name: Some(format!("{:02} - {}.wav", index + 1, transcript)),
            transcript: Some(transcript.to_string()),
        }
    }

    #[test]
    fn test_write_format() {
        let dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(dir.path(), "Test archive");

        let results = vec![
            success(0, "a.wav", "hello world"),
            TranscriptionResult::exhausted(1, "b.mp3".to_string()),
            success(2, "c.wav", "second text"),
        ];

        let path = writer.write(&results).unwrap();
        let content = fs::read_to_string(&path).unwrap();

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "Test archive");
        assert_eq!(lines[1], "");
        assert!(lines[2].starts_with("Generated on: "));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "01. hello world");
        assert_eq!(lines[5], "");
        // 失敗した b.mp3 はスキップされる
        assert_eq!(lines[6], "03. second text");

        // 改行で終端される
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_filename_is_timestamped() {
        let dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(dir.path(), "h");

        let path = writer.write(&[success(0, "a.wav", "x")]).unwrap();
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("transcript_"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_creates_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("transcripts");
        let writer = TranscriptWriter::new(&nested, "h");

        let path = writer.write(&[success(0, "a.wav", "x")]).unwrap();
        assert!(path.exists());
        assert!(nested.exists());
    }
}
